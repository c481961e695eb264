//! Certificate PEM normalization (RFC 1421 §4.3.2.4 line wrapping).
//!
//! Callers paste anchors from web forms, JSON strings and shell quoting, so
//! the payload arrives with stray quotes, missing line breaks or duplicated
//! armor lines. Normalization strips exactly four token classes (the
//! certificate header, the certificate footer, `'` and `\n`) and re-wraps
//! what is left. Nothing else is filtered: a payload that still is not base64
//! fails decoding instead of being silently repaired.

use tracing::warn;

use crate::error::{CacopError, Result};
use crate::types::Certificate;

/// PEM armor header for certificates.
pub const PEM_HEADER: &str = "-----BEGIN CERTIFICATE-----";

/// PEM armor footer for certificates.
pub const PEM_FOOTER: &str = "-----END CERTIFICATE-----";

/// Columns per line (RFC 1421).
const LINE_WIDTH: usize = 64;

/// Canonicalize arbitrary certificate text into a single 64-column PEM block.
///
/// Empty input yields empty output. Stripping repeats until nothing more is
/// removed, so tokens reassembled by an earlier removal are stripped as well
/// and `normalize(normalize(x)) == normalize(x)` holds for every input.
#[must_use]
pub fn normalize(input: &[u8]) -> Vec<u8> {
    if input.is_empty() {
        return Vec::new();
    }

    let payload = strip_tokens(input);
    let lines = payload.len().div_ceil(LINE_WIDTH);
    let mut out =
        Vec::with_capacity(PEM_HEADER.len() + PEM_FOOTER.len() + payload.len() + lines + 1);

    out.extend_from_slice(PEM_HEADER.as_bytes());
    out.push(b'\n');
    for line in payload.chunks(LINE_WIDTH) {
        out.extend_from_slice(line);
        out.push(b'\n');
    }
    out.extend_from_slice(PEM_FOOTER.as_bytes());
    out
}

/// A certificate decoded from caller-supplied PEM.
#[derive(Debug, Clone)]
pub struct DecodedCertificate {
    /// The first certificate found in the normalized block
    pub certificate: Certificate,
    /// Bytes of DER left over after the first certificate
    pub trailing_bytes: usize,
}

impl DecodedCertificate {
    /// Returns true if data followed the evaluated certificate
    #[must_use]
    pub const fn has_trailing_data(&self) -> bool {
        self.trailing_bytes > 0
    }
}

/// Normalize, decode and parse a PEM certificate.
///
/// Only the first certificate is evaluated. Anything that decodes after it is
/// reported through a warning event and [`DecodedCertificate::trailing_bytes`].
pub fn decode_certificate(input: &[u8]) -> Result<DecodedCertificate> {
    let normalized = normalize(input);
    if normalized.is_empty() {
        return Err(CacopError::MalformedPem("no certificate data supplied".into()));
    }

    let block = ::pem::parse(&normalized).map_err(|e| CacopError::MalformedPem(e.to_string()))?;
    let (certificate, trailing_bytes) = Certificate::from_der_prefix(block.contents())?;

    if trailing_bytes > 0 {
        warn!(
            fingerprint = %certificate.fingerprint(),
            trailing_bytes,
            "got trailing certificate data after the supplied certificate"
        );
    }

    Ok(DecodedCertificate {
        certificate,
        trailing_bytes,
    })
}

fn strip_tokens(input: &[u8]) -> Vec<u8> {
    let mut current = strip_once(input);
    loop {
        let next = strip_once(&current);
        if next.len() == current.len() {
            return next;
        }
        current = next;
    }
}

fn strip_once(input: &[u8]) -> Vec<u8> {
    let header = PEM_HEADER.as_bytes();
    let footer = PEM_FOOTER.as_bytes();

    let mut out = Vec::with_capacity(input.len());
    let mut rest = input;
    while let Some(&byte) = rest.first() {
        if rest.starts_with(header) {
            rest = &rest[header.len()..];
        } else if rest.starts_with(footer) {
            rest = &rest[footer.len()..];
        } else {
            if byte != b'\'' && byte != b'\n' {
                out.push(byte);
            }
            rest = &rest[1..];
        }
    }
    out
}
