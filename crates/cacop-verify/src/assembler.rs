//! Chain assembly.
//!
//! Two routes produce a chain for verification. [`assemble`] splices a
//! caller-supplied trust anchor onto the chain a subject presented, while
//! [`bundled`] takes the presented chain as it is.

use cacop_core::pem::decode_certificate;
use cacop_core::{CacopError, Certificate, Chain, Result};
use tracing::{debug, info};

/// A chain assembled from a PEM trust anchor.
#[derive(Debug, Clone)]
pub struct Assembly {
    /// Chain ready for verification, terminated by the anchor
    pub chain: Chain,
    /// Non-fatal problems noticed while decoding the anchor
    pub warnings: Vec<String>,
}

/// Merge a subject's presented chain with a trust anchor.
///
/// When the last presented certificate is a CA it is replaced by `anchor`,
/// otherwise `anchor` is appended. Every earlier position is kept in order.
pub fn assemble(subject_chain: Vec<Certificate>, anchor: Certificate) -> Result<Chain> {
    if subject_chain.is_empty() {
        return Err(CacopError::EmptyChain);
    }
    if !anchor.is_ca() {
        return Err(CacopError::AnchorNotCa {
            fingerprint: anchor.fingerprint().to_string(),
        });
    }

    let mut certificates = subject_chain;
    if let Some(terminal) = certificates.last().filter(|c| c.is_ca()) {
        debug!(
            replaced = %terminal.fingerprint(),
            anchor = %anchor.fingerprint(),
            "replacing presented CA with trust anchor"
        );
        certificates.pop();
    } else {
        debug!(anchor = %anchor.fingerprint(), "appending trust anchor");
    }
    certificates.push(anchor);

    Chain::new(certificates)
}

/// Decode a PEM trust anchor and [`assemble`] it onto `subject_chain`.
///
/// The anchor may arrive with its line breaks mangled. Data after the first
/// certificate is ignored and reported as a warning.
pub fn assemble_pem(subject_chain: Vec<Certificate>, anchor_pem: &[u8]) -> Result<Assembly> {
    if subject_chain.is_empty() {
        return Err(CacopError::EmptyChain);
    }

    let decoded = decode_certificate(anchor_pem)?;
    let mut warnings = Vec::new();
    if decoded.has_trailing_data() {
        warnings.push(format!(
            "ignored {} bytes of trailing data after the trust anchor",
            decoded.trailing_bytes
        ));
    }

    let chain = assemble(subject_chain, decoded.certificate)?;
    info!(
        length = chain.len(),
        root = %chain.root().fingerprint(),
        "assembled chain with supplied trust anchor"
    );
    Ok(Assembly { chain, warnings })
}

/// Use the chain exactly as the subject presented it.
pub fn bundled(subject_chain: Vec<Certificate>) -> Result<Chain> {
    let chain = Chain::new(subject_chain)?;
    if !chain.root().is_ca() {
        debug!(
            terminal = %chain.root().fingerprint(),
            "presented chain does not end in a CA"
        );
    }
    Ok(chain)
}
