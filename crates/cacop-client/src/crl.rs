//! CRL parsing and serial lookup.
//!
//! The CRL signature is not checked; a listed serial is reported as revoked
//! no matter who signed the list.

use cacop_core::{CacopError, Certificate, CrlOutcome, Result, RevocationReason};
use chrono::DateTime;
use x509_parser::prelude::FromDer;
use x509_parser::revocation_list::CertificateRevocationList;

/// PEM label used by distribution points that serve text CRLs
const PEM_CRL_TAG: &str = "X509 CRL";

/// Search a CRL body served by `url` for the serial number of `cert`.
///
/// The body may be DER or a PEM `X509 CRL` block.
pub fn lookup(url: &str, body: &[u8], cert: &Certificate) -> Result<CrlOutcome> {
    let der = to_der(url, body)?;
    let (_, crl) = CertificateRevocationList::from_der(&der).map_err(|e| CacopError::CrlDecode {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let serial = strip_zeros(cert.serial());
    let Some(entry) = crl
        .iter_revoked_certificates()
        .find(|entry| strip_zeros(entry.raw_serial()) == serial)
    else {
        return Ok(CrlOutcome::default());
    };

    Ok(CrlOutcome {
        revoked: true,
        revoked_at: DateTime::from_timestamp(entry.revocation_date.timestamp(), 0),
        reason: entry
            .reason_code()
            .and_then(|(_, code)| RevocationReason::from_code(code.0)),
    })
}

fn to_der(url: &str, body: &[u8]) -> Result<Vec<u8>> {
    let start = body
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(body.len());
    let trimmed = &body[start..];
    if !trimmed.starts_with(b"-----BEGIN") {
        return Ok(body.to_vec());
    }

    let block = ::pem::parse(trimmed).map_err(|e| CacopError::CrlDecode {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if block.tag() != PEM_CRL_TAG {
        return Err(CacopError::CrlDecode {
            url: url.to_string(),
            reason: format!("unexpected PEM block {}", block.tag()),
        });
    }
    Ok(block.into_contents())
}

fn strip_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}
