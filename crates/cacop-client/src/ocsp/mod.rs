//! OCSP wire format (RFC 6960): request encoding and response validation.

pub mod asn1;
mod request;
mod response;
mod signature;

pub use request::{cert_id, encode_request};
pub use response::parse_response;

#[cfg(test)]
pub(crate) use response::fixtures;

/// Media type of a DER `OCSPRequest` body
pub const OCSP_REQUEST_CONTENT_TYPE: &str = "application/ocsp-request";

/// Media type of a DER `OCSPResponse` body
pub const OCSP_RESPONSE_CONTENT_TYPE: &str = "application/ocsp-response";
