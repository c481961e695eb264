//! Revocation check entry points.

mod crl;
mod ocsp;

pub use crl::CrlApi;
pub use ocsp::OcspApi;
