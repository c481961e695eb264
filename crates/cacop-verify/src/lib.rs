//! Chain assembly and verification.
//!
//! [`assembler`] turns a presented chain (plus an optional trust anchor) into
//! a [`Chain`](cacop_core::Chain). [`ChainVerifier`] then runs every OCSP,
//! CRL and expiration check concurrently and returns a
//! [`ChainReport`](cacop_core::ChainReport) whose positions mirror the input.

pub mod assembler;
pub mod expiration;
mod verifier;

pub use assembler::{assemble, assemble_pem, bundled, Assembly};
pub use verifier::{ChainVerifier, StatusChecker, VerifyOptions};
