//! Core types for certificate chain verification.
//!
//! This crate provides the foundation shared by the revocation client and the
//! chain verifier:
//!
//! - **Certificate model**: [`Certificate`] parsed from DER with its SHA-256 fingerprint
//! - **PEM normalization**: [`pem::normalize`] and [`pem::decode_certificate`]
//! - **Reports**: [`ChainReport`] and the per-check status types
//! - **Errors**: the shared [`CacopError`] taxonomy
//!
//! # Example
//!
//! ```rust,ignore
//! use cacop_core::{pem, Result};
//!
//! fn describe(anchor: &[u8]) -> Result<()> {
//!     let decoded = pem::decode_certificate(anchor)?;
//!     println!("{} {}", decoded.certificate.fingerprint(), decoded.certificate.common_name());
//!     Ok(())
//! }
//! ```

mod error;
pub mod fingerprint;
pub mod pem;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::{CacopError, Result};
pub use fingerprint::{sha256_fingerprint, Fingerprint};
pub use types::*;
