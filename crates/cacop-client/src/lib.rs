//! Revocation status client: OCSP (RFC 6960) and CRL (RFC 5280).
//!
//! This crate provides [`RevocationClient`], which queries the OCSP responders
//! and CRL distribution points a certificate advertises. Every per-endpoint
//! failure is folded into the entry for that endpoint; a query never fails as
//! a whole.
//!
//! # Example
//!
//! ```rust,ignore
//! use cacop_client::RevocationClient;
//!
//! let client = RevocationClient::new()?;
//! let ocsp = client.ocsp().query(&leaf, Some(&issuer)).await;
//! let crl = client.crl().query(&leaf).await;
//! ```

mod client;
mod config;
pub mod api;
pub mod crl;
pub mod ocsp;

pub use client::{RevocationClient, RevocationClientBuilder};
pub use config::*;
pub use cacop_core::{CacopError, Result};
