//! Certificate chain revocation and expiration checks.
//!
//! Every certificate of a chain is checked against each OCSP responder and
//! CRL distribution point it advertises, and its validity window is evaluated.
//! All lookups run concurrently and each failure stays local to its entry.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cacop::{assemble_pem, ChainVerifier, RevocationClient};
//!
//! #[tokio::main]
//! async fn main() -> cacop::Result<()> {
//!     let presented = fetch_peer_chain().await; // leaf first
//!     let assembly = assemble_pem(presented, include_bytes!("root.pem"))?;
//!
//!     let verifier = ChainVerifier::new(RevocationClient::new()?);
//!     let report = verifier.verify(&assembly.chain).await?;
//!
//!     println!("leaf revoked: {}", report.leaf.is_revoked());
//!     println!("any expired: {}", report.any_expired());
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `default` - Uses rustls for TLS
//! - `rustls` - Use rustls for TLS (recommended)
//! - `native-tls` - Use system native TLS
//! - `certutil` - Enable validation with the NSS `certutil` tool

#![doc(html_root_url = "https://docs.rs/cacop/0.3.0")]

// Re-export core types
pub use cacop_core::*;

// Re-export client
pub use cacop_client::{RetryConfig, RevocationClient, RevocationClientBuilder};

// Re-export assembly and verification
pub use cacop_verify::{
    assemble, assemble_pem, bundled, expiration, Assembly, ChainVerifier, StatusChecker,
    VerifyOptions,
};

// Re-export certutil if enabled
#[cfg(feature = "certutil")]
pub use cacop_certutil as certutil;

// Re-export runtime for convenience
pub use serde;
pub use serde_json;
pub use tokio;
