//! # cacop-cli
//!
//! Command-line interface and HTTP service for certificate chain checks.
//!
//! ## Features
//!
//! - **Subject checks**: retrieve a TLS endpoint's chain and verify it against
//!   a supplied trust anchor or as presented
//! - **HTTP service**: the same checks over `POST /` and `/bundledCA`
//! - **NSS validation**: optional `certutil` verdict next to the revocation results
//! - **Multiple output formats**: Pretty tables, JSON, YAML

pub mod cli;
pub mod config;
pub mod logging;
pub mod output;
pub mod peer;
pub mod server;
pub mod service;

pub use cli::run;
