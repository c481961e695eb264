//! NSS `certutil` validation.
//!
//! Drives the external `certutil` tool against a throwaway database to get a
//! second opinion on an assembled chain. The tool location is configured
//! explicitly through [`CertutilConfig`]; the process environment of the
//! caller is never modified.

mod config;
mod database;
mod error;
mod validator;

#[cfg(all(test, unix))]
mod fake;

pub use config::{CertutilConfig, LIBRARY_PATH_VAR, PROGRAM};
pub use database::{Certutil, TrustKind, Usage};
pub use error::{CertutilError, CertutilResult};
pub use validator::{ChainValidator, NssValidator};
