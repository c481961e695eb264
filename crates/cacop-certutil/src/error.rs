use std::path::PathBuf;
use thiserror::Error;

/// Result type for certutil operations
pub type CertutilResult<T> = std::result::Result<T, CertutilError>;

/// Errors raised while driving the NSS `certutil` tool
#[derive(Error, Debug)]
pub enum CertutilError {
    /// The program could not be started or is not certutil
    #[error("certutil not usable at {program}: {reason}")]
    NotFound {
        /// Program that was executed
        program: PathBuf,
        /// Why it was rejected
        reason: String,
    },

    /// certutil exited unsuccessfully
    #[error("certutil {operation} failed ({status}): {output}")]
    Failed {
        /// Operation flag that failed (e.g. `-V`)
        operation: String,
        /// Exit status description
        status: String,
        /// Combined, trimmed stdout and stderr
        output: String,
    },

    /// Filesystem or pipe error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
