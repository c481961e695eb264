use thiserror::Error;

/// Result type alias for chain verification operations
pub type Result<T> = std::result::Result<T, CacopError>;

/// Errors that can occur while assembling or checking a certificate chain
#[derive(Error, Debug)]
pub enum CacopError {
    /// A chain with no certificates was handed to the assembler or verifier
    #[error("certificate chain is empty")]
    EmptyChain,

    /// The input held no decodable PEM block
    #[error("malformed PEM: {0}")]
    MalformedPem(String),

    /// DER parsing of a certificate failed
    #[error("malformed certificate: {reason}")]
    MalformedCertificate {
        /// Underlying parser error
        reason: String,
    },

    /// The caller-supplied trust anchor is not a CA certificate
    #[error("trust anchor {fingerprint} is not a CA certificate")]
    AnchorNotCa {
        /// Fingerprint of the rejected anchor
        fingerprint: String,
    },

    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Remote endpoint answered with a non-success status
    #[error("{url} answered with HTTP {code}")]
    HttpStatus {
        /// Endpoint that was queried
        url: String,
        /// HTTP status code
        code: u16,
    },

    /// Request timed out
    #[error("request to {url} timed out after {seconds} seconds")]
    Timeout {
        /// Endpoint that was queried
        url: String,
        /// Configured timeout
        seconds: u64,
    },

    /// Connection could not be established
    #[error("connection failed: {0}")]
    Connection(String),

    /// Responder or distribution point URL is unusable
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Response body exceeded the configured limit
    #[error("response from {url} exceeds {limit} bytes")]
    ResponseTooLarge {
        /// Endpoint that was queried
        url: String,
        /// Configured limit in bytes
        limit: usize,
    },

    /// OCSP request could not be encoded
    #[error("failed to encode OCSP request: {0}")]
    OcspEncode(String),

    /// OCSP response body could not be decoded
    #[error("malformed OCSP response: {0}")]
    OcspDecode(String),

    /// OCSP responder returned a non-successful response status
    #[error("OCSP responder returned status {status}")]
    OcspResponder {
        /// Name of the `OCSPResponseStatus` value
        status: String,
    },

    /// No single response in the OCSP reply matched the requested certificate
    #[error("OCSP response does not cover serial {serial}")]
    OcspNoMatchingResponse {
        /// Hex serial of the certificate under test
        serial: String,
    },

    /// OCSP response signature could not be verified
    #[error("OCSP response signature rejected: {0}")]
    OcspSignature(String),

    /// No issuer certificate is available to build an OCSP request
    #[error("issuer certificate unavailable for {subject}")]
    MissingIssuer {
        /// Subject of the certificate under test
        subject: String,
    },

    /// CRL body could not be parsed
    #[error("malformed CRL from {url}: {reason}")]
    CrlDecode {
        /// Distribution point that served the CRL
        url: String,
        /// Underlying parser error
        reason: String,
    },

    /// Check did not finish before the verification deadline
    #[error("check did not complete before the verification deadline")]
    Incomplete,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl CacopError {
    /// Wrap a certificate parser error
    pub fn malformed_certificate(reason: impl ToString) -> Self {
        Self::MalformedCertificate {
            reason: reason.to_string(),
        }
    }

    /// Returns true if the error was caused by caller input
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyChain
                | Self::MalformedPem(_)
                | Self::MalformedCertificate { .. }
                | Self::AnchorNotCa { .. }
                | Self::InvalidUrl(_)
        )
    }

    /// Returns true if repeating the same query may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Connection(_) => true,
            Self::HttpStatus { code, .. } => *code >= 500,
            _ => false,
        }
    }

    /// Returns the HTTP status code the serving layer should answer with
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        if self.is_input_error() {
            400
        } else {
            500
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_map_to_bad_request() {
        assert_eq!(CacopError::EmptyChain.status_code(), 400);
        assert_eq!(CacopError::malformed_certificate("bad tag").status_code(), 400);
        assert_eq!(CacopError::Internal("boom".into()).status_code(), 500);
    }

    #[test]
    fn server_errors_are_retryable() {
        let err = CacopError::HttpStatus {
            url: "http://ocsp.example".into(),
            code: 503,
        };
        assert!(err.is_retryable());

        let err = CacopError::HttpStatus {
            url: "http://ocsp.example".into(),
            code: 404,
        };
        assert!(!err.is_retryable());
        assert!(!CacopError::OcspSignature("bad".into()).is_retryable());
    }
}
