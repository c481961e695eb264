use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OCSP certificate status (RFC 6960 §4.2.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcspStatus {
    /// `good [0]`
    Good,
    /// `revoked [1]`
    Revoked,
    /// `unknown [2]`
    Unknown,
}

impl fmt::Display for OcspStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Good => write!(f, "good"),
            Self::Revoked => write!(f, "revoked"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// `CRLReason` (RFC 5280 §5.3.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationReason {
    Unspecified,
    KeyCompromise,
    CaCompromise,
    AffiliationChanged,
    Superseded,
    CessationOfOperation,
    CertificateHold,
    RemoveFromCrl,
    PrivilegeWithdrawn,
    AaCompromise,
}

impl RevocationReason {
    /// Map a `CRLReason` code. Code 7 is unassigned.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Unspecified,
            1 => Self::KeyCompromise,
            2 => Self::CaCompromise,
            3 => Self::AffiliationChanged,
            4 => Self::Superseded,
            5 => Self::CessationOfOperation,
            6 => Self::CertificateHold,
            8 => Self::RemoveFromCrl,
            9 => Self::PrivilegeWithdrawn,
            10 => Self::AaCompromise,
            _ => return None,
        })
    }

    /// The `CRLReason` code
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Unspecified => 0,
            Self::KeyCompromise => 1,
            Self::CaCompromise => 2,
            Self::AffiliationChanged => 3,
            Self::Superseded => 4,
            Self::CessationOfOperation => 5,
            Self::CertificateHold => 6,
            Self::RemoveFromCrl => 8,
            Self::PrivilegeWithdrawn => 9,
            Self::AaCompromise => 10,
        }
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unspecified => "unspecified",
            Self::KeyCompromise => "key compromise",
            Self::CaCompromise => "CA compromise",
            Self::AffiliationChanged => "affiliation changed",
            Self::Superseded => "superseded",
            Self::CessationOfOperation => "cessation of operation",
            Self::CertificateHold => "certificate hold",
            Self::RemoveFromCrl => "remove from CRL",
            Self::PrivilegeWithdrawn => "privilege withdrawn",
            Self::AaCompromise => "AA compromise",
        };
        f.write_str(s)
    }
}

/// What a responder said about one certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcspOutcome {
    /// Tri-state status
    pub status: OcspStatus,
    /// Revocation time, for revoked certificates
    pub revoked_at: Option<DateTime<Utc>>,
    /// Revocation reason, when the responder supplied one
    pub reason: Option<RevocationReason>,
    /// `thisUpdate` of the single response
    pub this_update: DateTime<Utc>,
    /// `nextUpdate` of the single response
    pub next_update: Option<DateTime<Utc>>,
}

/// Result of querying one OCSP responder.
///
/// Exactly one of `status` and `error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationStatus {
    /// Responder URI that was queried
    pub responder: String,

    /// Status reported by the responder
    pub status: Option<OcspStatus>,

    /// Revocation time
    pub revoked_at: Option<DateTime<Utc>>,

    /// Revocation reason
    pub reason: Option<RevocationReason>,

    /// `thisUpdate` of the response
    pub this_update: Option<DateTime<Utc>>,

    /// `nextUpdate` of the response
    pub next_update: Option<DateTime<Utc>>,

    /// Why the query failed
    pub error: Option<String>,
}

impl RevocationStatus {
    /// Entry for a responder that answered
    pub fn checked(responder: impl Into<String>, outcome: OcspOutcome) -> Self {
        Self {
            responder: responder.into(),
            status: Some(outcome.status),
            revoked_at: outcome.revoked_at,
            reason: outcome.reason,
            this_update: Some(outcome.this_update),
            next_update: outcome.next_update,
            error: None,
        }
    }

    /// Entry for a responder query that failed
    pub fn failed(responder: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            responder: responder.into(),
            status: None,
            revoked_at: None,
            reason: None,
            this_update: None,
            next_update: None,
            error: Some(error.to_string()),
        }
    }

    /// Returns true if the responder reported the certificate revoked
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.status == Some(OcspStatus::Revoked)
    }

    /// Returns true if the query failed
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Serial lookup result for one CRL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrlOutcome {
    /// Whether the serial was listed
    pub revoked: bool,
    /// Revocation date of the matching entry
    pub revoked_at: Option<DateTime<Utc>>,
    /// Reason code extension of the matching entry
    pub reason: Option<RevocationReason>,
}

/// Result of checking one CRL distribution point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrlStatus {
    /// Distribution point URI
    pub endpoint: String,

    /// Serial number found among revoked entries
    pub revoked: bool,

    /// Revocation date of the matching entry
    pub revoked_at: Option<DateTime<Utc>>,

    /// Reason code of the matching entry
    pub reason: Option<RevocationReason>,

    /// Why the fetch or parse failed
    pub error: Option<String>,
}

impl CrlStatus {
    /// Entry for a CRL that was fetched and searched
    pub fn checked(endpoint: impl Into<String>, outcome: CrlOutcome) -> Self {
        Self {
            endpoint: endpoint.into(),
            revoked: outcome.revoked,
            revoked_at: outcome.revoked_at,
            reason: outcome.reason,
            error: None,
        }
    }

    /// Entry for a distribution point that could not be checked
    pub fn failed(endpoint: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            endpoint: endpoint.into(),
            revoked: false,
            revoked_at: None,
            reason: None,
            error: Some(error.to_string()),
        }
    }

    /// Returns true if the check failed
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Validity window evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirationStatus {
    /// Outside the validity window at `now`
    pub expired: bool,

    /// Instant the window was evaluated against
    pub now: DateTime<Utc>,

    /// Set when the window itself is malformed
    pub error: Option<String>,
}
