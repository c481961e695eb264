use serde::Serialize;

use crate::error::{CacopError, Result};
use crate::fingerprint::Fingerprint;
use crate::types::{Certificate, CrlStatus, ExpirationStatus, RevocationStatus};

/// Every check run against one certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateResult {
    /// SHA-256 fingerprint (hex)
    pub fingerprint: Fingerprint,

    /// Subject common name
    pub common_name: String,

    /// Parsed certificate summary
    pub certificate: Certificate,

    /// One entry per OCSP responder; empty when not applicable
    pub ocsp: Vec<RevocationStatus>,

    /// One entry per CRL distribution point
    pub crl: Vec<CrlStatus>,

    /// Validity window evaluation
    pub expiration: ExpirationStatus,
}

impl CertificateResult {
    /// Assemble the result for `certificate`
    #[must_use]
    pub fn new(
        certificate: Certificate,
        ocsp: Vec<RevocationStatus>,
        crl: Vec<CrlStatus>,
        expiration: ExpirationStatus,
    ) -> Self {
        Self {
            fingerprint: certificate.fingerprint().to_string(),
            common_name: certificate.common_name().to_string(),
            certificate,
            ocsp,
            crl,
            expiration,
        }
    }

    /// Returns true if any responder or CRL reported the certificate revoked
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.ocsp.iter().any(RevocationStatus::is_revoked) || self.crl.iter().any(|c| c.revoked)
    }

    /// Returns true if any check for this certificate failed
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.expiration.error.is_some()
            || self.ocsp.iter().any(RevocationStatus::is_error)
            || self.crl.iter().any(CrlStatus::is_error)
    }
}

/// Per-position results for a chain.
///
/// A single-certificate chain reports the same result as both `leaf` and
/// `root` with no intermediates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    /// Result for chain position 0
    pub leaf: CertificateResult,

    /// Results for positions `1..len-1`, in order
    pub intermediates: Vec<CertificateResult>,

    /// Result for the last position
    pub root: CertificateResult,

    #[serde(skip)]
    positions: usize,
}

impl ChainReport {
    /// Split leaf-first results into positions.
    pub fn from_results(mut results: Vec<CertificateResult>) -> Result<Self> {
        let positions = results.len();
        let root = results.pop().ok_or(CacopError::EmptyChain)?;
        if results.is_empty() {
            return Ok(Self {
                leaf: root.clone(),
                intermediates: Vec::new(),
                root,
                positions,
            });
        }
        let leaf = results.remove(0);
        Ok(Self {
            leaf,
            intermediates: results,
            root,
            positions,
        })
    }

    /// Returns true if the report describes a single certificate
    #[must_use]
    pub const fn is_anchor_only(&self) -> bool {
        self.positions == 1
    }

    /// Number of chain positions covered
    #[must_use]
    pub const fn len(&self) -> usize {
        self.positions
    }

    /// Always false; a report covers at least one position
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Results in chain order, one per position
    pub fn iter(&self) -> impl Iterator<Item = &CertificateResult> {
        let tail = (!self.is_anchor_only()).then_some(&self.root);
        std::iter::once(&self.leaf)
            .chain(self.intermediates.iter())
            .chain(tail)
    }

    /// Returns true if any position was reported revoked
    #[must_use]
    pub fn any_revoked(&self) -> bool {
        self.iter().any(CertificateResult::is_revoked)
    }

    /// Returns true if any position is outside its validity window
    #[must_use]
    pub fn any_expired(&self) -> bool {
        self.iter().any(|r| r.expiration.expired)
    }
}

/// Verdict of the external native validation tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationVerdict {
    /// Whether the tool accepted the leaf
    pub valid: bool,

    /// Tool output explaining a rejection
    pub reason: Option<String>,

    /// Fingerprints of the chain the tool built, leaf first
    pub chain: Vec<Fingerprint>,
}

/// Everything reported for one subject endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectReport {
    /// Subject URL whose peer chain was verified
    pub subject_url: String,

    /// Per-position check results
    pub chain: ChainReport,

    /// Native validation verdict, when the tool is configured
    pub validation: Option<ValidationVerdict>,

    /// Caller-visible warnings (e.g. trailing anchor data)
    pub warnings: Vec<String>,

    /// Native validation failure, when the tool could not run
    pub error: Option<String>,
}

impl SubjectReport {
    /// Report with only chain results
    #[must_use]
    pub fn new(subject_url: impl Into<String>, chain: ChainReport) -> Self {
        Self {
            subject_url: subject_url.into(),
            chain,
            validation: None,
            warnings: Vec::new(),
            error: None,
        }
    }

    /// Attach a warning
    #[must_use]
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestPki;
    use chrono::Utc;

    fn result_for(cert: Certificate) -> CertificateResult {
        let expiration = ExpirationStatus {
            expired: false,
            now: Utc::now(),
            error: None,
        };
        CertificateResult::new(cert, Vec::new(), Vec::new(), expiration)
    }

    #[test]
    fn empty_results_are_rejected() {
        assert!(matches!(
            ChainReport::from_results(Vec::new()),
            Err(CacopError::EmptyChain)
        ));
    }

    #[test]
    fn single_result_is_leaf_and_root() {
        let pki = TestPki::new();
        let report = ChainReport::from_results(vec![result_for(pki.root.certificate())]).unwrap();
        assert!(report.is_anchor_only());
        assert_eq!(report.leaf, report.root);
        assert_eq!(report.len(), 1);
        assert_eq!(report.iter().count(), 1);
    }

    #[test]
    fn repeated_certificate_keeps_both_positions() {
        let pki = TestPki::new();
        let report = ChainReport::from_results(vec![
            result_for(pki.root.certificate()),
            result_for(pki.root.certificate()),
        ])
        .unwrap();
        assert_eq!(report.leaf, report.root);
        assert!(!report.is_anchor_only());
        assert_eq!(report.len(), 2);
        assert_eq!(report.iter().count(), 2);
    }

    #[test]
    fn positions_are_preserved() {
        let pki = TestPki::new();
        let results = vec![
            result_for(pki.leaf.certificate()),
            result_for(pki.intermediate.certificate()),
            result_for(pki.root.certificate()),
        ];
        let report = ChainReport::from_results(results).unwrap();
        assert_eq!(report.leaf.common_name, "leaf.example.test");
        assert_eq!(report.intermediates.len(), 1);
        assert_eq!(report.intermediates[0].common_name, "Test Intermediate CA");
        assert_eq!(report.root.common_name, "Test Root CA");
        assert_eq!(report.len(), 3);
        assert!(!report.any_revoked());
    }

    #[test]
    fn report_serializes_in_position_order() {
        let pki = TestPki::new();
        let report = ChainReport::from_results(vec![
            result_for(pki.leaf.certificate()),
            result_for(pki.root.certificate()),
        ])
        .unwrap();
        let json = serde_json::to_string(&SubjectReport::new("https://example.test", report)).unwrap();
        let leaf = json.find("\"leaf\"").unwrap();
        let intermediates = json.find("\"intermediates\"").unwrap();
        let root = json.find("\"root\"").unwrap();
        assert!(leaf < intermediates && intermediates < root);
    }
}
