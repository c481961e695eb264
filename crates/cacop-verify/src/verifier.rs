//! Concurrent revocation and expiration checks over a chain.
//!
//! Every (certificate, endpoint) pair becomes one independent job. Jobs run
//! concurrently, and each result lands in a slot reserved for its position
//! before any job starts, so completion order never affects the report.

use async_trait::async_trait;
use cacop_client::RevocationClient;
use cacop_core::{
    CacopError, Certificate, CertificateResult, ChainReport, CrlOutcome, CrlStatus, OcspOutcome,
    Result, RevocationStatus,
};
use chrono::{DateTime, Utc};
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::expiration;

/// Per-endpoint revocation lookups.
///
/// [`RevocationClient`] is the network implementation.
#[async_trait]
pub trait StatusChecker: Send + Sync {
    /// Ask the OCSP responder at `url` about `cert`
    async fn ocsp(&self, url: &str, cert: &Certificate, issuer: Option<&Certificate>) -> Result<OcspOutcome>;

    /// Search the CRL published at `url` for `cert`
    async fn crl(&self, url: &str, cert: &Certificate) -> Result<CrlOutcome>;
}

#[async_trait]
impl StatusChecker for RevocationClient {
    async fn ocsp(&self, url: &str, cert: &Certificate, issuer: Option<&Certificate>) -> Result<OcspOutcome> {
        self.ocsp().check(url, cert, issuer).await
    }

    async fn crl(&self, url: &str, cert: &Certificate) -> Result<CrlOutcome> {
        self.crl().check(url, cert).await
    }
}

/// Options for a verification run
#[derive(Debug, Clone, Copy, Default)]
pub struct VerifyOptions {
    /// Overall budget for the revocation checks; unfinished checks are
    /// reported as incomplete
    pub deadline: Option<Duration>,
    /// Instant used for expiration; defaults to the time `verify` is called
    pub now: Option<DateTime<Utc>>,
}

impl VerifyOptions {
    /// Options with no deadline, evaluated at the current time
    #[must_use]
    pub const fn new() -> Self {
        Self {
            deadline: None,
            now: None,
        }
    }

    /// Bound the whole run
    #[must_use]
    pub const fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Evaluate expiration at a fixed instant
    #[must_use]
    pub const fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }
}

/// One pending lookup
enum Job<'a> {
    Ocsp {
        position: usize,
        endpoint: usize,
        url: &'a str,
        cert: &'a Certificate,
        issuer: Option<&'a Certificate>,
    },
    Crl {
        position: usize,
        endpoint: usize,
        url: &'a str,
        cert: &'a Certificate,
    },
}

/// One finished lookup with its slot coordinates
enum Finished {
    Ocsp {
        position: usize,
        endpoint: usize,
        status: RevocationStatus,
    },
    Crl {
        position: usize,
        endpoint: usize,
        status: CrlStatus,
    },
}

/// Result slots, pre-sized per position and endpoint
struct Slots {
    ocsp: Vec<Vec<Option<RevocationStatus>>>,
    crl: Vec<Vec<Option<CrlStatus>>>,
}

impl Slots {
    fn for_chain(chain: &[Certificate]) -> Self {
        Self {
            ocsp: chain
                .iter()
                .map(|c| vec![None; ocsp_endpoints(c).len()])
                .collect(),
            crl: chain
                .iter()
                .map(|c| vec![None; c.crl_distribution_points().len()])
                .collect(),
        }
    }

    fn store(&mut self, finished: Finished) {
        match finished {
            Finished::Ocsp {
                position,
                endpoint,
                status,
            } => self.ocsp[position][endpoint] = Some(status),
            Finished::Crl {
                position,
                endpoint,
                status,
            } => self.crl[position][endpoint] = Some(status),
        }
    }
}

/// Responders queried for `cert`; CA certificates are not OCSP-checked
fn ocsp_endpoints(cert: &Certificate) -> &[String] {
    if cert.is_ca() {
        &[]
    } else {
        cert.ocsp_servers()
    }
}

/// Runs every revocation and expiration check for a chain.
pub struct ChainVerifier<C = RevocationClient> {
    checker: C,
    options: VerifyOptions,
}

impl<C: StatusChecker> ChainVerifier<C> {
    /// Create a verifier backed by `checker`
    pub const fn new(checker: C) -> Self {
        Self {
            checker,
            options: VerifyOptions::new(),
        }
    }

    /// Replace the run options
    #[must_use]
    pub const fn with_options(mut self, options: VerifyOptions) -> Self {
        self.options = options;
        self
    }

    /// The backing checker
    pub const fn checker(&self) -> &C {
        &self.checker
    }

    /// Verify a leaf-first chain.
    ///
    /// The report holds one result per input position. Individual failures
    /// are recorded on their own entries and never abort the run.
    pub async fn verify(&self, chain: &[Certificate]) -> Result<ChainReport> {
        if chain.is_empty() {
            return Err(CacopError::EmptyChain);
        }
        let now = self.options.now.unwrap_or_else(Utc::now);

        let mut slots = Slots::for_chain(chain);
        let mut pending: FuturesUnordered<_> = jobs(chain).map(|job| self.run(job)).collect();
        let scheduled = pending.len();
        debug!(positions = chain.len(), jobs = scheduled, "dispatching revocation checks");

        let drain = async {
            while let Some(finished) = pending.next().await {
                slots.store(finished);
            }
        };
        match self.options.deadline {
            Some(deadline) => {
                if tokio::time::timeout(deadline, drain).await.is_err() {
                    warn!(?deadline, "verification deadline reached with checks in flight");
                }
            }
            None => drain.await,
        }
        drop(pending);

        let results: Vec<CertificateResult> = chain
            .iter()
            .zip(slots.ocsp)
            .zip(slots.crl)
            .map(|((cert, ocsp), crl)| {
                let ocsp = ocsp
                    .into_iter()
                    .zip(ocsp_endpoints(cert))
                    .map(|(slot, url)| {
                        slot.unwrap_or_else(|| RevocationStatus::failed(url.as_str(), CacopError::Incomplete))
                    })
                    .collect();
                let crl = crl
                    .into_iter()
                    .zip(cert.crl_distribution_points())
                    .map(|(slot, url)| {
                        slot.unwrap_or_else(|| CrlStatus::failed(url.as_str(), CacopError::Incomplete))
                    })
                    .collect();
                CertificateResult::new(cert.clone(), ocsp, crl, expiration::evaluate(cert, now))
            })
            .collect();

        let report = ChainReport::from_results(results)?;
        info!(
            positions = chain.len(),
            checks = scheduled,
            revoked = report.any_revoked(),
            expired = report.any_expired(),
            errors = report.iter().filter(|r| r.has_errors()).count(),
            "chain verified"
        );
        Ok(report)
    }

    async fn run(&self, job: Job<'_>) -> Finished {
        match job {
            Job::Ocsp {
                position,
                endpoint,
                url,
                cert,
                issuer,
            } => {
                let status = match self.checker.ocsp(url, cert, issuer).await {
                    Ok(outcome) => RevocationStatus::checked(url, outcome),
                    Err(e) => {
                        warn!(url, position, error = %e, "OCSP check failed");
                        RevocationStatus::failed(url, e)
                    }
                };
                Finished::Ocsp {
                    position,
                    endpoint,
                    status,
                }
            }
            Job::Crl {
                position,
                endpoint,
                url,
                cert,
            } => {
                let status = match self.checker.crl(url, cert).await {
                    Ok(outcome) => CrlStatus::checked(url, outcome),
                    Err(e) => {
                        warn!(url, position, error = %e, "CRL check failed");
                        CrlStatus::failed(url, e)
                    }
                };
                Finished::Crl {
                    position,
                    endpoint,
                    status,
                }
            }
        }
    }
}

/// Every lookup for `chain`; the issuer of position `i` is position `i + 1`
fn jobs(chain: &[Certificate]) -> impl Iterator<Item = Job<'_>> {
    chain.iter().enumerate().flat_map(move |(position, cert)| {
        let issuer = chain.get(position + 1);
        let ocsp = ocsp_endpoints(cert)
            .iter()
            .enumerate()
            .map(move |(endpoint, url)| Job::Ocsp {
                position,
                endpoint,
                url,
                cert,
                issuer,
            });
        let crl = cert
            .crl_distribution_points()
            .iter()
            .enumerate()
            .map(move |(endpoint, url)| Job::Crl {
                position,
                endpoint,
                url,
                cert,
            });
        ocsp.chain(crl)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{assemble, bundled};
    use cacop_core::testing::{CertSpec, Issued, TestPki};
    use cacop_core::{OcspStatus, RevocationReason};
    use chrono::TimeZone;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Scripted checker keyed by URL
    #[derive(Default)]
    struct FakeChecker {
        down: HashSet<String>,
        revoked: HashSet<String>,
        slow: HashSet<String>,
        /// (subject fingerprint, issuer fingerprint) per OCSP call
        ocsp_calls: Mutex<Vec<(String, Option<String>)>>,
    }

    impl FakeChecker {
        fn down(mut self, url: &str) -> Self {
            self.down.insert(url.to_string());
            self
        }

        fn revoked(mut self, url: &str) -> Self {
            self.revoked.insert(url.to_string());
            self
        }

        fn slow(mut self, url: &str) -> Self {
            self.slow.insert(url.to_string());
            self
        }

        async fn answer(&self, url: &str) -> Result<()> {
            if self.slow.contains(url) {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            if self.down.contains(url) {
                return Err(CacopError::Connection(format!("{url}: connection refused")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl StatusChecker for FakeChecker {
        async fn ocsp(&self, url: &str, cert: &Certificate, issuer: Option<&Certificate>) -> Result<OcspOutcome> {
            self.ocsp_calls.lock().unwrap().push((
                cert.fingerprint().to_string(),
                issuer.map(|i| i.fingerprint().to_string()),
            ));
            self.answer(url).await?;
            if issuer.is_none() {
                return Err(CacopError::MissingIssuer {
                    subject: cert.subject().to_string(),
                });
            }
            let status = if self.revoked.contains(url) {
                OcspStatus::Revoked
            } else {
                OcspStatus::Good
            };
            Ok(OcspOutcome {
                status,
                revoked_at: None,
                reason: None,
                this_update: Utc::now(),
                next_update: None,
            })
        }

        async fn crl(&self, url: &str, _cert: &Certificate) -> Result<CrlOutcome> {
            self.answer(url).await?;
            Ok(CrlOutcome {
                revoked: self.revoked.contains(url),
                revoked_at: None,
                reason: self
                    .revoked
                    .contains(url)
                    .then_some(RevocationReason::Superseded),
            })
        }
    }

    /// Leaf-first chain of `len` certificates ending in a self-signed root
    fn chain_of(len: usize, leaf: CertSpec) -> Vec<Certificate> {
        let mut issuers = vec![Issued::self_signed(&CertSpec::ca("Chain Root"))];
        for depth in 1..len.saturating_sub(1) {
            let next = issuers[depth - 1].issue(CertSpec::ca(format!("Chain Intermediate {depth}")));
            issuers.push(next);
        }
        let mut chain: Vec<Certificate> = issuers.iter().rev().map(Issued::certificate).collect();
        if len > 1 {
            chain.insert(0, issuers[issuers.len() - 1].issue(leaf).certificate());
        }
        chain
    }

    #[test]
    fn empty_chain_is_rejected() {
        let verifier = ChainVerifier::new(FakeChecker::default());
        let result = tokio_test::block_on(verifier.verify(&[]));
        assert!(matches!(result, Err(CacopError::EmptyChain)));
    }

    #[tokio::test]
    async fn report_positions_match_input_positions() {
        let verifier = ChainVerifier::new(FakeChecker::default());
        for len in 2..=5 {
            let chain = chain_of(len, CertSpec::leaf("positions.example.test"));
            let report = verifier.verify(&chain).await.unwrap();

            assert_eq!(report.len(), len);
            assert_eq!(report.intermediates.len(), len - 2);
            assert_eq!(report.leaf.fingerprint, chain[0].fingerprint());
            assert_eq!(report.root.fingerprint, chain[len - 1].fingerprint());
            for (i, result) in report.intermediates.iter().enumerate() {
                assert_eq!(result.fingerprint, chain[i + 1].fingerprint());
            }
        }
    }

    #[tokio::test]
    async fn single_certificate_chain_is_leaf_and_root() {
        let root = TestPki::new().root.certificate();
        let verifier = ChainVerifier::new(FakeChecker::default());
        let report = verifier.verify(&[root.clone()]).await.unwrap();

        assert!(report.is_anchor_only());
        assert_eq!(report.leaf.fingerprint, root.fingerprint());
        assert_eq!(report.root.fingerprint, root.fingerprint());
        assert!(report.intermediates.is_empty());
    }

    #[tokio::test]
    async fn repeated_presented_certificate_keeps_both_positions() {
        let root = TestPki::new().root.certificate();
        let chain = bundled(vec![root.clone(), root]).unwrap();
        let verifier = ChainVerifier::new(FakeChecker::default());
        let report = verifier.verify(&chain).await.unwrap();

        assert!(!report.is_anchor_only());
        assert_eq!(report.len(), 2);
        assert_eq!(report.iter().count(), 2);
    }

    #[tokio::test]
    async fn failed_endpoint_does_not_affect_siblings() {
        let leaf = CertSpec::leaf("siblings.example.test")
            .ocsp("http://ocsp-a.example.test")
            .ocsp("http://ocsp-down.example.test")
            .ocsp("http://ocsp-c.example.test")
            .crl("http://crl-down.example.test/leaf.crl")
            .crl("http://crl-revoked.example.test/leaf.crl");
        let chain = TestPki::with_leaf(leaf).chain();
        let checker = FakeChecker::default()
            .down("http://ocsp-down.example.test")
            .down("http://crl-down.example.test/leaf.crl")
            .revoked("http://crl-revoked.example.test/leaf.crl");

        let report = ChainVerifier::new(checker).verify(&chain).await.unwrap();
        let leaf = &report.leaf;

        assert_eq!(leaf.ocsp.len(), 3);
        assert_eq!(leaf.ocsp[0].status, Some(OcspStatus::Good));
        assert!(leaf.ocsp[1].error.as_deref().unwrap().contains("connection refused"));
        assert_eq!(leaf.ocsp[1].responder, "http://ocsp-down.example.test");
        assert_eq!(leaf.ocsp[2].status, Some(OcspStatus::Good));

        assert_eq!(leaf.crl.len(), 2);
        assert!(leaf.crl[0].is_error());
        assert!(leaf.crl[1].revoked);
        assert_eq!(leaf.crl[1].reason, Some(RevocationReason::Superseded));
        assert!(report.any_revoked());
    }

    #[tokio::test]
    async fn ocsp_uses_next_position_as_issuer() {
        let leaf = CertSpec::leaf("issuer.example.test").ocsp("http://ocsp.example.test");
        let chain = TestPki::with_leaf(leaf).chain();
        let verifier = ChainVerifier::new(FakeChecker::default());

        verifier.verify(&chain).await.unwrap();

        let calls = verifier.checker().ocsp_calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![(
                chain[0].fingerprint().to_string(),
                Some(chain[1].fingerprint().to_string())
            )]
        );
    }

    #[tokio::test]
    async fn ca_certificates_get_crl_but_not_ocsp_checks() {
        let root = Issued::self_signed(&CertSpec::ca("CRL Root"));
        let intermediate = root.issue(
            CertSpec::ca("CRL Intermediate")
                .ocsp("http://ocsp.root.example.test")
                .crl("http://crl.root.example.test/root.crl"),
        );
        let chain = vec![intermediate.certificate(), root.certificate()];
        let verifier = ChainVerifier::new(FakeChecker::default());

        let report = verifier.verify(&chain).await.unwrap();

        assert!(report.leaf.ocsp.is_empty());
        assert_eq!(report.leaf.crl.len(), 1);
        assert!(verifier.checker().ocsp_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bundled_chain_without_ca_terminal_lacks_issuer() {
        let leaf = CertSpec::leaf("lonely.example.test")
            .ocsp("http://ocsp-1.example.test")
            .ocsp("http://ocsp-2.example.test");
        let pki = TestPki::with_leaf(leaf);
        let chain = bundled(vec![pki.leaf.certificate()]).unwrap();

        let report = ChainVerifier::new(FakeChecker::default())
            .verify(&chain)
            .await
            .unwrap();

        assert_eq!(report.leaf.ocsp.len(), 2);
        assert!(report
            .leaf
            .ocsp
            .iter()
            .all(|s| s.error.as_deref().is_some_and(|e| e.contains("issuer"))));
    }

    #[tokio::test]
    async fn assembled_chain_uses_anchor_as_leaf_issuer() {
        let leaf = CertSpec::leaf("anchored.example.test").ocsp("http://ocsp.example.test");
        let pki = TestPki::with_leaf(leaf);
        let chain = assemble(vec![pki.leaf.certificate()], pki.intermediate.certificate()).unwrap();
        let verifier = ChainVerifier::new(FakeChecker::default());

        let report = verifier.verify(&chain).await.unwrap();

        assert_eq!(report.leaf.ocsp[0].status, Some(OcspStatus::Good));
        let calls = verifier.checker().ocsp_calls.lock().unwrap().clone();
        assert_eq!(
            calls[0].1.as_deref(),
            Some(pki.intermediate.certificate().fingerprint())
        );
    }

    #[tokio::test]
    async fn deadline_marks_unfinished_checks_incomplete() {
        let leaf = CertSpec::leaf("deadline.example.test")
            .ocsp("http://ocsp-fast.example.test")
            .ocsp("http://ocsp-slow.example.test")
            .crl("http://crl-slow.example.test/leaf.crl");
        let chain = TestPki::with_leaf(leaf).chain();
        let checker = FakeChecker::default()
            .slow("http://ocsp-slow.example.test")
            .slow("http://crl-slow.example.test/leaf.crl");
        let verifier = ChainVerifier::new(checker)
            .with_options(VerifyOptions::new().deadline(Duration::from_millis(200)));

        let report = verifier.verify(&chain).await.unwrap();
        let incomplete = CacopError::Incomplete.to_string();

        assert_eq!(report.leaf.ocsp[0].status, Some(OcspStatus::Good));
        assert_eq!(report.leaf.ocsp[1].error.as_deref(), Some(incomplete.as_str()));
        assert_eq!(report.leaf.ocsp[1].responder, "http://ocsp-slow.example.test");
        assert_eq!(report.leaf.crl[0].error.as_deref(), Some(incomplete.as_str()));
        assert!(!report.root.expiration.expired);
    }

    #[tokio::test]
    async fn revocation_client_checks_published_crl() {
        let server = MockServer::start().await;
        let pki = TestPki::with_leaf(
            CertSpec::leaf("network.example.test")
                .serial(4242)
                .crl(format!("{}/int.crl", server.uri())),
        );
        let crl = pki
            .intermediate
            .crl_der(&[(4242, Some(RevocationReason::KeyCompromise))]);
        Mock::given(method("GET"))
            .and(path("/int.crl"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(crl))
            .mount(&server)
            .await;

        let verifier = ChainVerifier::new(RevocationClient::new().unwrap());
        let report = verifier.verify(&pki.chain()).await.unwrap();

        assert!(report.leaf.crl[0].revoked);
        assert_eq!(report.leaf.crl[0].reason, Some(RevocationReason::KeyCompromise));
        assert!(report.intermediates[0].crl.is_empty());
    }

    #[tokio::test]
    async fn every_position_gets_an_expiration_verdict() {
        let now = Utc.with_ymd_and_hms(2033, 3, 1, 0, 0, 0).unwrap();
        let chain = TestPki::new().chain();
        let verifier =
            ChainVerifier::new(FakeChecker::default()).with_options(VerifyOptions::new().at(now));

        let report = verifier.verify(&chain).await.unwrap();

        assert!(report.iter().all(|r| r.expiration.expired));
        assert!(report.iter().all(|r| r.expiration.now == now));
        assert!(report.any_expired());
    }

    #[tokio::test]
    async fn expired_intermediate_still_checks_other_positions() {
        let root = Issued::self_signed(&CertSpec::ca("Expiry Root"));
        let start = Utc::now() - chrono::Duration::days(400);
        let intermediate = root.issue(
            CertSpec::ca("Expired Intermediate")
                .validity(start, start + chrono::Duration::days(30))
                .crl("http://crl.example.test/int.crl"),
        );
        let leaf = intermediate.issue(CertSpec::leaf("after-expiry.example.test").ocsp("http://ocsp.example.test"));
        let chain = vec![leaf.certificate(), intermediate.certificate(), root.certificate()];

        let report = ChainVerifier::new(FakeChecker::default())
            .verify(&chain)
            .await
            .unwrap();

        assert!(!report.leaf.expiration.expired);
        assert!(report.intermediates[0].expiration.expired);
        assert!(!report.root.expiration.expired);
        assert_eq!(report.leaf.ocsp[0].status, Some(OcspStatus::Good));
        assert_eq!(report.intermediates[0].crl.len(), 1);
    }
}
