//! Subject verification shared by the CLI commands and the HTTP service.

use cacop::certutil::ChainValidator;
use cacop::{assemble_pem, bundled, CacopError, Chain, ChainVerifier, RevocationClient, SubjectReport};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::peer::{ChainSource, PeerError};

/// Why a subject could not be verified at all
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The subject's chain could not be retrieved
    #[error(transparent)]
    Peer(#[from] PeerError),

    /// Anchor decoding, assembly or verification failed
    #[error(transparent)]
    Verify(#[from] CacopError),
}

impl ServiceError {
    /// HTTP status for this failure
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Peer(_) => 400,
            Self::Verify(e) => e.status_code(),
        }
    }
}

/// Retrieves, assembles and verifies subject chains.
pub struct Service {
    source: Arc<dyn ChainSource>,
    verifier: ChainVerifier<RevocationClient>,
    validator: Option<Arc<dyn ChainValidator>>,
}

impl Service {
    /// Create a service without native validation
    pub fn new(source: Arc<dyn ChainSource>, verifier: ChainVerifier<RevocationClient>) -> Self {
        Self {
            source,
            verifier,
            validator: None,
        }
    }

    /// Run `validator` on every assembled chain
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn ChainValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Verify `subject`'s chain with `anchor_pem` as its trust anchor
    pub async fn check(&self, subject: &str, anchor_pem: &[u8]) -> Result<SubjectReport, ServiceError> {
        let presented = self.source.fetch(subject).await?;
        let assembly = assemble_pem(presented, anchor_pem)?;
        self.report(subject, &assembly.chain, assembly.warnings).await
    }

    /// Verify `subject`'s chain exactly as presented
    pub async fn bundled(&self, subject: &str) -> Result<SubjectReport, ServiceError> {
        let chain = bundled(self.source.fetch(subject).await?)?;
        self.report(subject, &chain, Vec::new()).await
    }

    async fn report(
        &self,
        subject: &str,
        chain: &Chain,
        warnings: Vec<String>,
    ) -> Result<SubjectReport, ServiceError> {
        let mut report = SubjectReport::new(subject, self.verifier.verify(chain).await?);
        report.warnings = warnings;

        if let Some(validator) = &self.validator {
            match validator.validate(chain).await {
                Ok(verdict) => report.validation = Some(verdict),
                Err(e) => {
                    warn!(subject, error = %e, "native validation unavailable");
                    report.error = Some(e.to_string());
                }
            }
        }

        info!(
            subject,
            revoked = report.chain.any_revoked(),
            expired = report.chain.any_expired(),
            "subject verified"
        );
        Ok(report)
    }
}
