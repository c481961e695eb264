//! Native chain validation.

use crate::config::CertutilConfig;
use crate::database::{Certutil, TrustKind, Usage};
use crate::error::{CertutilError, CertutilResult};
use async_trait::async_trait;
use cacop_core::{Chain, ValidationVerdict};
use tracing::{info, warn};

/// Validates an assembled chain outside the revocation checks.
#[async_trait]
pub trait ChainValidator: Send + Sync {
    /// Judge `chain`; a rejection is a verdict, an error means the tool
    /// could not be run
    async fn validate(&self, chain: &Chain) -> CertutilResult<ValidationVerdict>;
}

/// Validation with NSS `certutil`.
///
/// Each call gets its own database: the root is installed as a trusted CA,
/// intermediates and the leaf without trust, then the leaf is verified.
#[derive(Debug, Clone)]
pub struct NssValidator {
    config: CertutilConfig,
}

impl NssValidator {
    /// Probe the tool and build a validator
    pub async fn new(config: CertutilConfig) -> CertutilResult<Self> {
        Certutil::probe(&config).await?;
        info!(program = %config.program().display(), "certutil available");
        Ok(Self { config })
    }
}

#[async_trait]
impl ChainValidator for NssValidator {
    async fn validate(&self, chain: &Chain) -> CertutilResult<ValidationVerdict> {
        let db = Certutil::new(self.config.clone()).await?;

        let root = chain.root();
        db.install(root, TrustKind::Ca).await?;
        if chain.len() > 1 {
            for cert in chain.intermediates() {
                db.install(cert, TrustKind::Untrusted).await?;
            }
            db.install(chain.leaf(), TrustKind::Untrusted).await?;
        }

        let leaf = chain.leaf();
        match db.verify(leaf, Usage::for_certificate(leaf)).await {
            Ok(_) => Ok(ValidationVerdict {
                valid: true,
                reason: None,
                chain: db.list_chain(leaf).await?,
            }),
            Err(CertutilError::Failed { output, .. }) => {
                warn!(leaf = %leaf.fingerprint(), reason = %output, "certutil rejected chain");
                Ok(ValidationVerdict {
                    valid: false,
                    reason: Some(output),
                    chain: db.list_chain(leaf).await.unwrap_or_default(),
                })
            }
            Err(e) => Err(e),
        }
    }
}
