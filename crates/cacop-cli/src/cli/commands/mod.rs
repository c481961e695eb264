//! Command implementations.

pub mod bundled;
pub mod check;
pub mod config;
pub mod inspect;
pub mod serve;

use anyhow::{Context as _, Result};
use cacop::certutil::NssValidator;
use cacop::ChainVerifier;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::output::OutputFormat;
use crate::peer::TlsChainSource;
use crate::service::Service;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Effective configuration (file plus CLI overrides)
    pub config: Config,

    /// Explicit config file, if one was given
    pub config_path: Option<PathBuf>,

    /// Output format
    pub output_format: OutputFormat,
}

impl Context {
    /// Assemble the verification service from the effective configuration.
    ///
    /// `deadline` overrides the configured revocation budget.
    pub async fn service(&self, deadline: Option<u64>) -> Result<Service> {
        let client = self
            .config
            .client
            .builder()
            .build()
            .context("building revocation client")?;

        let mut options = self.config.client.verify_options();
        if let Some(secs) = deadline {
            options = options.deadline(Duration::from_secs(secs));
        }

        let source = TlsChainSource::new(self.config.client.peer_timeout())
            .context("building TLS client")?;
        let service = Service::new(
            Arc::new(source),
            ChainVerifier::new(client).with_options(options),
        );

        if !self.config.certutil.enabled {
            return Ok(service);
        }
        let tool = self.config.certutil.tool.clone();
        debug!(program = %tool.program().display(), "enabling certutil validation");
        let validator = NssValidator::new(tool)
            .await
            .context("certutil validation requested but the tool is unusable")?;
        Ok(service.with_validator(Arc::new(validator)))
    }
}
