//! Configuration management.

use anyhow::{Context as _, Result};
use cacop::certutil::CertutilConfig;
use cacop::{RetryConfig, RevocationClient, RevocationClientBuilder, VerifyOptions};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::output::OutputFormat;

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default output format.
    pub output_format: Option<OutputFormat>,

    /// Revocation client settings.
    pub client: ClientSection,

    /// HTTP service settings.
    pub server: ServerSection,

    /// NSS certutil validation.
    pub certutil: CertutilSection,
}

/// `[client]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Concurrent outbound OCSP/CRL requests.
    pub max_in_flight: usize,

    /// Largest accepted OCSP response or CRL.
    pub max_body_bytes: usize,

    /// Retries for timeouts, connection failures and 5xx answers.
    pub max_retries: u32,

    /// Budget for all revocation checks of one chain.
    pub deadline_secs: Option<u64>,

    /// Timeout for retrieving a subject's chain over TLS.
    pub peer_timeout_secs: u64,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            connect_timeout_secs: 5,
            max_in_flight: 8,
            max_body_bytes: 16 * 1024 * 1024,
            max_retries: 0,
            deadline_secs: None,
            peer_timeout_secs: 10,
        }
    }
}

impl ClientSection {
    /// Builder for the revocation client.
    pub fn builder(&self) -> RevocationClientBuilder {
        RevocationClient::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .max_in_flight(self.max_in_flight)
            .max_body_bytes(self.max_body_bytes)
            .retry(RetryConfig::new().max_retries(self.max_retries))
    }

    /// Options for each verification run.
    pub fn verify_options(&self) -> VerifyOptions {
        self.deadline_secs
            .map_or_else(VerifyOptions::new, |secs| {
                VerifyOptions::new().deadline(Duration::from_secs(secs))
            })
    }

    /// Peer handshake timeout.
    pub const fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }
}

/// `[server]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Listen address.
    pub bind: SocketAddr,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

/// `[certutil]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertutilSection {
    /// Run NSS validation on every chain.
    pub enabled: bool,

    /// Tool location.
    #[serde(flatten)]
    pub tool: CertutilConfig,
}

impl Config {
    /// Get the default config file path.
    pub fn path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("org", "cacop", "cacop")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing default file yields defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::path()?;
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
