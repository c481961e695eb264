//! Ephemeral NSS certificate databases driven through `certutil`.

use crate::config::{CertutilConfig, LIBRARY_PATH_VAR};
use crate::error::{CertutilError, CertutilResult};
use cacop_core::Certificate;
use std::path::Path;
use std::process::{Output, Stdio};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// First line of certutil's usage text
const BANNER: &str = "certutil - Utility to manipulate NSS certificate databases";

/// Trust attributes for an installed certificate (SSL, S/MIME, code signing)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustKind {
    /// Trusted CA for server certificates
    Ca,
    /// Trusted peer
    Peer,
    /// No explicit trust; usable as a path element only
    Untrusted,
}

impl TrustKind {
    /// The `-t` argument
    #[must_use]
    pub const fn trust_args(self) -> &'static str {
        match self {
            Self::Ca => "C,p,p",
            Self::Peer => "P,p,p",
            Self::Untrusted => ",,",
        }
    }
}

/// Certificate usage checked by `certutil -V`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    /// SSL server
    SslServer,
    /// SSL CA
    SslCa,
}

impl Usage {
    /// The `-u` argument
    #[must_use]
    pub const fn flag(self) -> &'static str {
        match self {
            Self::SslServer => "V",
            Self::SslCa => "L",
        }
    }

    /// Usage matching the role of `cert`
    #[must_use]
    pub const fn for_certificate(cert: &Certificate) -> Self {
        if cert.is_ca() {
            Self::SslCa
        } else {
            Self::SslServer
        }
    }
}

/// A throwaway certificate database.
///
/// The database lives in a temporary directory that is removed when the
/// value is dropped. Certificates are named by their fingerprint.
#[derive(Debug)]
pub struct Certutil {
    config: CertutilConfig,
    db: TempDir,
}

impl Certutil {
    /// Confirm the configured program is runnable and really is certutil
    pub async fn probe(config: &CertutilConfig) -> CertutilResult<()> {
        // Without arguments certutil prints its usage and exits non-zero.
        let output = spawn(config, &[], None).await.map_err(|e| CertutilError::NotFound {
            program: config.program(),
            reason: e.to_string(),
        })?;
        if combined(&output).contains(BANNER) {
            Ok(())
        } else {
            Err(CertutilError::NotFound {
                program: config.program(),
                reason: "unexpected usage text".into(),
            })
        }
    }

    /// Create an empty, password-less database in a fresh temp directory
    pub async fn new(config: CertutilConfig) -> CertutilResult<Self> {
        let db = tempfile::Builder::new().prefix("cacop-nssdb-").tempdir()?;
        let this = Self { config, db };
        this.run(&["-N", "--empty-password"], None).await?;
        debug!(db = %this.db.path().display(), "created NSS database");
        Ok(this)
    }

    /// Directory holding the database files
    #[must_use]
    pub fn database_dir(&self) -> &Path {
        self.db.path()
    }

    /// Add `cert` with the given trust
    pub async fn install(&self, cert: &Certificate, trust: TrustKind) -> CertutilResult<String> {
        self.run(
            &["-A", "-t", trust.trust_args(), "-n", cert.fingerprint()],
            Some(cert.der()),
        )
        .await
    }

    /// Verify an installed certificate, including its signature, for `usage`
    pub async fn verify(&self, cert: &Certificate, usage: Usage) -> CertutilResult<String> {
        self.run(
            &["-V", "-e", "-n", cert.fingerprint(), "-u", usage.flag()],
            None,
        )
        .await
    }

    /// Chain certutil builds for an installed certificate, leaf first
    pub async fn list_chain(&self, cert: &Certificate) -> CertutilResult<Vec<String>> {
        let out = self.run(&["-O", "-n", cert.fingerprint()], None).await?;
        let mut chain: Vec<String> = out.lines().filter_map(nickname).collect();
        chain.reverse();
        Ok(chain)
    }

    async fn run(&self, args: &[&str], stdin: Option<&[u8]>) -> CertutilResult<String> {
        let dir = format!("sql:{}", self.db.path().display());
        let mut full: Vec<&str> = args.to_vec();
        full.extend(["-d", dir.as_str()]);

        let output = spawn(&self.config, &full, stdin).await?;
        let text = combined(&output);
        if output.status.success() {
            Ok(text)
        } else {
            Err(CertutilError::Failed {
                operation: args.first().copied().unwrap_or_default().to_string(),
                status: output.status.to_string(),
                output: text,
            })
        }
    }
}

async fn spawn(config: &CertutilConfig, args: &[&str], stdin: Option<&[u8]>) -> std::io::Result<Output> {
    let mut command = Command::new(config.program());
    command
        .args(args)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(path) = config.library_path(std::env::var_os(LIBRARY_PATH_VAR)) {
        command.env(LIBRARY_PATH_VAR, path);
    }
    debug!(program = %config.program().display(), ?args, "running certutil");

    let mut child = command.spawn()?;
    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(input).await?;
    }
    child.wait_with_output().await
}

fn combined(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text.trim().to_string()
}

/// Nickname from one `certutil -O` line, e.g. `  "abcd..." [CN=Root]`
fn nickname(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let name = line
        .strip_prefix('"')
        .and_then(|rest| rest.split_once('"'))
        .map_or(line, |(name, _)| name);
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cacop_core::testing::TestPki;

    #[test]
    fn trust_and_usage_arguments() {
        assert_eq!(TrustKind::Ca.trust_args(), "C,p,p");
        assert_eq!(TrustKind::Peer.trust_args(), "P,p,p");
        assert_eq!(Usage::SslServer.flag(), "V");
        assert_eq!(Usage::SslCa.flag(), "L");

        let pki = TestPki::new();
        assert_eq!(Usage::for_certificate(&pki.leaf.certificate()), Usage::SslServer);
        assert_eq!(Usage::for_certificate(&pki.root.certificate()), Usage::SslCa);
    }

    #[test]
    fn parses_chain_listing() {
        let out = "\"root-fp\" [CN=Test Root CA]\n\n  \"int-fp\" [CN=Test Intermediate CA]\n    \"leaf-fp\" [CN=leaf]";
        let names: Vec<String> = out.lines().filter_map(nickname).collect();
        assert_eq!(names, vec!["root-fp", "int-fp", "leaf-fp"]);
        assert_eq!(nickname("  bare-name  ").as_deref(), Some("bare-name"));
    }

    #[tokio::test]
    async fn probe_reports_missing_program() {
        let config = CertutilConfig {
            bin_dir: Some("/nonexistent/nss/bin".into()),
            lib_dir: None,
        };
        let err = Certutil::probe(&config).await.unwrap_err();
        assert!(matches!(err, CertutilError::NotFound { .. }));
    }

    #[cfg(unix)]
    mod fake_tool {
        use super::*;
        use crate::fake::{calls, install_fake};

        #[tokio::test]
        async fn probe_accepts_certutil_banner() {
            let (_dir, config) = install_fake(false);
            Certutil::probe(&config).await.unwrap();
        }

        #[tokio::test]
        async fn database_lifecycle() {
            let (dir, config) = install_fake(false);
            let pki = TestPki::new();
            let root = pki.root.certificate();

            let certutil = Certutil::new(config).await.unwrap();
            let db = certutil.database_dir().to_path_buf();
            assert!(db.exists());

            certutil.install(&root, TrustKind::Ca).await.unwrap();
            let chain = certutil.list_chain(&root).await.unwrap();
            assert_eq!(chain, vec!["leaf-fp", "root-fp"]);

            let err = certutil.verify(&root, Usage::SslCa).await.unwrap_err();
            assert!(matches!(&err, CertutilError::Failed { operation, .. } if operation == "-V"));
            assert!(err.to_string().contains("issuer is not recognized"));

            let log = calls(&dir);
            assert!(log[0].starts_with("-N --empty-password -d sql:"));
            assert!(log[1].starts_with(&format!("-A -t C,p,p -n {}", root.fingerprint())));

            drop(certutil);
            assert!(!db.exists());
        }
    }
}
