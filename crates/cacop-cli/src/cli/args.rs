//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Certificate chain revocation and expiration checks.
///
/// Retrieves the chain a TLS endpoint presents, checks every certificate
/// against its OCSP responders and CRL distribution points, and reports
/// expiration per position.
#[derive(Parser, Debug)]
#[command(name = "cacop")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file (defaults to the per-user config directory)
    #[arg(short, long, env = "CACOP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Validate every chain with NSS certutil as well
    #[arg(long, global = true)]
    pub certutil: bool,

    /// NSS distribution directory containing bin/ and lib/
    #[arg(long, env = "CACOP_NSS_DIST", global = true)]
    pub nss_dist: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Verify a subject's chain against a trust anchor
    Check(CheckArgs),

    /// Verify a subject's chain as presented
    Bundled(BundledArgs),

    /// Show the fields of a PEM certificate
    Inspect(InspectArgs),

    /// Run the HTTP service
    Serve(ServeArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),
}

// ============================================================================
// Check command
// ============================================================================

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Subject URL (https://host[:port]) or bare host[:port]
    #[arg(short, long)]
    pub subject: String,

    /// PEM file with the trust anchor
    #[arg(short, long)]
    pub anchor: PathBuf,

    /// Overall budget for revocation checks, in seconds
    #[arg(long)]
    pub deadline: Option<u64>,
}

// ============================================================================
// Bundled command
// ============================================================================

#[derive(Args, Debug)]
pub struct BundledArgs {
    /// Subject URL (https://host[:port]) or bare host[:port]
    #[arg(short, long)]
    pub subject: String,

    /// Overall budget for revocation checks, in seconds
    #[arg(long)]
    pub deadline: Option<u64>,
}

// ============================================================================
// Inspect command
// ============================================================================

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// PEM certificate file; line breaks and quoting may be mangled
    pub file: PathBuf,
}

// ============================================================================
// Serve command
// ============================================================================

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen address (overrides the config file)
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,
}

// ============================================================================
// Config command
// ============================================================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Show config file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "cacop",
            "check",
            "--subject",
            "example.test:8443",
            "--anchor",
            "root.pem",
            "-o",
            "json",
            "--certutil",
            "--deadline",
            "15",
        ])
        .unwrap();

        assert_eq!(cli.output, Some(OutputFormat::Json));
        assert!(cli.certutil);
        match cli.command {
            Commands::Check(args) => {
                assert_eq!(args.subject, "example.test:8443");
                assert_eq!(args.anchor, PathBuf::from("root.pem"));
                assert_eq!(args.deadline, Some(15));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn check_requires_an_anchor() {
        assert!(Cli::try_parse_from(["cacop", "check", "-s", "example.test"]).is_err());
    }
}
