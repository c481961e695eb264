//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use cacop::certutil::CertutilConfig;
use clap::Parser;

use crate::config::Config;
use crate::logging;
use crate::output::OutputFormat;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    logging::init(cli.verbose, cli.no_color);

    let mut config = Config::load(cli.config.as_deref())?;

    // Flags override the file
    if cli.certutil {
        config.certutil.enabled = true;
    }
    if let Some(dist) = &cli.nss_dist {
        config.certutil.tool = CertutilConfig::from_dist(dist);
    }

    let output_format = cli
        .output
        .or(config.output_format)
        .unwrap_or(OutputFormat::Pretty);

    let ctx = commands::Context {
        config,
        config_path: cli.config,
        output_format,
    };

    match cli.command {
        Commands::Check(args) => commands::check::execute(ctx, args).await,
        Commands::Bundled(args) => commands::bundled::execute(ctx, args).await,
        Commands::Inspect(args) => commands::inspect::execute(&ctx, &args),
        Commands::Serve(args) => commands::serve::execute(ctx, args).await,
        Commands::Config(args) => commands::config::execute(&ctx, &args),
    }
}
