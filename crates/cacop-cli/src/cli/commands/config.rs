//! `cacop config` - CLI configuration management.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::config::Config;
use crate::output::{self, OutputFormat};

pub fn execute(ctx: &Context, args: &ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(ctx),
        ConfigCommands::Path => show_path(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    match ctx.output_format {
        OutputFormat::Pretty => {
            println!("{}", "Effective Configuration:".bold());
            println!();
            print!("{}", ctx.config.to_toml()?);
        }
        format => println!("{}", output::serialize(&ctx.config, format)?),
    }
    Ok(())
}

fn show_path(ctx: &Context) -> Result<()> {
    let path = match &ctx.config_path {
        Some(path) => path.clone(),
        None => Config::path()?,
    };

    println!("{}", path.display());

    if ctx.output_format == OutputFormat::Pretty && !path.exists() {
        println!(
            "{}",
            "(file does not exist yet, defaults are in effect)".dimmed()
        );
    }

    Ok(())
}
