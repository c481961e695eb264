//! `cacop inspect` - Show the fields of a PEM certificate.

use anyhow::{Context as _, Result};
use cacop::pem::decode_certificate;
use colored::Colorize;

use super::Context;
use crate::cli::args::InspectArgs;
use crate::output::{self, OutputFormat};

pub fn execute(ctx: &Context, args: &InspectArgs) -> Result<()> {
    let text = std::fs::read(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let decoded = decode_certificate(&text)?;

    match ctx.output_format {
        OutputFormat::Pretty => {
            print!("{}", output::render_certificate(&decoded.certificate));
            if decoded.has_trailing_data() {
                println!(
                    "{} ignored {} bytes after the first certificate",
                    "Warning:".yellow().bold(),
                    decoded.trailing_bytes
                );
            }
        }
        format => println!("{}", output::serialize(&decoded.certificate, format)?),
    }
    Ok(())
}
