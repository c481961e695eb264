//! `cacop check` - Verify a subject's chain against a trust anchor.

use anyhow::{Context as _, Result};

use super::Context;
use crate::cli::args::CheckArgs;
use crate::output::{self, OutputFormat};

pub async fn execute(ctx: Context, args: CheckArgs) -> Result<()> {
    let anchor = std::fs::read(&args.anchor)
        .with_context(|| format!("reading trust anchor {}", args.anchor.display()))?;

    let service = ctx.service(args.deadline).await?;
    let report = service.check(&args.subject, &anchor).await?;

    match ctx.output_format {
        OutputFormat::Pretty => print!("{}", output::render_report(&report)),
        format => println!("{}", output::serialize(&report, format)?),
    }
    Ok(())
}
