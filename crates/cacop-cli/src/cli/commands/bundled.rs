//! `cacop bundled` - Verify a subject's chain as presented.

use anyhow::Result;

use super::Context;
use crate::cli::args::BundledArgs;
use crate::output::{self, OutputFormat};

pub async fn execute(ctx: Context, args: BundledArgs) -> Result<()> {
    let service = ctx.service(args.deadline).await?;
    let report = service.bundled(&args.subject).await?;

    match ctx.output_format {
        OutputFormat::Pretty => print!("{}", output::render_report(&report)),
        format => println!("{}", output::serialize(&report, format)?),
    }
    Ok(())
}
