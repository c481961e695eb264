//! `cacop serve` - Run the HTTP service.

use anyhow::Result;
use std::sync::Arc;

use super::Context;
use crate::cli::args::ServeArgs;
use crate::server;

pub async fn execute(ctx: Context, args: ServeArgs) -> Result<()> {
    let bind = args.bind.unwrap_or(ctx.config.server.bind);
    let service = ctx.service(None).await?;
    server::serve(bind, Arc::new(service)).await
}
