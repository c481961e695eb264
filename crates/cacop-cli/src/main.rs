//! cacop - certificate chain revocation and expiration checks.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    cacop_cli::run().await
}
