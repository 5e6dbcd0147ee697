//! cordon - aggregate IP denylists and answer who claims an address.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    cordon_cli::run().await
}
