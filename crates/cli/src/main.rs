//! ADAS demo - main entry point

use adas_cli::{init_logging, run, Cli};
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref(), cli.log_json)?;

    info!("=== ADAS demo v{} ===", env!("CARGO_PKG_VERSION"));
    run(cli).await
}
