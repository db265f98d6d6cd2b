//! InputBuilder CLI: regenerates simulated inputs for example directories.
//!
//! Stages build scripts into each example, runs the external simulation
//! tool on them, and verifies the resulting artifact.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
