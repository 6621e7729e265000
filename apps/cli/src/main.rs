//! TalkMeta CLI: manage and run a talk lookup stage from the terminal.
//!
//! Stage definitions are JSON files; `run` feeds a tab-separated file
//! through the stage and prints the enriched rows as JSON lines.

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
