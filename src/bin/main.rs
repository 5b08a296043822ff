//! Binary entrypoint for the mindgarden tool

use clap::Parser;
use mindgarden::cli::{self, Cli};
use tracing::Level;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // stdout belongs to command output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose() {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .init();

    cli::run(cli).await
}
