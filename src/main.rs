// Qmirac - Local-first business analysis pipeline
// Main entry point

use anyhow::Result;
use clap::Parser;

use qmirac::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    Cli::parse().run().await
}
