//! InsightMatch CLI: public-data aggregation for a company homepage.
//!
//! Gathers registry filings, news, homepage profile and social mentions
//! into one JSON result.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // A missing .env is fine; the environment may already carry the key.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
