//! Bookshelf CLI: mirror a Goodreads shelf into local content records.
//!
//! Walks the paginated `review/list` feed for one user and shelf and writes
//! one JSON record per review.

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
