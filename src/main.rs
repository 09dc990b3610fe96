//! RAG acceptance - black-box contract tests for multi-tenant RAG services
//!
//! Provisions credentials, ingests a known corpus, checks the answers and
//! verifies that one tenant cannot read another tenant's notebook.

use clap::Parser;
use commands::Commands;
use rag_acceptance::{cli, commands, common};

#[derive(Parser)]
#[command(name = "rag-acceptance", about = "Acceptance tests for RAG study assistant APIs")]
#[command(version, long_about = None)]
struct Cli {
    /// Log request and response traffic
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    common::logging::init_cli(cli.verbose);

    match cli::dispatch(cli.command).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
