//! CLI command definitions
//!
//! Defines the clap commands for the acceptance harness.

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Where to find the deployment under test
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Service root, e.g. https://rag.example.com
    #[arg(long, env = "RAG_BASE_URL")]
    pub base_url: Option<String>,
}

/// Target plus the key-provisioning credential
#[derive(Args, Debug, Clone)]
pub struct AdminArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Key for the key-provisioning endpoint
    #[arg(long, env = "RAG_ADMIN_KEY", hide_env_values = true)]
    pub admin_key: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full acceptance suite
    Run {
        #[command(flatten)]
        admin: AdminArgs,

        /// YAML scenario overriding the built-in corpus and questions
        #[arg(long)]
        scenario: Option<PathBuf>,

        /// Require a doc_id in every ingest acknowledgment
        #[arg(long)]
        strict_ingest: bool,

        /// Probe /health and /bedrock/status first
        #[arg(long)]
        preflight: bool,

        /// Print the suite report as JSON instead of step lines
        #[arg(long)]
        json: bool,
    },

    /// Provision fresh credentials and print them
    Provision {
        #[command(flatten)]
        admin: AdminArgs,

        /// Number of credentials; all must belong to distinct tenants
        #[arg(long, short = 'n', default_value = "1")]
        count: usize,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check service health and model availability
    Status {
        #[command(flatten)]
        target: TargetArgs,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },
}
