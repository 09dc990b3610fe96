//! CLI command handling
//!
//! Resolves configuration, builds the HTTP client and formats output.

use colored::Colorize;
use serde_json::json;

use crate::api::{ApiClient, BedrockStatus, StudyApi};
use crate::commands::{AdminArgs, Commands};
use crate::common::config::{Config, RunConfig};
use crate::common::{Error, Result};
use crate::testing::{self, Scenario};

/// Dispatch a CLI command, returning the process exit code
pub async fn dispatch(command: Commands) -> Result<i32> {
    let config = Config::load()?;

    match command {
        Commands::Run {
            admin,
            scenario,
            strict_ingest,
            preflight,
            json,
        } => {
            let (base_url, admin_key) = resolve_admin(&config, admin)?;
            let scenario = match scenario {
                Some(path) => Scenario::load(&path)?,
                None => Scenario::default(),
            };

            let client = ApiClient::new(&base_url)?;
            let run_config = RunConfig {
                base_url: client.base_url().to_string(),
                admin_key,
                strict_ingest: strict_ingest || config.run.strict_ingest,
                preflight: preflight || config.run.preflight,
                quiet: json,
            };

            let report = testing::run_suite(&client, run_config, &scenario).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }

            Ok(if report.passed { 0 } else { 1 })
        }

        Commands::Provision { admin, count, json } => {
            if count == 0 {
                return Err(Error::Config("--count must be at least 1".to_string()));
            }
            let (base_url, admin_key) = resolve_admin(&config, admin)?;
            let client = ApiClient::new(&base_url)?;

            let credentials = testing::provision_many(&client, &admin_key, count).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&credentials)?);
            } else {
                for credential in &credentials {
                    println!("user_id: {}", credential.user_id);
                    println!("api_key: {}", credential.api_key);
                }
                if count > 1 {
                    println!(
                        "{} {} distinct tenants",
                        "✓".green(),
                        credentials.len()
                    );
                }
            }

            Ok(0)
        }

        Commands::Status { target, json } => {
            let base_url = config.base_url(target.base_url)?;
            let client = ApiClient::new(&base_url)?;
            status(&client, json).await
        }
    }
}

fn resolve_admin(config: &Config, admin: AdminArgs) -> Result<(String, String)> {
    let base_url = config.base_url(admin.target.base_url)?;
    let admin_key = config.admin_key(admin.admin_key)?;
    Ok((base_url, admin_key))
}

/// Print health and bedrock status; unhealthy services exit non-zero
async fn status(client: &ApiClient, json: bool) -> Result<i32> {
    let health = client.health().await;
    let healthy = matches!(
        &health,
        Ok(value) if value.get("status").and_then(|s| s.as_str()) == Some("ok")
    );
    let bedrock = client.bedrock_status().await;

    if json {
        let output = json!({
            "base_url": client.base_url(),
            "healthy": healthy,
            "health": health.as_ref().ok(),
            "bedrock": bedrock.as_ref().ok(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(if healthy { 0 } else { 1 });
    }

    println!("{} {}", "Target:".blue().bold(), client.base_url());

    match &health {
        Ok(value) if healthy => println!("  {} health: {}", "✓".green(), value),
        Ok(value) => println!("  {} health: {}", "✗".red(), value),
        Err(e) => println!("  {} health: {}", "✗".red(), e),
    }

    match bedrock {
        Ok(value) => match serde_json::from_value::<BedrockStatus>(value.clone()) {
            Ok(report) => print_bedrock_status(&report),
            Err(_) => println!("  {} bedrock: {}", "?".yellow(), value),
        },
        Err(e) => println!("  {} bedrock: {}", "?".yellow(), e.to_string().dimmed()),
    }

    Ok(if healthy { 0 } else { 1 })
}

fn print_bedrock_status(report: &BedrockStatus) {
    let mark = |ok: bool| if ok { "✓".green() } else { "✗".red() };

    println!(
        "  {} bedrock enabled{}",
        mark(report.use_bedrock),
        report
            .region
            .as_deref()
            .map(|r| format!(" ({})", r))
            .unwrap_or_default()
    );
    if let Some(model) = &report.chat_model_id {
        println!("    {} chat model {}", mark(report.chat_invoke_ok), model.dimmed());
    }
    if let Some(model) = &report.embedding_model_id {
        let dim = report
            .embedding_dim
            .map(|d| format!(", dim {}", d))
            .unwrap_or_default();
        println!(
            "    {} embedding model {}{}",
            mark(report.embedding_invoke_ok),
            model.dimmed(),
            dim
        );
    }
    for error in &report.errors {
        println!("    {} {}", "!".yellow(), error);
    }
}
