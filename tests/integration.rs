//! End-to-end integration tests for the acceptance harness
//!
//! These tests verify the complete workflow by:
//! 1. Starting the in-memory mock service (optionally with a fault injected)
//! 2. Running the suite against it, in-process and through the CLI binary
//! 3. Checking that each fault is caught by the step responsible for it

use std::env;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};

use rag_acceptance::common::config::RunConfig;
use rag_acceptance::common::parse_listen_address;
use rag_acceptance::testing::{run_suite, Scenario, Step};
use rag_acceptance::ApiClient;
use serde_json::Value;

/// A running mock service, killed on drop
struct MockService {
    child: Child,
    base_url: String,
}

impl MockService {
    /// Start the mock service with extra flags
    fn start(flags: &[&str]) -> Self {
        let mut child = Command::new(env!("CARGO_BIN_EXE_mock-service"))
            .args(flags)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .expect("Failed to spawn mock-service");

        let stdout = child.stdout.take().expect("mock-service stdout");
        let mut line = String::new();
        BufReader::new(stdout)
            .read_line(&mut line)
            .expect("Failed to read mock-service address");

        let base_url = parse_listen_address(&line)
            .unwrap_or_else(|| panic!("Unexpected mock-service banner: {line:?}"));

        Self { child, base_url }
    }
}

impl Drop for MockService {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Isolated CLI environment so no user config or RAG_* variables leak in
struct CliEnv {
    config_home: tempfile::TempDir,
}

impl CliEnv {
    fn new() -> Self {
        Self {
            config_home: tempfile::tempdir().expect("Failed to create temp config dir"),
        }
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_rag-acceptance"))
            .args(args)
            .env_remove("RAG_BASE_URL")
            .env_remove("RAG_ADMIN_KEY")
            .env_remove("RUST_LOG")
            .env("XDG_CONFIG_HOME", self.config_home.path())
            .env("HOME", self.config_home.path())
            .env("NO_COLOR", "1")
            .output()
            .expect("Failed to run rag-acceptance")
    }
}

fn quiet_config(base_url: &str) -> RunConfig {
    RunConfig {
        quiet: true,
        ..RunConfig::new(base_url, "admin")
    }
}

async fn run_against(flags: &[&str], config: impl FnOnce(&str) -> RunConfig) -> rag_acceptance::testing::SuiteReport {
    let service = MockService::start(flags);
    let client = ApiClient::new(&service.base_url).unwrap();
    run_suite(&client, config(&service.base_url), &Scenario::default()).await
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

// ============== In-process suite ==============

#[tokio::test]
async fn test_compliant_service_passes() {
    let report = run_against(&[], quiet_config).await;

    assert!(report.passed, "suite failed: {:?}", report.error);
    assert_eq!(report.steps_run, 6);
    assert_eq!(report.user_ids.len(), 2);
    assert_ne!(report.user_ids[0], report.user_ids[1]);
}

#[tokio::test]
async fn test_preflight_and_strict_ingest_pass_on_compliant_service() {
    let report = run_against(&[], |url| RunConfig {
        preflight: true,
        strict_ingest: true,
        ..quiet_config(url)
    })
    .await;

    assert!(report.passed, "suite failed: {:?}", report.error);
    assert_eq!(report.steps_total, 7);
}

#[tokio::test]
async fn test_leaky_notebooks_fail_isolation() {
    let report = run_against(&["--leak-notebooks"], quiet_config).await;

    assert!(!report.passed);
    assert_eq!(report.failed_step, Some(Step::Isolation));
    assert_eq!(report.error_kind, Some("tenant_isolation"));
}

#[tokio::test]
async fn test_identity_drift_fails_identity_check() {
    let report = run_against(&["--identity-drift"], quiet_config).await;

    assert_eq!(report.failed_step, Some(Step::Identity));
    assert_eq!(report.error_kind, Some("identity_mismatch"));
}

#[tokio::test]
async fn test_empty_ingest_body_fails_ingestion() {
    let report = run_against(&["--empty-ingest"], quiet_config).await;

    assert_eq!(report.failed_step, Some(Step::Ingest));
    assert_eq!(report.error_kind, Some("ingestion"));
}

#[tokio::test]
async fn test_reused_tenant_fails_second_provisioning() {
    let report = run_against(&["--reuse-keys"], quiet_config).await;

    assert_eq!(report.failed_step, Some(Step::ProvisionB));
    assert_eq!(report.error_kind, Some("tenant_collision"));
}

#[tokio::test]
async fn test_canned_answers_fail_retrieval() {
    let report = run_against(&["--bedrock-disabled"], quiet_config).await;

    assert_eq!(report.failed_step, Some(Step::Retrieval));
    assert!(report.error.unwrap().contains("'Versailles'"));
}

#[tokio::test]
async fn test_answer_probe_handles_alternate_fields() {
    for field in ["response", "message", "none"] {
        let report = run_against(&["--answer-field", field], quiet_config).await;
        assert!(report.passed, "field {field}: {:?}", report.error);
    }
}

#[tokio::test]
async fn test_wrong_admin_key_fails_provisioning() {
    let report = run_against(&["--admin-key", "s3cret"], quiet_config).await;

    assert_eq!(report.failed_step, Some(Step::ProvisionA));
    assert_eq!(report.error_kind, Some("http"));
    assert!(report.error.unwrap().contains("403"));
}

// ============== CLI ==============

#[test]
fn test_cli_run_json_report() {
    let service = MockService::start(&[]);
    let cli = CliEnv::new();

    let output = cli.run(&[
        "run",
        "--base-url",
        &service.base_url,
        "--admin-key",
        "admin",
        "--json",
    ]);

    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report = stdout_json(&output);
    assert_eq!(report["passed"], true);
    assert_eq!(report["steps_run"], 6);
}

#[test]
fn test_cli_run_exits_non_zero_on_leak() {
    let service = MockService::start(&["--leak-notebooks"]);
    let cli = CliEnv::new();

    let output = cli.run(&[
        "run",
        "--base-url",
        &service.base_url,
        "--admin-key",
        "admin",
        "--json",
    ]);

    assert_eq!(output.status.code(), Some(1));
    let report = stdout_json(&output);
    assert_eq!(report["passed"], false);
    assert_eq!(report["failed_step"], "isolation");
}

#[test]
fn test_cli_human_output_names_failed_step() {
    let service = MockService::start(&["--identity-drift"]);
    let cli = CliEnv::new();

    let output = cli.run(&["run", "--base-url", &service.base_url, "--admin-key", "admin"]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("identity check"), "stdout: {stdout}");
    assert!(stdout.contains("Suite Failed"), "stdout: {stdout}");
}

#[test]
fn test_cli_reads_target_from_environment() {
    let service = MockService::start(&[]);
    let cli = CliEnv::new();

    let output = Command::new(env!("CARGO_BIN_EXE_rag-acceptance"))
        .args(["run", "--json"])
        .env("RAG_BASE_URL", &service.base_url)
        .env("RAG_ADMIN_KEY", "admin")
        .env("XDG_CONFIG_HOME", cli.config_home.path())
        .env("HOME", cli.config_home.path())
        .output()
        .expect("Failed to run rag-acceptance");

    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_cli_missing_admin_key() {
    let cli = CliEnv::new();

    let output = cli.run(&["run", "--base-url", "http://127.0.0.1:9"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No admin key"), "stderr: {stderr}");
}

#[test]
fn test_cli_custom_scenario_file() {
    let service = MockService::start(&[]);
    let cli = CliEnv::new();

    let scenario_path: PathBuf = cli.config_home.path().join("chemistry.yaml");
    std::fs::write(
        &scenario_path,
        r#"
name: chemistry
notebook: chem-101
documents:
  - "Water molecules contain hydrogen and oxygen atoms."
question: "Which atoms make up water molecules?"
expect_contains: [hydrogen, oxygen]
"#,
    )
    .unwrap();

    let output = cli.run(&[
        "run",
        "--base-url",
        &service.base_url,
        "--admin-key",
        "admin",
        "--scenario",
        scenario_path.to_str().unwrap(),
        "--json",
    ]);

    assert_eq!(output.status.code(), Some(0), "stdout: {}", String::from_utf8_lossy(&output.stdout));
    assert_eq!(stdout_json(&output)["name"], "chemistry");
}

#[test]
fn test_cli_provision_many_distinct() {
    let service = MockService::start(&[]);
    let cli = CliEnv::new();

    let output = cli.run(&[
        "provision",
        "--base-url",
        &service.base_url,
        "--admin-key",
        "admin",
        "--count",
        "3",
        "--json",
    ]);

    assert_eq!(output.status.code(), Some(0));
    let credentials = stdout_json(&output);
    let credentials = credentials.as_array().unwrap();
    assert_eq!(credentials.len(), 3);

    let mut ids: Vec<&str> = credentials
        .iter()
        .map(|c| c["user_id"].as_str().unwrap())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 3);
}

#[test]
fn test_cli_provision_detects_reused_tenant() {
    let service = MockService::start(&["--reuse-keys"]);
    let cli = CliEnv::new();

    let output = cli.run(&[
        "provision",
        "--base-url",
        &service.base_url,
        "--admin-key",
        "admin",
        "-n",
        "2",
    ]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("share user_id"));
}

#[test]
fn test_cli_status_reports_bedrock() {
    let service = MockService::start(&["--bedrock-disabled"]);
    let cli = CliEnv::new();

    let output = cli.run(&["status", "--base-url", &service.base_url, "--json"]);

    assert_eq!(output.status.code(), Some(0));
    let status = stdout_json(&output);
    assert_eq!(status["healthy"], true);
    assert_eq!(status["bedrock"]["use_bedrock"], false);
}

#[test]
fn test_cli_status_unreachable_service() {
    let cli = CliEnv::new();

    // Port 9 (discard) is closed on test machines
    let output = cli.run(&["status", "--base-url", "http://127.0.0.1:9", "--json"]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout_json(&output)["healthy"], false);
}
