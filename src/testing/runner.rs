//! Acceptance suite runner
//!
//! Drives the fixed step chain against one deployment and stops at the first
//! unmet expectation. Later steps reuse credentials minted by earlier ones,
//! so there is nothing meaningful to continue with after a failure.

use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

use crate::api::types::non_empty_str;
use crate::api::{BedrockStatus, Credential, StudyApi};
use crate::common::config::RunConfig;
use crate::common::{Error, Result};

use super::answer::extract_answer;
use super::scenario::Scenario;

/// Mutable state of one run
///
/// Created from the startup parameters; only ever grows by appending
/// credentials.
#[derive(Debug)]
pub struct TestContext {
    pub base_url: String,
    pub admin_key: String,
    pub credentials: Vec<Credential>,
}

impl TestContext {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            admin_key: config.admin_key.clone(),
            credentials: Vec::new(),
        }
    }

    /// Credential used for every corpus operation
    fn tenant_a(&self) -> Result<&Credential> {
        self.credentials
            .first()
            .ok_or_else(|| Error::Provisioning("credential A was never provisioned".to_string()))
    }

    /// Credential that owns the isolation secret
    fn tenant_b(&self) -> Result<&Credential> {
        self.credentials
            .get(1)
            .ok_or_else(|| Error::Provisioning("credential B was never provisioned".to_string()))
    }
}

/// One link of the step chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Preflight,
    ProvisionA,
    ProvisionB,
    Identity,
    Ingest,
    Retrieval,
    Isolation,
}

impl Step {
    /// Steps in execution order for a config
    pub fn plan(config: &RunConfig) -> Vec<Step> {
        let mut steps = Vec::with_capacity(7);
        if config.preflight {
            steps.push(Step::Preflight);
        }
        steps.extend([
            Step::ProvisionA,
            Step::ProvisionB,
            Step::Identity,
            Step::Ingest,
            Step::Retrieval,
            Step::Isolation,
        ]);
        steps
    }

    pub fn label(self) -> &'static str {
        match self {
            Step::Preflight => "preflight",
            Step::ProvisionA => "provision credential A",
            Step::ProvisionB => "provision credential B",
            Step::Identity => "identity check",
            Step::Ingest => "ingest corpus",
            Step::Retrieval => "retrieval query",
            Step::Isolation => "tenant isolation",
        }
    }
}

/// Result of a suite run
#[derive(Debug, Serialize)]
pub struct SuiteReport {
    pub name: String,
    pub base_url: String,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<Step>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    /// Whether the failure was a broken contract rather than a transport
    /// or configuration problem
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Tenants minted during the run
    pub user_ids: Vec<String>,
}

/// Run the acceptance suite
///
/// Assertion failures are reported in the returned [`SuiteReport`], never as
/// `Err`; callers decide the exit status from `passed`.
pub async fn run_suite<A>(api: &A, config: RunConfig, scenario: &Scenario) -> SuiteReport
where
    A: StudyApi + ?Sized,
{
    let steps = Step::plan(&config);
    let steps_total = steps.len();
    let mut ctx = TestContext::new(&config);
    let quiet = config.quiet;

    if !quiet {
        println!(
            "\n{} {}",
            "Running Suite:".blue().bold(),
            scenario.name.white().bold()
        );
        if let Some(desc) = &scenario.description {
            println!("  {}", desc.dimmed());
        }
        println!("  Target: {}", ctx.base_url.dimmed());
        println!("\n{}", "Steps:".cyan());
    }

    for (i, step) in steps.iter().copied().enumerate() {
        let step_num = i + 1;
        tracing::info!(step = step.label(), step_num, "running step");

        match execute_step(api, &mut ctx, &config, scenario, step).await {
            Ok(detail) => {
                if !quiet {
                    println!(
                        "  {} Step {}: {} {}",
                        "✓".green(),
                        step_num,
                        step.label(),
                        format!("({})", detail).dimmed()
                    );
                }
            }
            Err(e) => {
                tracing::error!(step = step.label(), error = %e, "step failed");
                if !quiet {
                    println!("  {} Step {}: {}: {}", "✗".red(), step_num, step.label(), e);
                    println!("\n{} {}\n", "✗".red().bold(), "Suite Failed".red().bold());
                }

                return SuiteReport {
                    name: scenario.name.clone(),
                    base_url: ctx.base_url.clone(),
                    passed: false,
                    steps_run: step_num,
                    steps_total,
                    failed_step: Some(step),
                    error_kind: Some(e.kind()),
                    assertion: Some(e.is_assertion()),
                    error: Some(e.to_string()),
                    user_ids: user_ids(&ctx),
                };
            }
        }
    }

    if !quiet {
        println!(
            "\n{} {}\n",
            "✓".green().bold(),
            "Suite Passed".green().bold()
        );
    }

    SuiteReport {
        name: scenario.name.clone(),
        base_url: ctx.base_url.clone(),
        passed: true,
        steps_run: steps_total,
        steps_total,
        failed_step: None,
        error_kind: None,
        assertion: None,
        error: None,
        user_ids: user_ids(&ctx),
    }
}

fn user_ids(ctx: &TestContext) -> Vec<String> {
    ctx.credentials.iter().map(|c| c.user_id.clone()).collect()
}

/// Execute a single step, returning a short detail line for the console
async fn execute_step<A>(
    api: &A,
    ctx: &mut TestContext,
    config: &RunConfig,
    scenario: &Scenario,
    step: Step,
) -> Result<String>
where
    A: StudyApi + ?Sized,
{
    match step {
        Step::Preflight => execute_preflight_step(api).await,
        Step::ProvisionA | Step::ProvisionB => execute_provision_step(api, ctx).await,
        Step::Identity => execute_identity_step(api, ctx).await,
        Step::Ingest => execute_ingest_step(api, ctx, config, scenario).await,
        Step::Retrieval => execute_retrieval_step(api, ctx, scenario).await,
        Step::Isolation => execute_isolation_step(api, ctx, config, scenario).await,
    }
}

/// Check liveness and report model availability
async fn execute_preflight_step<A>(api: &A) -> Result<String>
where
    A: StudyApi + ?Sized,
{
    let health = api
        .health()
        .await
        .map_err(|e| Error::HealthCheck(e.to_string()))?;
    let status = health.get("status").and_then(Value::as_str);
    if status != Some("ok") {
        return Err(Error::HealthCheck(format!(
            "expected {{\"status\": \"ok\"}}, got {}",
            health
        )));
    }

    let bedrock = match api.bedrock_status().await {
        Ok(value) => match serde_json::from_value::<BedrockStatus>(value) {
            Ok(report) => {
                if !report.use_bedrock {
                    tracing::warn!(
                        "service reports use_bedrock=false; generated answers are canned and the retrieval step is likely to fail"
                    );
                }
                for error in &report.errors {
                    tracing::warn!(error = %error, "bedrock status error");
                }
                format!("bedrock enabled: {}", report.use_bedrock)
            }
            Err(e) => {
                tracing::warn!(error = %e, "unrecognized bedrock status report");
                "bedrock status unrecognized".to_string()
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "bedrock status unavailable");
            "bedrock status unavailable".to_string()
        }
    };

    Ok(format!("health ok, {}", bedrock))
}

/// Mint one credential and append it to the context
///
/// The second credential must belong to a different tenant than every
/// credential minted before it.
async fn execute_provision_step<A>(api: &A, ctx: &mut TestContext) -> Result<String>
where
    A: StudyApi + ?Sized,
{
    let credential = provision(api, &ctx.admin_key).await?;
    ensure_fresh(&ctx.credentials, &credential)?;

    let detail = format!("user_id {}", credential.user_id);
    ctx.credentials.push(credential);
    Ok(detail)
}

/// Call the provisioning endpoint and validate the credential it returns
pub async fn provision<A>(api: &A, admin_key: &str) -> Result<Credential>
where
    A: StudyApi + ?Sized,
{
    let response = api.create_user_key(admin_key).await?;
    Credential::from_response(&response)
}

/// Provision `count` credentials, requiring each to be a fresh tenant
pub async fn provision_many<A>(api: &A, admin_key: &str, count: usize) -> Result<Vec<Credential>>
where
    A: StudyApi + ?Sized,
{
    let mut minted = Vec::with_capacity(count);
    for _ in 0..count {
        let credential = provision(api, admin_key).await?;
        ensure_fresh(&minted, &credential)?;
        minted.push(credential);
    }
    Ok(minted)
}

fn ensure_fresh(existing: &[Credential], candidate: &Credential) -> Result<()> {
    for other in existing {
        if other.user_id == candidate.user_id {
            return Err(Error::TenantCollision {
                field: "user_id",
                value: candidate.user_id.clone(),
            });
        }
        if other.api_key == candidate.api_key {
            return Err(Error::TenantCollision {
                field: "api_key",
                value: crate::common::logging::redact(&candidate.api_key),
            });
        }
    }
    Ok(())
}

/// The service must bind credential A's key to credential A's tenant
async fn execute_identity_step<A>(api: &A, ctx: &TestContext) -> Result<String>
where
    A: StudyApi + ?Sized,
{
    let tenant = ctx.tenant_a()?;
    let response = api.me(&tenant.api_key).await?;
    let actual = response
        .get("user_id")
        .and_then(Value::as_str)
        .unwrap_or_default();

    if actual != tenant.user_id {
        return Err(Error::IdentityMismatch {
            expected: tenant.user_id.clone(),
            actual: actual.to_string(),
        });
    }

    Ok(format!("key bound to user_id {}", actual))
}

/// Ingest every scenario document under credential A
async fn execute_ingest_step<A>(
    api: &A,
    ctx: &TestContext,
    config: &RunConfig,
    scenario: &Scenario,
) -> Result<String>
where
    A: StudyApi + ?Sized,
{
    let tenant = ctx.tenant_a()?;
    for document in &scenario.documents {
        let ack = api
            .ingest(&tenant.api_key, &scenario.notebook, document)
            .await?;
        check_ingest_ack(&scenario.notebook, &ack, config.strict_ingest)?;
    }

    Ok(format!(
        "{} documents into '{}'",
        scenario.documents.len(),
        scenario.notebook
    ))
}

/// Judge an ingest acknowledgment
///
/// By default any non-null body counts as accepted. Strict mode also
/// requires a `doc_id` and, when reported, a positive `chunks_added`.
pub fn check_ingest_ack(notebook: &str, ack: &Value, strict: bool) -> Result<()> {
    if ack.is_null() {
        return Err(Error::ingestion(notebook, "service returned an empty response"));
    }
    if !strict {
        return Ok(());
    }

    if non_empty_str(ack, "doc_id").is_none() {
        return Err(Error::ingestion(
            notebook,
            format!("acknowledgment has no doc_id: {}", ack),
        ));
    }
    if let Some(chunks) = ack.get("chunks_added").filter(|v| !v.is_null()) {
        if chunks.as_u64().unwrap_or(0) == 0 {
            return Err(Error::ingestion(
                notebook,
                format!("service stored no chunks: {}", ack),
            ));
        }
    }
    Ok(())
}

/// Ask the scenario question and require every expected literal
async fn execute_retrieval_step<A>(api: &A, ctx: &TestContext, scenario: &Scenario) -> Result<String>
where
    A: StudyApi + ?Sized,
{
    let tenant = ctx.tenant_a()?;
    let response = api
        .chat(&tenant.api_key, &scenario.notebook, &scenario.question)
        .await?;
    let answer = extract_answer(&response);
    tracing::debug!(answer = %answer, "retrieval answer");

    check_answer_contains(&answer, &scenario.expect_contains)?;
    Ok(format!("answer contains {:?}", scenario.expect_contains))
}

/// Require each literal to appear in the answer, naming the first missing one
pub fn check_answer_contains(answer: &str, expected: &[String]) -> Result<()> {
    match expected.iter().find(|literal| !answer.contains(literal.as_str())) {
        Some(missing) => Err(Error::RetrievalAssertion {
            missing: missing.clone(),
            answer: answer.to_string(),
        }),
        None => Ok(()),
    }
}

/// Plant a secret under B and make sure A cannot read it back
///
/// Both tenants use the same notebook name, so passing shows the service
/// scopes notebooks by credential and not by name alone.
async fn execute_isolation_step<A>(
    api: &A,
    ctx: &TestContext,
    config: &RunConfig,
    scenario: &Scenario,
) -> Result<String>
where
    A: StudyApi + ?Sized,
{
    let owner = ctx.tenant_b()?;
    let reader = ctx.tenant_a()?;
    let notebook = scenario.isolation_notebook();

    let token = secret_token();
    let secret = format!("{}{}", scenario.isolation.secret_prefix, token);
    let private_text = scenario.isolation.render(&secret);

    let ack = api.ingest(&owner.api_key, notebook, &private_text).await?;
    check_ingest_ack(notebook, &ack, config.strict_ingest)?;

    let response = api
        .chat(&reader.api_key, notebook, &scenario.isolation.question)
        .await?;
    let answer = extract_answer(&response);
    tracing::debug!(answer = %answer, "isolation answer");

    if answer.contains(&token) {
        return Err(Error::TenantIsolation {
            secret,
            notebook: notebook.to_string(),
        });
    }

    Ok(format!("secret {} stayed with its owner", secret))
}

/// Eight random lowercase hex characters
pub fn secret_token() -> String {
    format!("{:08x}", rand::random::<u32>())
}
