//! Wire types for the study assistant HTTP API
//!
//! Response bodies stay as `serde_json::Value` at the transport boundary so
//! the runner can assert on shapes the service got wrong; the helpers here
//! turn validated values into typed data.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::{Error, Result};

/// Header carrying the admin key on the provisioning endpoint
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Header carrying a tenant API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// API paths, relative to the service root
pub mod paths {
    pub const CREATE_USER_KEY: &str = "/admin/create_user_key";
    pub const ME: &str = "/v1/me";
    pub const INGEST: &str = "/v1/ingest";
    pub const CHAT: &str = "/v1/chat";
    pub const HEALTH: &str = "/health";
    pub const BEDROCK_STATUS: &str = "/bedrock/status";
}

/// A tenant credential minted by the provisioning endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub user_id: String,
    pub api_key: String,
}

impl Credential {
    /// Validate a provisioning response: both fields must be non-empty strings
    pub fn from_response(value: &Value) -> Result<Self> {
        let api_key = non_empty_str(value, "api_key")
            .ok_or_else(|| Error::Provisioning(format!("response has no api_key: {value}")))?;
        let user_id = non_empty_str(value, "user_id")
            .ok_or_else(|| Error::Provisioning(format!("response has no user_id: {value}")))?;

        Ok(Self {
            user_id: user_id.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

/// Body of `POST /v1/ingest`
#[derive(Debug, Serialize)]
pub struct IngestRequest<'a> {
    pub notebook: &'a str,
    pub text: &'a str,
}

/// Body of `POST /v1/chat`
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub notebook: &'a str,
    pub question: &'a str,
}

/// Report served by `GET /bedrock/status`
///
/// Every field is optional on the wire; deployments without Bedrock
/// return a subset.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BedrockStatus {
    pub use_bedrock: bool,
    pub region: Option<String>,
    pub embedding_model_id: Option<String>,
    pub chat_model_id: Option<String>,
    pub bedrock_control_plane_ok: bool,
    pub bedrock_runtime_ok: bool,
    pub embedding_invoke_ok: bool,
    pub embedding_dim: Option<u64>,
    pub chat_invoke_ok: bool,
    pub errors: Vec<String>,
}

/// Read `field` as a non-empty string
pub fn non_empty_str<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}
