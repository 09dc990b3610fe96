//! HTTP client for the study assistant API

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde_json::Value;

use crate::common::logging::redact;
use crate::common::{Error, Result};

use super::types::{paths, ChatRequest, IngestRequest, ADMIN_KEY_HEADER, API_KEY_HEADER};

/// Operations the acceptance suite needs from the remote service
///
/// Every call returns the decoded response body untouched; judging whether
/// it satisfies the contract is the runner's job.
#[async_trait]
pub trait StudyApi: Send + Sync {
    /// `POST /admin/create_user_key`
    async fn create_user_key(&self, admin_key: &str) -> Result<Value>;

    /// `GET /v1/me`
    async fn me(&self, api_key: &str) -> Result<Value>;

    /// `POST /v1/ingest`
    async fn ingest(&self, api_key: &str, notebook: &str, text: &str) -> Result<Value>;

    /// `POST /v1/chat`
    async fn chat(&self, api_key: &str, notebook: &str, question: &str) -> Result<Value>;

    /// `GET /health`
    async fn health(&self) -> Result<Value>;

    /// `GET /bedrock/status`
    async fn bedrock_status(&self) -> Result<Value>;
}

/// reqwest-backed implementation of [`StudyApi`]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the service rooted at `base_url`
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "Base URL must start with http:// or https://, got '{}'",
                base_url
            )));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("rag-acceptance/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    /// Normalized service root
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    /// Send a request and decode the body
    ///
    /// Non-2xx statuses become [`Error::HttpStatus`]. An empty body decodes
    /// to `null`; a body that is not JSON is kept as a JSON string.
    async fn send(&self, method: Method, path: &str, builder: RequestBuilder) -> Result<Value> {
        tracing::debug!(%method, path, "sending request");

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(%method, path, status = status.as_u16(), body = %body, "received response");

        if !status.is_success() {
            return Err(Error::http_status(
                method.as_str(),
                path,
                status.as_u16(),
                &body,
            ));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}

#[async_trait]
impl StudyApi for ApiClient {
    async fn create_user_key(&self, admin_key: &str) -> Result<Value> {
        tracing::debug!(admin_key = %redact(admin_key), "provisioning user key");
        let builder = self
            .request(Method::POST, paths::CREATE_USER_KEY)
            .header(ADMIN_KEY_HEADER, admin_key);
        self.send(Method::POST, paths::CREATE_USER_KEY, builder).await
    }

    async fn me(&self, api_key: &str) -> Result<Value> {
        tracing::debug!(api_key = %redact(api_key), "looking up identity");
        let builder = self
            .request(Method::GET, paths::ME)
            .header(API_KEY_HEADER, api_key);
        self.send(Method::GET, paths::ME, builder).await
    }

    async fn ingest(&self, api_key: &str, notebook: &str, text: &str) -> Result<Value> {
        tracing::debug!(api_key = %redact(api_key), notebook, bytes = text.len(), "ingesting");
        let builder = self
            .request(Method::POST, paths::INGEST)
            .header(API_KEY_HEADER, api_key)
            .json(&IngestRequest { notebook, text });
        self.send(Method::POST, paths::INGEST, builder).await
    }

    async fn chat(&self, api_key: &str, notebook: &str, question: &str) -> Result<Value> {
        tracing::debug!(api_key = %redact(api_key), notebook, question, "querying");
        let builder = self
            .request(Method::POST, paths::CHAT)
            .header(API_KEY_HEADER, api_key)
            .json(&ChatRequest { notebook, question });
        self.send(Method::POST, paths::CHAT, builder).await
    }

    async fn health(&self) -> Result<Value> {
        let builder = self.request(Method::GET, paths::HEALTH);
        self.send(Method::GET, paths::HEALTH, builder).await
    }

    async fn bedrock_status(&self) -> Result<Value> {
        let builder = self.request(Method::GET, paths::BEDROCK_STATUS);
        self.send(Method::GET, paths::BEDROCK_STATUS, builder).await
    }
}
