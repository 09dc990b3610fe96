//! Error types for the acceptance harness
//!
//! Assertion variants name the contract the remote service broke. The
//! remaining variants cover transport and configuration problems that stop
//! a run before it can say anything about the service.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the acceptance harness
#[derive(Error, Debug)]
pub enum Error {
    // === Contract Assertions ===
    #[error("Provisioning failed: {0}")]
    Provisioning(String),

    #[error("Provisioned credentials share {field} '{value}'; each key must map to a fresh tenant")]
    TenantCollision { field: &'static str, value: String },

    #[error("Identity mismatch: expected user_id '{expected}', service returned '{actual}'")]
    IdentityMismatch { expected: String, actual: String },

    #[error("Ingestion into notebook '{notebook}' was not acknowledged: {reason}")]
    Ingestion { notebook: String, reason: String },

    #[error("Retrieval assertion failed: answer does not contain '{missing}'. Answer was: {answer}")]
    RetrievalAssertion { missing: String, answer: String },

    #[error("Tenant isolation violated: secret '{secret}' leaked across credentials in notebook '{notebook}'")]
    TenantIsolation { secret: String, notebook: String },

    #[error("Health check failed: {0}")]
    HealthCheck(String),

    // === HTTP Errors ===
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} {path} returned HTTP {status}: {body}")]
    HttpStatus {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an ingestion error for a notebook
    pub fn ingestion(notebook: &str, reason: impl Into<String>) -> Self {
        Self::Ingestion {
            notebook: notebook.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(method: &str, path: &str, status: u16, body: &str) -> Self {
        Self::HttpStatus {
            method: method.to_string(),
            path: path.to_string(),
            status,
            body: body.to_string(),
        }
    }

    /// Whether this error is a broken service contract rather than a
    /// transport or configuration problem
    pub fn is_assertion(&self) -> bool {
        matches!(
            self,
            Error::Provisioning(_)
                | Error::TenantCollision { .. }
                | Error::IdentityMismatch { .. }
                | Error::Ingestion { .. }
                | Error::RetrievalAssertion { .. }
                | Error::TenantIsolation { .. }
                | Error::HealthCheck(_)
        )
    }

    /// Short stable label, used in JSON reports
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Provisioning(_) => "provisioning",
            Error::TenantCollision { .. } => "tenant_collision",
            Error::IdentityMismatch { .. } => "identity_mismatch",
            Error::Ingestion { .. } => "ingestion",
            Error::RetrievalAssertion { .. } => "retrieval_assertion",
            Error::TenantIsolation { .. } => "tenant_isolation",
            Error::HealthCheck(_) => "health_check",
            Error::Http(_) | Error::HttpStatus { .. } => "http",
            Error::Config(_) | Error::ConfigParse(_) => "config",
            Error::FileRead { .. } => "io",
            Error::Json(_) => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assertion_classification() {
        assert!(Error::Provisioning("no api_key".into()).is_assertion());
        assert!(Error::TenantIsolation {
            secret: "B-ONLY-SECRET-deadbeef".into(),
            notebook: "history".into(),
        }
        .is_assertion());
        assert!(!Error::Config("missing base URL".into()).is_assertion());
        assert!(!Error::http_status("GET", "/v1/me", 401, "Invalid API key").is_assertion());
    }

    #[test]
    fn test_retrieval_message_names_missing_literal() {
        let e = Error::RetrievalAssertion {
            missing: "1919".into(),
            answer: "The Treaty of Versailles".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("'1919'"));
        assert_eq!(e.kind(), "retrieval_assertion");
    }
}
