//! RAG acceptance - black-box contract tests for multi-tenant RAG services
//!
//! This library drives key provisioning, ingestion, retrieval and tenant
//! isolation checks against a study assistant HTTP API.

pub mod api;
pub mod cli;
pub mod commands;
pub mod common;
pub mod testing;

// Re-export commonly used types for tests
pub use api::{ApiClient, Credential, StudyApi};
pub use common::{Error, Result};
