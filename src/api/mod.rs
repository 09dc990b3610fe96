//! Client side of the study assistant HTTP/JSON contract
//!
//! Four endpoints make up the contract under test (key provisioning,
//! identity, ingest, chat); `/health` and `/bedrock/status` are probed
//! only by the preflight checks.

pub mod client;
pub mod types;

pub use client::{ApiClient, StudyApi};
pub use types::{BedrockStatus, Credential};
