//! Acceptance suite
//!
//! Runs the provisioning, identity, retrieval and isolation checks against a
//! live deployment, asserting on decoded JSON rather than raw response text
//! wherever the contract names a field.

mod answer;
mod runner;
mod scenario;

pub use answer::{extract_answer, ANSWER_FIELDS};
pub use runner::{
    check_answer_contains, check_ingest_ack, provision, provision_many, run_suite, secret_token,
    Step, SuiteReport, TestContext,
};
pub use scenario::{IsolationProbe, Scenario};
