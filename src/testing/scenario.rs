//! Suite fixture content
//!
//! The built-in scenario carries the history corpus and the private-secret
//! probe. A YAML file can replace any part of it for deployments whose
//! retrieval behaves differently.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::common::{Error, Result};

/// Fixture content for one acceptance run
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct Scenario {
    /// Name shown in the report header
    pub name: String,
    /// Optional description of what the run verifies
    pub description: Option<String>,
    /// Notebook the corpus is ingested into
    pub notebook: String,
    /// Documents ingested under credential A, one request each
    pub documents: Vec<String>,
    /// Question asked against the corpus
    pub question: String,
    /// Literals the answer must contain
    pub expect_contains: Vec<String>,
    /// Cross-tenant leak probe
    pub isolation: IsolationProbe,
}

/// Content for the tenant isolation step
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct IsolationProbe {
    /// Notebook name shared by both tenants; defaults to the corpus notebook
    pub notebook: Option<String>,
    /// Prefix of the generated secret
    pub secret_prefix: String,
    /// Text ingested under credential B; `{secret}` is replaced
    pub template: String,
    /// Question asked under credential A
    pub question: String,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "RAG study assistant acceptance".to_string(),
            description: Some(
                "Provisioning, identity binding, retrieval correctness and tenant isolation"
                    .to_string(),
            ),
            notebook: "history".to_string(),
            documents: vec![
                "The Treaty of Versailles ended World War I in 1919. It was signed in the Hall of \
                 Mirrors at the Palace of Versailles on 28 June 1919."
                    .to_string(),
                "The League of Nations was formed after WWI to settle disputes between countries \
                 before they led to another war."
                    .to_string(),
            ],
            question: "What ended World War I and when?".to_string(),
            expect_contains: vec!["Versailles".to_string(), "1919".to_string()],
            isolation: IsolationProbe::default(),
        }
    }
}

impl Default for IsolationProbe {
    fn default() -> Self {
        Self {
            notebook: None,
            secret_prefix: "B-ONLY-SECRET-".to_string(),
            template: "This is private to user B: {secret}".to_string(),
            question: "What is the private secret for user B?".to_string(),
        }
    }
}

impl IsolationProbe {
    /// Render the private text for a secret
    pub fn render(&self, secret: &str) -> String {
        self.template.replace("{secret}", secret)
    }
}

impl Scenario {
    /// Load a scenario from a YAML file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse a scenario from YAML text and validate it
    pub fn parse(content: &str) -> Result<Self> {
        let scenario: Scenario = serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse scenario: {}", e)))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Notebook used by the isolation step
    pub fn isolation_notebook(&self) -> &str {
        self.isolation.notebook.as_deref().unwrap_or(&self.notebook)
    }

    /// Reject scenarios that cannot produce a meaningful run
    pub fn validate(&self) -> Result<()> {
        if self.notebook.trim().is_empty() {
            return Err(Error::Config("Scenario notebook must not be empty".to_string()));
        }
        if self.documents.is_empty() || self.documents.iter().any(|d| d.trim().is_empty()) {
            return Err(Error::Config(
                "Scenario needs at least one non-empty document".to_string(),
            ));
        }
        if self.question.trim().is_empty() || self.isolation.question.trim().is_empty() {
            return Err(Error::Config("Scenario questions must not be empty".to_string()));
        }
        if self.expect_contains.iter().any(|s| s.is_empty()) {
            return Err(Error::Config(
                "Expected answer literals must not be empty".to_string(),
            ));
        }
        if !self.isolation.template.contains("{secret}") {
            return Err(Error::Config(
                "Isolation template must contain the {secret} placeholder".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scenario_is_valid() {
        let scenario = Scenario::default();
        scenario.validate().unwrap();
        assert_eq!(scenario.documents.len(), 2);
        assert_ne!(scenario.documents[0], scenario.documents[1]);
        assert!(scenario.documents[0].contains("Versailles"));
        assert!(scenario.documents[0].contains("1919"));
        assert_eq!(scenario.isolation_notebook(), "history");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let scenario = Scenario::parse(
            r#"
name: chemistry
notebook: chem-101
documents:
  - "Water is made of hydrogen and oxygen."
question: "What is water made of?"
expect_contains: [hydrogen, oxygen]
"#,
        )
        .unwrap();

        assert_eq!(scenario.notebook, "chem-101");
        assert_eq!(scenario.expect_contains, vec!["hydrogen", "oxygen"]);
        assert_eq!(scenario.isolation.secret_prefix, "B-ONLY-SECRET-");
        assert_eq!(scenario.isolation_notebook(), "chem-101");
    }

    #[test]
    fn test_isolation_template_rendering() {
        let probe = IsolationProbe::default();
        assert_eq!(
            probe.render("B-ONLY-SECRET-0badc0de"),
            "This is private to user B: B-ONLY-SECRET-0badc0de"
        );
    }

    #[test]
    fn test_rejects_template_without_placeholder() {
        let err = Scenario::parse("isolation:\n  template: \"nothing here\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_empty_documents() {
        assert!(Scenario::parse("documents: []\n").is_err());
        assert!(Scenario::parse("documents: [\"  \"]\n").is_err());
    }
}
