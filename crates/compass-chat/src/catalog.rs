//! Workflow catalog.
//!
//! An immutable, validated table of authored workflows plus the two fixed
//! suggestion lists. The built-in catalog is embedded at compile time;
//! custom catalogs use the same TOML layout.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use serde::Deserialize;
use tracing::info;

use crate::error::ChatError;
use crate::types::Workflow;

/// Number of canonical questions offered on an empty conversation.
pub const STARTER_QUESTION_COUNT: usize = 4;

static BUILTIN_CATALOG_TOML: &str = include_str!("../data/workflows.toml");

static BUILTIN_CATALOG: LazyLock<Arc<WorkflowCatalog>> = LazyLock::new(|| {
    Arc::new(
        WorkflowCatalog::from_toml_str(BUILTIN_CATALOG_TOML)
            .expect("Invalid built-in workflow catalog"),
    )
});

/// On-disk layout of a catalog file.
#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    starter_questions: Vec<String>,
    #[serde(default)]
    generic_follow_ups: Vec<String>,
    #[serde(default)]
    workflows: Vec<Workflow>,
}

/// Validated, immutable workflow table.
#[derive(Debug, Clone)]
pub struct WorkflowCatalog {
    workflows: Vec<Workflow>,
    starter_questions: Vec<String>,
    generic_follow_ups: Vec<String>,
}

impl WorkflowCatalog {
    /// The catalog shipped with the application.
    pub fn builtin() -> Arc<WorkflowCatalog> {
        Arc::clone(&BUILTIN_CATALOG)
    }

    /// Parse and validate a catalog from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ChatError> {
        let doc: CatalogDocument = toml::from_str(content)?;
        Self::from_parts(doc.workflows, doc.starter_questions, doc.generic_follow_ups)
    }

    /// Load a catalog file from disk.
    pub fn load(path: &Path) -> Result<Self, ChatError> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&content)?;
        info!(
            path = %path.display(),
            workflows = catalog.len(),
            "Workflow catalog loaded"
        );
        Ok(catalog)
    }

    /// Build a catalog from already-constructed parts.
    ///
    /// When `starter_questions` is empty, the first
    /// [`STARTER_QUESTION_COUNT`] canonical questions are used. Duplicate
    /// starters are dropped, keeping the first occurrence.
    pub fn from_parts(
        workflows: Vec<Workflow>,
        starter_questions: Vec<String>,
        generic_follow_ups: Vec<String>,
    ) -> Result<Self, ChatError> {
        validate(&workflows)?;

        let starters = if starter_questions.is_empty() {
            workflows
                .iter()
                .take(STARTER_QUESTION_COUNT)
                .map(|w| w.initial_question.clone())
                .collect()
        } else {
            starter_questions
        };

        let mut seen = HashSet::new();
        let starter_questions = starters
            .into_iter()
            .filter(|q| seen.insert(q.clone()))
            .collect();

        Ok(Self {
            workflows,
            starter_questions,
            generic_follow_ups,
        })
    }

    /// Workflows in declaration order.
    pub fn workflows(&self) -> &[Workflow] {
        &self.workflows
    }

    pub fn get(&self, id: &str) -> Option<&Workflow> {
        self.workflows.iter().find(|w| w.id == id)
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }

    /// Suggestions shown when the conversation log is empty.
    pub fn starter_questions(&self) -> &[String] {
        &self.starter_questions
    }

    /// Suggestions shown after a response that did not come from a workflow.
    pub fn generic_follow_ups(&self) -> &[String] {
        &self.generic_follow_ups
    }
}

fn validate(workflows: &[Workflow]) -> Result<(), ChatError> {
    let mut ids = HashSet::new();
    let mut questions = HashSet::new();

    for wf in workflows {
        if wf.id.trim().is_empty() {
            return Err(ChatError::Catalog("workflow id cannot be empty".to_string()));
        }
        if !ids.insert(wf.id.as_str()) {
            return Err(ChatError::Catalog(format!("duplicate workflow id: {}", wf.id)));
        }
        if wf.responses.is_empty() {
            return Err(ChatError::Catalog(format!(
                "workflow {} has no responses",
                wf.id
            )));
        }
        // An empty keyword is a substring of every input.
        if wf.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ChatError::Catalog(format!(
                "workflow {} has a blank keyword",
                wf.id
            )));
        }
        if !questions.insert(wf.initial_question.to_lowercase()) {
            return Err(ChatError::Catalog(format!(
                "workflow {} repeats another workflow's initial question",
                wf.id
            )));
        }
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
