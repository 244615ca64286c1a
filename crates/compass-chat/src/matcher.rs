//! Workflow matcher.
//!
//! Decides, for arbitrary free text, whether an authored workflow applies.
//! Two passes over the catalog:
//!
//! 1. **Exact**: case-insensitive equality with a workflow's canonical question.
//! 2. **Keyword**: for each workflow, count keywords contained (as plain
//!    substrings) in the lower-cased input. A workflow is eligible with at
//!    least [`MIN_KEYWORD_MATCHES`] hits or a hit ratio of at least
//!    [`MIN_KEYWORD_SCORE`]; the eligible workflow with the strictly highest
//!    ratio wins, so ties go to the earliest in declaration order.
//!
//! Substring containment means short keywords also hit inside longer words
//! ("scale" in "upscaled"). That is the observed contract and is kept.

use std::sync::Arc;

use tracing::debug;

use crate::catalog::WorkflowCatalog;
use crate::types::Workflow;

/// Keyword hits that make a workflow eligible regardless of ratio.
pub const MIN_KEYWORD_MATCHES: usize = 2;

/// Hit ratio that makes a workflow eligible regardless of hit count.
pub const MIN_KEYWORD_SCORE: f64 = 0.4;

/// How a workflow was selected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchKind {
    Exact,
    Keyword { matches: usize, score: f64 },
}

/// A selected workflow together with the reason it was selected.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowMatch<'a> {
    pub workflow: &'a Workflow,
    pub kind: MatchKind,
}

/// Keyword-pass diagnostics for one workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowScore {
    pub workflow_id: String,
    pub matches: usize,
    pub total_keywords: usize,
    /// `matches / total_keywords`, or 0 for a workflow without keywords.
    pub score: f64,
    pub eligible: bool,
}

/// Lower-cased copies of a workflow's match inputs.
#[derive(Debug)]
struct NormalizedWorkflow {
    question: String,
    keywords: Vec<String>,
}

/// Pure text-to-workflow matcher over an injected catalog.
#[derive(Debug)]
pub struct WorkflowMatcher {
    catalog: Arc<WorkflowCatalog>,
    normalized: Vec<NormalizedWorkflow>,
}

impl WorkflowMatcher {
    pub fn new(catalog: Arc<WorkflowCatalog>) -> Self {
        let normalized = catalog
            .workflows()
            .iter()
            .map(|w| NormalizedWorkflow {
                question: w.initial_question.to_lowercase(),
                keywords: w.keywords.iter().map(|k| k.to_lowercase()).collect(),
            })
            .collect();

        Self {
            catalog,
            normalized,
        }
    }

    pub fn catalog(&self) -> &Arc<WorkflowCatalog> {
        &self.catalog
    }

    /// Best-matching workflow for `input`, or `None`.
    pub fn find(&self, input: &str) -> Option<&Workflow> {
        self.find_match(input).map(|m| m.workflow)
    }

    /// Like [`find`](Self::find), but also reports how the match was made.
    pub fn find_match(&self, input: &str) -> Option<WorkflowMatch<'_>> {
        let lowered = input.to_lowercase();
        let workflows = self.catalog.workflows();

        if let Some(idx) = self.normalized.iter().position(|n| n.question == lowered) {
            debug!(workflow = %workflows[idx].id, "Exact workflow match");
            return Some(WorkflowMatch {
                workflow: &workflows[idx],
                kind: MatchKind::Exact,
            });
        }

        let mut best: Option<(usize, usize, f64)> = None;
        for (idx, normalized) in self.normalized.iter().enumerate() {
            let (matches, score) = keyword_score(&lowered, &normalized.keywords);
            if !is_eligible(matches, score) {
                continue;
            }
            let replaces = match best {
                Some((_, _, best_score)) => score > best_score,
                None => true,
            };
            if replaces {
                best = Some((idx, matches, score));
            }
        }

        match best {
            Some((idx, matches, score)) => {
                debug!(
                    workflow = %workflows[idx].id,
                    matches,
                    score,
                    "Keyword workflow match"
                );
                Some(WorkflowMatch {
                    workflow: &workflows[idx],
                    kind: MatchKind::Keyword { matches, score },
                })
            }
            None => {
                debug!("No workflow match");
                None
            }
        }
    }

    /// Keyword-pass scores for every workflow, in declaration order.
    pub fn score(&self, input: &str) -> Vec<WorkflowScore> {
        let lowered = input.to_lowercase();
        self.catalog
            .workflows()
            .iter()
            .zip(&self.normalized)
            .map(|(workflow, normalized)| {
                let (matches, score) = keyword_score(&lowered, &normalized.keywords);
                WorkflowScore {
                    workflow_id: workflow.id.clone(),
                    matches,
                    total_keywords: normalized.keywords.len(),
                    score,
                    eligible: is_eligible(matches, score),
                }
            })
            .collect()
    }
}

fn keyword_score(lowered_input: &str, keywords: &[String]) -> (usize, f64) {
    if keywords.is_empty() {
        return (0, 0.0);
    }
    let matches = keywords
        .iter()
        .filter(|k| lowered_input.contains(k.as_str()))
        .count();
    (matches, matches as f64 / keywords.len() as f64)
}

fn is_eligible(matches: usize, score: f64) -> bool {
    matches >= MIN_KEYWORD_MATCHES || score >= MIN_KEYWORD_SCORE
}

// =============================================================================
// Tests
// =============================================================================
