use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::ResponsePhase;

// =============================================================================
// Workflows
// =============================================================================

/// A pre-authored answer body belonging to a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CannedResponse {
    /// Authored identifier, e.g. `kpi-response-1`.
    pub id: String,
    /// Markdown answer text, reused verbatim.
    pub content: String,
}

/// One canned "expert" conversation path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    /// Canonical question that selects this workflow on exact match.
    pub initial_question: String,
    /// Case-insensitive substrings used for fuzzy matching.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Non-empty; the first entry is the one served.
    pub responses: Vec<CannedResponse>,
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
}

impl Workflow {
    /// The response served when this workflow matches.
    pub fn primary_response(&self) -> Option<&CannedResponse> {
        self.responses.first()
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single entry in the conversation log. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    /// Strictly increasing within one engine, across resets.
    pub seq: u64,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Workflow that produced this assistant message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_workflow: Option<String>,
    /// Canned response id that produced this assistant message, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_response: Option<String>,
}

impl ChatMessage {
    pub fn user(seq: u64, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            seq,
            role: MessageRole::User,
            content: content.into(),
            timestamp: Utc::now(),
            source_workflow: None,
            source_response: None,
        }
    }

    /// Assistant message not tied to any workflow.
    pub fn assistant(seq: u64, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            ..Self::user(seq, content)
        }
    }

    /// Assistant message re-stamped from a workflow's canned response.
    pub fn from_workflow(seq: u64, workflow: &Workflow, response: &CannedResponse) -> Self {
        Self {
            source_workflow: Some(workflow.id.clone()),
            source_response: Some(response.id.clone()),
            ..Self::assistant(seq, response.content.clone())
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }
}

// =============================================================================
// Observable state
// =============================================================================

/// Point-in-time view of a conversation, published after every change.
///
/// The log is shared with the engine, so cloning a snapshot never copies
/// messages.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSnapshot {
    pub messages: Arc<[ChatMessage]>,
    pub phase: ResponsePhase,
    pub suggested_questions: Vec<String>,
}

impl ConversationSnapshot {
    pub fn is_responding(&self) -> bool {
        self.phase == ResponsePhase::Responding
    }
}
