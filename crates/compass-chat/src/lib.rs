//! Strategy chat for Strategic Compass.
//!
//! Matches free-text questions against a catalog of authored workflows,
//! falls back to templated answers, and runs the turn-taking conversation
//! with its simulated "thinking" delay and follow-up suggestions.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod export;
pub mod fallback;
pub mod matcher;
pub mod state;
pub mod suggestions;
pub mod types;

pub use catalog::WorkflowCatalog;
pub use engine::{ConversationEngine, PendingResponse};
pub use error::ChatError;
pub use fallback::{FallbackGenerator, FallbackTopic};
pub use matcher::{MatchKind, WorkflowMatch, WorkflowMatcher, WorkflowScore};
pub use state::ResponsePhase;
pub use suggestions::SuggestionEngine;
pub use types::{CannedResponse, ChatMessage, ConversationSnapshot, MessageRole, Workflow};
