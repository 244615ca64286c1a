//! Follow-up question suggestions.
//!
//! Recomputed after every exchange from the conversation log. Assistant
//! messages carry the id of the workflow that produced them, so the lookup
//! never compares message text.

use std::sync::Arc;

use crate::catalog::WorkflowCatalog;
use crate::types::ChatMessage;

/// Computes suggested next questions from the conversation log.
#[derive(Debug, Clone)]
pub struct SuggestionEngine {
    catalog: Arc<WorkflowCatalog>,
}

impl SuggestionEngine {
    pub fn new(catalog: Arc<WorkflowCatalog>) -> Self {
        Self { catalog }
    }

    /// Suggestions for an empty conversation.
    pub fn starters(&self) -> Vec<String> {
        self.catalog.starter_questions().to_vec()
    }

    /// Suggestions for the given log.
    ///
    /// - empty log: starter questions
    /// - last assistant message came from a known workflow: its follow-ups
    /// - otherwise: the generic follow-ups
    pub fn suggest(&self, messages: &[ChatMessage]) -> Vec<String> {
        if messages.is_empty() {
            return self.starters();
        }

        messages
            .iter()
            .rev()
            .find(|m| m.is_assistant())
            .and_then(|m| m.source_workflow.as_deref())
            .and_then(|id| self.catalog.get(id))
            .map(|w| w.follow_up_questions.clone())
            .unwrap_or_else(|| self.catalog.generic_follow_ups().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SuggestionEngine {
        SuggestionEngine::new(WorkflowCatalog::builtin())
    }

    fn workflow_reply(seq: u64, id: &str) -> ChatMessage {
        let catalog = WorkflowCatalog::builtin();
        let wf = catalog.get(id).unwrap();
        ChatMessage::from_workflow(seq, wf, &wf.responses[0])
    }

    #[test]
    fn test_empty_log_gets_starters() {
        let e = engine();
        let s = e.suggest(&[]);
        assert_eq!(s.len(), 4);
        assert_eq!(s, WorkflowCatalog::builtin().starter_questions());
    }

    #[test]
    fn test_workflow_reply_gets_its_follow_ups() {
        let e = engine();
        let log = vec![ChatMessage::user(1, "kpi?"), workflow_reply(2, "designImpact")];
        let s = e.suggest(&log);
        assert_eq!(
            s,
            WorkflowCatalog::builtin()
                .get("designImpact")
                .unwrap()
                .follow_up_questions
        );
    }

    #[test]
    fn test_fallback_reply_gets_generic() {
        let e = engine();
        let log = vec![
            ChatMessage::user(1, "weather?"),
            ChatMessage::assistant(2, "Could you share more?"),
        ];
        assert_eq!(e.suggest(&log), WorkflowCatalog::builtin().generic_follow_ups());
    }

    #[test]
    fn test_only_most_recent_assistant_counts() {
        let e = engine();
        let log = vec![
            ChatMessage::user(1, "a"),
            workflow_reply(2, "kpiDefinition"),
            ChatMessage::user(3, "b"),
            ChatMessage::assistant(4, "generic"),
        ];
        assert_eq!(e.suggest(&log), WorkflowCatalog::builtin().generic_follow_ups());
    }

    #[test]
    fn test_trailing_user_message_looks_back_to_assistant() {
        let e = engine();
        let log = vec![
            ChatMessage::user(1, "a"),
            workflow_reply(2, "balancingNeeds"),
            ChatMessage::user(3, "follow-up pending"),
        ];
        assert_eq!(
            e.suggest(&log),
            WorkflowCatalog::builtin()
                .get("balancingNeeds")
                .unwrap()
                .follow_up_questions
        );
    }

    #[test]
    fn test_user_only_log_gets_generic() {
        let e = engine();
        let log = vec![ChatMessage::user(1, "hello")];
        assert_eq!(e.suggest(&log), WorkflowCatalog::builtin().generic_follow_ups());
    }

    #[test]
    fn test_text_equal_to_workflow_response_without_tag_is_generic() {
        let e = engine();
        let catalog = WorkflowCatalog::builtin();
        let content = catalog.get("kpiDefinition").unwrap().responses[0].content.clone();
        let log = vec![ChatMessage::user(1, "x"), ChatMessage::assistant(2, content)];
        assert_eq!(e.suggest(&log), catalog.generic_follow_ups());
    }

    #[test]
    fn test_unknown_workflow_tag_gets_generic() {
        let e = engine();
        let mut reply = ChatMessage::assistant(2, "x");
        reply.source_workflow = Some("retired".to_string());
        assert_eq!(
            e.suggest(&[ChatMessage::user(1, "x"), reply]),
            WorkflowCatalog::builtin().generic_follow_ups()
        );
    }
}
