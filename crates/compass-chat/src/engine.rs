//! Conversation engine: owns the message log and drives the response phase.
//!
//! A submission appends the user message, enters `Responding`, and schedules
//! a continuation on the Tokio runtime. After the configured "thinking" delay
//! the continuation resolves the answer (matched workflow or fallback),
//! appends exactly one assistant message, returns to `Idle` and recomputes
//! suggestions. Every state change is published as a [`ConversationSnapshot`]
//! on a watch channel.
//!
//! Only one response may be in flight per conversation. Pending responses
//! can be cancelled, and `reset` cancels whatever is pending; a continuation
//! that lost its generation appends nothing.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

use compass_core::config::ChatConfig;

use crate::catalog::WorkflowCatalog;
use crate::error::ChatError;
use crate::fallback::FallbackGenerator;
use crate::matcher::WorkflowMatcher;
use crate::state::{PhaseMachine, ResponsePhase};
use crate::suggestions::SuggestionEngine;
use crate::types::{ChatMessage, ConversationSnapshot};

// =============================================================================
// ConversationEngine
// =============================================================================

/// Single-conversation chat engine.
///
/// Cheap to clone; clones share the same conversation.
#[derive(Clone)]
pub struct ConversationEngine {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ConversationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("ConversationEngine")
            .field("messages", &snapshot.messages.len())
            .field("phase", &snapshot.phase)
            .field("response_delay", &self.shared.response_delay)
            .finish()
    }
}

struct Shared {
    matcher: WorkflowMatcher,
    fallback: FallbackGenerator,
    suggestions: SuggestionEngine,
    response_delay: Duration,
    state: Mutex<ConversationState>,
    updates: watch::Sender<ConversationSnapshot>,
}

struct ConversationState {
    /// Rebuilt on append; published snapshots share it.
    messages: Arc<[ChatMessage]>,
    phase: PhaseMachine,
    suggested_questions: Vec<String>,
    /// Bumped on every submission, cancellation and reset.
    generation: u64,
    next_seq: u64,
    in_flight: Option<AbortHandle>,
}

impl ConversationState {
    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn append(&mut self, message: ChatMessage) {
        let mut log = Vec::with_capacity(self.messages.len() + 1);
        log.extend_from_slice(&self.messages);
        log.push(message);
        self.messages = log.into();
    }

    fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            messages: Arc::clone(&self.messages),
            phase: self.phase.current(),
            suggested_questions: self.suggested_questions.clone(),
        }
    }
}

impl ConversationEngine {
    /// Create an engine using the delay from `config`.
    pub fn new(catalog: Arc<WorkflowCatalog>, config: &ChatConfig) -> Self {
        Self::with_delay(catalog, Duration::from_millis(config.response_delay_ms))
    }

    /// Create an engine with an explicit "thinking" delay.
    pub fn with_delay(catalog: Arc<WorkflowCatalog>, response_delay: Duration) -> Self {
        let suggestions = SuggestionEngine::new(Arc::clone(&catalog));
        let state = ConversationState {
            messages: Arc::from(Vec::new()),
            phase: PhaseMachine::new(),
            suggested_questions: suggestions.starters(),
            generation: 0,
            next_seq: 0,
            in_flight: None,
        };
        let (updates, _) = watch::channel(state.snapshot());

        Self {
            shared: Arc::new(Shared {
                matcher: WorkflowMatcher::new(catalog),
                fallback: FallbackGenerator::new(),
                suggestions,
                response_delay,
                state: Mutex::new(state),
                updates,
            }),
        }
    }

    /// Submit user text.
    ///
    /// Blank text is ignored and yields `Ok(None)`. While a response is in
    /// flight the submission is rejected with [`ChatError::ResponseInFlight`]
    /// and nothing changes. Otherwise the trimmed text is appended and the
    /// response is scheduled; the returned handle can await or cancel it.
    /// Dropping the handle does not cancel the response.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, text: &str) -> Result<Option<PendingResponse>, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring blank submission");
            return Ok(None);
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ChatError::Runtime(e.to_string()))?;

        let mut state = self.shared.lock()?;
        if state.phase.current() == ResponsePhase::Responding {
            debug!("Rejecting submission while a response is in flight");
            return Err(ChatError::ResponseInFlight);
        }

        state.phase.transition(ResponsePhase::Responding)?;
        let seq = state.next_seq();
        state.append(ChatMessage::user(seq, text));
        state.generation += 1;
        let generation = state.generation;

        let shared = Arc::clone(&self.shared);
        let query = text.to_string();
        let handle = runtime.spawn(async move { shared.respond(generation, query).await });
        state.in_flight = Some(handle.abort_handle());
        self.shared.publish(&state);
        drop(state);

        info!(seq, generation, "Submission accepted");

        Ok(Some(PendingResponse {
            handle,
            generation,
            shared: Arc::clone(&self.shared),
        }))
    }

    /// Submit and wait for the response.
    ///
    /// Returns `Ok(None)` for blank text or when the response was cancelled
    /// (for example by a concurrent [`reset`](Self::reset)).
    pub async fn ask(&self, text: &str) -> Result<Option<ChatMessage>, ChatError> {
        match self.submit(text)? {
            Some(pending) => Ok(pending.wait().await),
            None => Ok(None),
        }
    }

    /// Clear the log, cancel any pending response and restore the starter
    /// suggestions. Idempotent.
    pub fn reset(&self) {
        let mut state = self.shared.lock_or_recover();
        if let Some(task) = state.in_flight.take() {
            warn!("Reset cancelled an in-flight response");
            task.abort();
        }
        state.generation += 1;
        state.messages = Arc::from(Vec::new());
        state.phase.reset();
        state.suggested_questions = self.shared.suggestions.starters();
        self.shared.publish(&state);
        info!("Conversation reset");
    }

    /// Current state of the conversation.
    pub fn snapshot(&self) -> ConversationSnapshot {
        self.shared.updates.borrow().clone()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.shared.updates.borrow().messages.to_vec()
    }

    pub fn is_responding(&self) -> bool {
        self.shared.updates.borrow().is_responding()
    }

    pub fn suggested_questions(&self) -> Vec<String> {
        self.shared.updates.borrow().suggested_questions.clone()
    }

    /// Receive a snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.shared.updates.subscribe()
    }

    pub fn catalog(&self) -> &Arc<WorkflowCatalog> {
        self.shared.matcher.catalog()
    }

    pub fn response_delay(&self) -> Duration {
        self.shared.response_delay
    }
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, ConversationState>, ChatError> {
        self.state.lock().map_err(|_| ChatError::StatePoisoned)
    }

    /// Reset must always succeed, so it takes the state even if poisoned.
    fn lock_or_recover(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            error!("Conversation state lock poisoned; recovering");
            poisoned.into_inner()
        })
    }

    fn publish(&self, state: &ConversationState) {
        self.updates.send_replace(state.snapshot());
    }

    /// Delayed continuation of a submission.
    async fn respond(self: Arc<Self>, generation: u64, query: String) -> Option<ChatMessage> {
        tokio::time::sleep(self.response_delay).await;

        let mut state = match self.lock() {
            Ok(state) => state,
            Err(e) => {
                error!(error = %e, "Dropping response");
                return None;
            }
        };
        if state.generation != generation || state.phase.current() != ResponsePhase::Responding {
            debug!(generation, "Discarding stale response");
            return None;
        }

        let seq = state.next_seq();
        let message = match self.matcher.find(&query) {
            Some(workflow) => match workflow.primary_response() {
                Some(response) => {
                    info!(workflow = %workflow.id, seq, "Using workflow response");
                    ChatMessage::from_workflow(seq, workflow, response)
                }
                None => self.fallback_message(seq, &query),
            },
            None => self.fallback_message(seq, &query),
        };

        state.append(message.clone());
        if let Err(e) = state.phase.transition(ResponsePhase::Idle) {
            error!(error = %e, "Unexpected phase after response");
            state.phase.reset();
        }
        state.in_flight = None;
        state.suggested_questions = self.suggestions.suggest(&state.messages);
        self.publish(&state);

        Some(message)
    }

    fn fallback_message(&self, seq: u64, query: &str) -> ChatMessage {
        let topic = self.fallback.classify(query);
        info!(topic = topic.as_str(), seq, "Using fallback response");
        ChatMessage::assistant(seq, self.fallback.generate(query))
    }

    /// Cancel the response of `generation` if it is still pending.
    fn cancel(&self, generation: u64) -> bool {
        let mut state = self.lock_or_recover();
        if state.generation != generation || state.phase.current() != ResponsePhase::Responding {
            return false;
        }
        if let Some(task) = state.in_flight.take() {
            task.abort();
        }
        state.generation += 1;
        state.phase.reset();
        state.suggested_questions = self.suggestions.suggest(&state.messages);
        self.publish(&state);
        warn!(generation, "Pending response cancelled");
        true
    }
}

// =============================================================================
// PendingResponse
// =============================================================================

/// Handle to a scheduled response.
#[derive(Debug)]
pub struct PendingResponse {
    handle: JoinHandle<Option<ChatMessage>>,
    generation: u64,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("response_delay", &self.response_delay)
            .finish_non_exhaustive()
    }
}

impl PendingResponse {
    /// Wait for the assistant message. `None` if the response was cancelled.
    pub async fn wait(self) -> Option<ChatMessage> {
        match self.handle.await {
            Ok(message) => message,
            Err(e) if e.is_cancelled() => None,
            Err(e) => {
                error!(error = %e, "Response task failed");
                None
            }
        }
    }

    /// Cancel the response. Returns `false` if it already completed or was
    /// superseded by a reset.
    pub fn cancel(&self) -> bool {
        self.shared.cancel(self.generation)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageRole;

    const KPI_QUESTION: &str = "How do we define measurable KPIs for our designs that meaningfully address the intersection of our business goals and user needs?";

    fn engine() -> ConversationEngine {
        ConversationEngine::with_delay(WorkflowCatalog::builtin(), Duration::ZERO)
    }

    // ---- Construction ----

    #[test]
    fn test_new_engine_is_idle_with_starters() {
        let e = engine();
        assert!(e.messages().is_empty());
        assert!(!e.is_responding());
        assert_eq!(
            e.suggested_questions(),
            WorkflowCatalog::builtin().starter_questions()
        );
    }

    #[test]
    fn test_new_uses_config_delay() {
        let config = ChatConfig {
            response_delay_ms: 250,
            ..ChatConfig::default()
        };
        let e = ConversationEngine::new(WorkflowCatalog::builtin(), &config);
        assert_eq!(e.response_delay(), Duration::from_millis(250));
    }

    // ---- Blank submissions ----

    #[tokio::test]
    async fn test_blank_submissions_are_noops() {
        let e = engine();
        assert!(e.submit("").unwrap().is_none());
        assert!(e.submit("   ").unwrap().is_none());
        assert!(e.submit("\n\t").unwrap().is_none());
        assert!(e.messages().is_empty());
        assert!(!e.is_responding());
    }

    #[test]
    fn test_blank_submission_outside_runtime_is_still_noop() {
        let e = engine();
        assert!(e.submit("  ").unwrap().is_none());
    }

    #[test]
    fn test_submit_outside_runtime_errors() {
        let e = engine();
        assert!(matches!(e.submit("hello"), Err(ChatError::Runtime(_))));
        assert!(e.messages().is_empty());
    }

    // ---- Workflow responses ----

    #[tokio::test]
    async fn test_submit_enters_responding_then_appends_workflow_answer() {
        let e = engine();
        let pending = e.submit(KPI_QUESTION).unwrap().unwrap();

        let snap = e.snapshot();
        assert_eq!(snap.messages.len(), 1);
        assert_eq!(snap.messages[0].role, MessageRole::User);
        assert_eq!(snap.messages[0].content, KPI_QUESTION);
        assert!(snap.is_responding());

        let reply = pending.wait().await.unwrap();
        let catalog = WorkflowCatalog::builtin();
        let kpi = catalog.get("kpiDefinition").unwrap();
        assert_eq!(reply.role, MessageRole::Assistant);
        assert_eq!(reply.content, kpi.responses[0].content);
        assert_eq!(reply.source_workflow.as_deref(), Some("kpiDefinition"));
        assert_eq!(reply.source_response.as_deref(), Some("kpi-response-1"));

        let snap = e.snapshot();
        assert_eq!(snap.messages.len(), 2);
        assert_eq!(snap.messages[1], reply);
        assert!(!snap.is_responding());
        assert_eq!(snap.suggested_questions, kpi.follow_up_questions);
    }

    #[tokio::test]
    async fn test_user_text_is_trimmed() {
        let e = engine();
        e.ask("  balance short-term and long-term  ").await.unwrap();
        assert_eq!(e.messages()[0].content, "balance short-term and long-term");
    }

    // ---- Fallback responses ----

    #[tokio::test]
    async fn test_unmatched_question_gets_generic_fallback() {
        let e = engine();
        let reply = e.ask("what is the weather today").await.unwrap().unwrap();
        assert_eq!(reply.content, FallbackGenerator::new().generate(""));
        assert!(reply.source_workflow.is_none());
        assert_eq!(
            e.suggested_questions(),
            WorkflowCatalog::builtin().generic_follow_ups()
        );
    }

    #[tokio::test]
    async fn test_research_question_gets_research_template() {
        let e = engine();
        let reply = e.ask("Which user research should we run?").await.unwrap().unwrap();
        assert!(reply.content.starts_with("# Research Methods for Healthcare UX"));
    }

    // ---- Single flight ----

    #[tokio::test]
    async fn test_second_submit_while_responding_is_rejected() {
        let e = engine();
        let pending = e.submit("first question").unwrap().unwrap();
        let err = e.submit("second question").unwrap_err();
        assert!(matches!(err, ChatError::ResponseInFlight));
        assert_eq!(e.messages().len(), 1);

        pending.wait().await;
        assert_eq!(e.messages().len(), 2);
        assert!(e.submit("second question").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_exactly_one_response_per_submission() {
        let e = engine();
        for i in 0..5 {
            e.ask(&format!("question {}", i)).await.unwrap();
        }
        let msgs = e.messages();
        assert_eq!(msgs.len(), 10);
        for (i, m) in msgs.iter().enumerate() {
            let expected = if i % 2 == 0 {
                MessageRole::User
            } else {
                MessageRole::Assistant
            };
            assert_eq!(m.role, expected);
        }
    }

    #[tokio::test]
    async fn test_dropped_handle_still_completes() {
        let e = engine();
        let mut rx = e.subscribe();
        drop(e.submit("anything").unwrap());
        rx.wait_for(|s| !s.is_responding()).await.unwrap();
        assert_eq!(e.messages().len(), 2);
    }

    // ---- Delay ----

    #[tokio::test(start_paused = true)]
    async fn test_response_waits_for_delay() {
        let e = ConversationEngine::with_delay(
            WorkflowCatalog::builtin(),
            Duration::from_millis(1500),
        );
        let pending = e.submit(KPI_QUESTION).unwrap().unwrap();

        tokio::time::advance(Duration::from_millis(1499)).await;
        tokio::task::yield_now().await;
        assert!(e.is_responding());
        assert!(!pending.is_finished());
        assert_eq!(e.messages().len(), 1);

        let reply = pending.wait().await;
        assert!(reply.is_some());
        assert!(!e.is_responding());
    }

    // ---- Cancellation ----

    #[tokio::test(start_paused = true)]
    async fn test_cancel_appends_nothing_and_returns_to_idle() {
        let e = ConversationEngine::with_delay(WorkflowCatalog::builtin(), Duration::from_secs(5));
        let pending = e.submit(KPI_QUESTION).unwrap().unwrap();
        assert!(pending.cancel());
        assert!(!pending.cancel());

        assert!(pending.wait().await.is_none());
        assert_eq!(e.messages().len(), 1);
        assert!(!e.is_responding());
        assert_eq!(
            e.suggested_questions(),
            WorkflowCatalog::builtin().generic_follow_ups()
        );

        // Accepts new submissions afterwards.
        assert!(e.submit("next").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cancel_after_completion_is_false() {
        let e = engine();
        let pending = e.submit("hello").unwrap().unwrap();
        let mut rx = e.subscribe();
        rx.wait_for(|s| !s.is_responding()).await.unwrap();
        assert!(!pending.cancel());
        assert_eq!(e.messages().len(), 2);
    }

    // ---- Reset ----

    #[tokio::test]
    async fn test_reset_clears_log_and_restores_starters() {
        let e = engine();
        e.ask(KPI_QUESTION).await.unwrap();
        assert_eq!(e.messages().len(), 2);

        e.reset();
        let snap = e.snapshot();
        assert!(snap.messages.is_empty());
        assert!(!snap.is_responding());
        assert_eq!(
            snap.suggested_questions,
            WorkflowCatalog::builtin().starter_questions()
        );
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let e = engine();
        e.ask("hello").await.unwrap();
        e.reset();
        let once = e.snapshot();
        e.reset();
        let twice = e.snapshot();
        assert_eq!(once, twice);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_cancels_in_flight_response() {
        let e = ConversationEngine::with_delay(WorkflowCatalog::builtin(), Duration::from_secs(2));
        let pending = e.submit(KPI_QUESTION).unwrap().unwrap();
        e.reset();

        assert!(pending.wait().await.is_none());
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(e.messages().is_empty());
        assert!(!e.is_responding());
    }

    // ---- Ids and observation ----

    #[tokio::test]
    async fn test_seq_strictly_increasing_across_reset() {
        let e = engine();
        e.ask("one").await.unwrap();
        let before = e.messages().last().unwrap().seq;
        e.reset();
        e.ask("two").await.unwrap();
        let after = e.messages();
        assert!(after[0].seq > before);
        assert!(after[1].seq > after[0].seq);
        assert_ne!(after[0].id, after[1].id);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let e = engine();
        let mut rx = e.subscribe();
        assert!(!rx.has_changed().unwrap());

        let pending = e.submit("hello").unwrap().unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_responding());

        pending.wait().await;
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.messages.len(), 2);
        assert!(!snap.is_responding());
    }

    #[tokio::test]
    async fn test_snapshots_share_the_log() {
        let e = engine();
        e.ask("hello").await.unwrap();
        let first = e.snapshot();
        let second = e.snapshot();
        assert!(Arc::ptr_eq(&first.messages, &second.messages));

        e.ask("again").await.unwrap();
        let third = e.snapshot();
        assert!(!Arc::ptr_eq(&first.messages, &third.messages));
        assert_eq!(first.messages.len(), 2);
        assert_eq!(third.messages.len(), 4);
        assert_eq!(third.messages[..2], first.messages[..]);
    }

    #[tokio::test]
    async fn test_clones_share_conversation() {
        let e = engine();
        let other = e.clone();
        e.ask("hello").await.unwrap();
        assert_eq!(other.messages().len(), 2);
    }

    #[test]
    fn test_debug_output() {
        let dbg = format!("{:?}", engine());
        assert!(dbg.contains("ConversationEngine"));
        assert!(dbg.contains("Idle"));
    }
}
