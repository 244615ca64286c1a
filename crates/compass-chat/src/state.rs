//! Response phase state machine.
//!
//! A conversation alternates between two phases:
//! - Idle -> Responding (user message accepted, response pending)
//! - Responding -> Idle (response appended, or the pending response cancelled)
//!
//! `reset` is allowed from either phase and always lands in Idle.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Whether a response is currently in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponsePhase {
    /// No response in flight. Submissions are accepted.
    #[default]
    Idle,
    /// Between an accepted submission and its single response append.
    Responding,
}

impl fmt::Display for ResponsePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponsePhase::Idle => write!(f, "Idle"),
            ResponsePhase::Responding => write!(f, "Responding"),
        }
    }
}

impl ResponsePhase {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &ResponsePhase) -> bool {
        matches!(
            (self, target),
            (ResponsePhase::Idle, ResponsePhase::Responding)
                | (ResponsePhase::Responding, ResponsePhase::Idle)
        )
    }
}

/// Validated holder for the current phase.
///
/// Lives inside the engine's conversation state, which is already behind a
/// mutex, so it carries no locking of its own.
#[derive(Debug, Clone, Default)]
pub struct PhaseMachine {
    phase: ResponsePhase,
}

impl PhaseMachine {
    /// Create a machine in `Idle`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> ResponsePhase {
        self.phase
    }

    /// Attempt to transition to the target phase.
    pub fn transition(&mut self, target: ResponsePhase) -> Result<(), ChatError> {
        if self.phase.can_transition_to(&target) {
            tracing::debug!("Response phase: {} -> {}", self.phase, target);
            self.phase = target;
            Ok(())
        } else {
            Err(ChatError::InvalidTransition {
                from: self.phase,
                to: target,
            })
        }
    }

    /// Force the machine back to Idle.
    pub fn reset(&mut self) {
        if self.phase != ResponsePhase::Idle {
            tracing::debug!("Response phase reset to Idle from {}", self.phase);
        }
        self.phase = ResponsePhase::Idle;
    }
}
