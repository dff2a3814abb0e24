//! Turn record and its state machine.

use std::collections::HashMap;
use std::sync::Arc;

use mcp::ProgressToken;
use parking_lot::{Mutex, RwLock};
use tracing::trace;

use crate::model::Message;

/// Sub-states while a tool call is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolPhase {
    Executing,
    SamplingPending,
    Completed,
}

/// Where a Turn is.
///
/// `Started → ModelPending → (ToolPending → ModelPending)* → Done`, or
/// `Failed` from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Started,
    ModelPending,
    ToolPending(ToolPhase),
    Done,
    Failed,
}

impl TurnState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Ordered record of the states a Turn passed through.
///
/// Shared so the sampling path can mark nested calls on a Turn it does not
/// own.
#[derive(Debug, Clone, Default)]
pub struct StateTrace(Arc<Mutex<Vec<TurnState>>>);

impl StateTrace {
    pub fn record(&self, state: TurnState) {
        self.0.lock().push(state);
    }

    pub fn current(&self) -> Option<TurnState> {
        self.0.lock().last().copied()
    }

    pub fn snapshot(&self) -> Vec<TurnState> {
        self.0.lock().clone()
    }
}

/// One top-level user request and everything it caused.
#[derive(Debug)]
pub struct Turn {
    pub token: ProgressToken,
    pub messages: Vec<Message>,
    trace: StateTrace,
}

impl Turn {
    /// Start a Turn under a fresh token.
    pub fn new(user_text: impl Into<String>) -> Self {
        Self::with_token(ProgressToken::generate(), user_text)
    }

    pub fn with_token(token: ProgressToken, user_text: impl Into<String>) -> Self {
        let trace = StateTrace::default();
        trace.record(TurnState::Started);
        Self {
            token,
            messages: vec![Message::user(user_text)],
            trace,
        }
    }

    pub fn record(&self, state: TurnState) {
        trace!(token = %self.token, ?state, "turn transition");
        self.trace.record(state);
    }

    pub fn state(&self) -> Option<TurnState> {
        self.trace.current()
    }

    pub fn trace(&self) -> &StateTrace {
        &self.trace
    }

    pub fn states(&self) -> Vec<TurnState> {
        self.trace.snapshot()
    }
}

/// Turns currently running, by token.
#[derive(Debug, Clone, Default)]
pub struct ActiveTurns(Arc<RwLock<HashMap<ProgressToken, StateTrace>>>);

impl ActiveTurns {
    pub fn register(&self, turn: &Turn) {
        self.0.write().insert(turn.token.clone(), turn.trace.clone());
    }

    pub fn remove(&self, token: &ProgressToken) {
        self.0.write().remove(token);
    }

    /// Record `state` on the Turn owning `token`. Returns false if no such
    /// Turn is running.
    pub fn mark(&self, token: &ProgressToken, state: TurnState) -> bool {
        match self.0.read().get(token) {
            Some(trace) => {
                trace.record(state);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }
}
