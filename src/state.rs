//! Per-session execution state.
//!
//! One [`ExecutionState`] record exists per conversation. It is loaded,
//! mutated through a single chain run, and saved back on every call, so the
//! whole struct must serialize with full fidelity: a suspended run restored
//! from the store has to land back on the exact node that asked the last
//! question.

use crate::chain::Chain;
use serde::{Deserialize, Serialize};

/// One chat message as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Lifecycle of a chain run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// No chain; the next call plans one.
    #[default]
    Idle,
    /// A chain is being driven to completion.
    RunningChain,
    /// Suspended at a checkpoint, waiting for the user's answer.
    WaitingForUserAnswer,
    /// The aggregator has produced the final answer.
    Completed,
}

/// The mutable record describing one in-flight chain run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    pub session_id: String,
    pub user_id: String,

    /// Replaced wholesale with the caller-supplied history on every call.
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,

    /// The first user-authored message of the conversation; captured once
    /// and reused as planning context for the whole run.
    #[serde(default)]
    pub initial_message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<Chain>,

    #[serde(default)]
    pub status: RunStatus,

    /// Index of the node last touched, for diagnostics.
    #[serde(default)]
    pub current_node_index: usize,

    /// How many sequential-group nodes have fully completed; resumption
    /// skips this many.
    #[serde(default)]
    pub sequential_cursor: usize,

    /// Nicknames of the sequential group in execution order, frozen once the
    /// parallel groups have run. Resumptions and retries replay this list
    /// instead of reclassifying, so a node that completed before a
    /// suspension cannot shift groups and desynchronize the cursor.
    /// `None` until the run first reaches the sequential phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequential_order: Option<Vec<String>>,

    /// While suspended: the question to relay to the user. Once completed:
    /// the synthesized final answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_answer: Option<String>,
}

impl ExecutionState {
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// Replaces the chat history with the caller's copy and captures
    /// `initial_message` from the first user turn, once.
    pub fn sync_history(&mut self, turns: Vec<ChatTurn>) {
        if self.initial_message.is_empty() {
            if let Some(first_user) = turns.iter().find(|turn| turn.role == "user") {
                self.initial_message = first_user.content.clone();
            }
        }
        self.chat_history = turns;
    }

    /// The most recent chat message, treated as the candidate answer when
    /// resuming a suspended run.
    pub fn latest_message(&self) -> Option<&str> {
        self.chat_history.last().map(|turn| turn.content.as_str())
    }

    /// Returns the record to its idle shape after a completed run. Identity
    /// fields, the chat history and `final_answer` survive; everything tied
    /// to the finished chain is dropped, so the next call starts fresh.
    pub fn reset_transient(&mut self) {
        self.initial_message.clear();
        self.chain = None;
        self.status = RunStatus::Idle;
        self.current_node_index = 0;
        self.sequential_cursor = 0;
        self.sequential_order = None;
    }
}
