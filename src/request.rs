//! Request and response types at the caller boundary.
//!
//! An HTTP collaborator deserializes the inbound payload into
//! [`TurnRequest`] and serializes [`TurnResponse`] back; the engine itself
//! never touches the transport.

use crate::error::EngineError;
use crate::state::ChatTurn;
use serde::{Deserialize, Serialize};

/// One inbound chat turn for a session. The history is always the full
/// ordered conversation, not a delta.
#[derive(Debug, Clone, Deserialize)]
pub struct TurnRequest {
    #[serde(default)]
    pub session_id: String,

    #[serde(default)]
    pub user_id: String,

    /// Required. Missing (as opposed to empty) history is a client error.
    #[serde(default)]
    pub session_chat_history: Option<Vec<ChatTurn>>,
}

impl TurnRequest {
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        session_chat_history: Vec<ChatTurn>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            session_chat_history: Some(session_chat_history),
        }
    }

    /// Rejects malformed payloads before any chain work begins.
    pub fn validate(&self) -> Result<Vec<ChatTurn>, EngineError> {
        if self.session_id.is_empty() {
            return Err(EngineError::Validation("session_id is required".into()));
        }
        match &self.session_chat_history {
            Some(turns) => Ok(turns.clone()),
            None => Err(EngineError::Validation(
                "missing required field: session_chat_history".into(),
            )),
        }
    }
}

/// The engine's answer for one turn: either the next clarifying question or
/// the final synthesized result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnResponse {
    pub assistant: String,
}
