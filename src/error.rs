//! Error types for the chain orchestration engine.

use crate::completion::CompletionError;
use crate::session::StoreError;
use thiserror::Error;

/// Errors surfaced by the engine to its caller.
///
/// Per-node failures inside a parallel group are not represented here: they
/// are logged at the worker boundary and show up later as a
/// [`EngineError::MissingDependency`] on whichever node needed the lost
/// observation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The planning call failed or returned a malformed chain description.
    #[error("planning failed: {0}")]
    Planning(String),

    /// A completion call failed while executing a sequential node or the
    /// aggregator.
    #[error("node '{node}' failed: {source}")]
    NodeExecution {
        node: String,
        #[source]
        source: CompletionError,
    },

    /// A node was about to execute while one of its declared dependencies had
    /// produced no observation.
    #[error("node '{node}' is missing the observation of dependency '{dependency}'")]
    MissingDependency { node: String, dependency: String },

    /// The session store failed to load or save execution state.
    #[error("session store error: {0}")]
    Store(#[from] StoreError),

    /// The request payload was malformed.
    #[error("invalid request: {0}")]
    Validation(String),

    /// A prompt template failed to render.
    #[error("template render error: {0}")]
    Template(String),

    /// JSON serialization failed outside the store boundary.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
