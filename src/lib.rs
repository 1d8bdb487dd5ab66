//! `chainweave` - a resumable chain orchestration engine for multi-agent LLM
//! workflows.
//!
//! A user request is decomposed (by one external planning call) into a chain
//! of agents: sub-tasks with prompt templates, dependencies on each other's
//! outputs, and optionally questions for the end user. This crate executes
//! such chains:
//!
//! - **Classification**: subtask nodes are partitioned into an independent
//!   group, a ready-dependents group (both run concurrently under a bounded
//!   worker pool) and a strictly sequential remainder.
//! - **Checkpoints**: a sequential node with an unanswered user question
//!   suspends the whole run and returns the question to the caller; the next
//!   chat turn resumes exactly where the run left off.
//! - **Persistence**: the complete execution state round-trips through a
//!   pluggable session store, so suspended runs survive process restarts.
//! - **Aggregation**: a distinguished terminal agent synthesizes every
//!   observation into the final answer.
//!
//! # Example
//!
//! ```ignore
//! use chainweave::{ChainEngine, ChatTurn, MemoryStore, TurnRequest};
//! use std::sync::Arc;
//!
//! let engine = ChainEngine::new(my_completion_client, Arc::new(MemoryStore::new()));
//!
//! let response = engine
//!     .handle_turn(TurnRequest::new(
//!         "session-1",
//!         "user-1",
//!         vec![ChatTurn::user("Help me launch an online store")],
//!     ))
//!     .await?;
//!
//! // Either the final answer or the chain's next question for the user.
//! println!("{}", response.assistant);
//! ```

pub mod chain;
pub mod completion;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod prompts;
pub mod request;
pub mod session;
pub mod state;

pub use chain::{AGGREGATOR_NICKNAME, AgentNode, Chain};
pub use completion::{CompletionError, CompletionService, ScriptedCompletion};
pub use config::EngineConfig;
pub use engine::{ChainEngine, SequentialOutcome};
pub use error::EngineError;
pub use request::{TurnRequest, TurnResponse};
pub use session::{JsonFileStore, MemoryStore, SessionStore, StoreError};
pub use state::{ChatTurn, ExecutionState, RunStatus};
