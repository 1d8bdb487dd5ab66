//! The chain orchestration engine.
//!
//! [`ChainEngine`] composes the dependency classifier, the parallel and
//! sequential executors and the aggregator step into the run/resume protocol
//! exposed to the caller: one [`handle_turn`](ChainEngine::handle_turn) per
//! inbound chat turn, which either drives the session's chain to its final
//! answer or suspends with the next clarifying question.
//!
//! The state machine per session is
//! `Idle -> RunningChain -> {RunningChain <-> WaitingForUserAnswer}* ->
//! Completed -> Idle`; everything needed to cross a suspension, including a
//! process restart, lives in the persisted [`ExecutionState`].

pub mod classifier;
pub mod parallel;
pub mod sequential;

pub use parallel::ParallelExecutor;
pub use sequential::{SequentialExecutor, SequentialOutcome};

use crate::chain::Chain;
use crate::completion::CompletionService;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::prompts;
use crate::request::{TurnRequest, TurnResponse};
use crate::session::{SessionLocks, SessionStore};
use crate::state::{ExecutionState, RunStatus};
use std::sync::Arc;
use tracing::{debug, info, warn};

enum ChainOutcome {
    Suspended,
    Completed(String),
}

/// Orchestrates agent chains for many concurrent sessions.
///
/// # Example
///
/// ```ignore
/// let engine = ChainEngine::new(completion_client, Arc::new(JsonFileStore::new("sessions")));
/// let response = engine
///     .handle_turn(TurnRequest::new("session-1", "user-1", history))
///     .await?;
/// println!("{}", response.assistant);
/// ```
pub struct ChainEngine {
    completion: Arc<dyn CompletionService>,
    store: Arc<dyn SessionStore>,
    config: EngineConfig,
    locks: SessionLocks,
    parallel: ParallelExecutor,
    sequential: SequentialExecutor,
}

impl ChainEngine {
    pub fn new(completion: Arc<dyn CompletionService>, store: Arc<dyn SessionStore>) -> Self {
        Self::with_config(completion, store, EngineConfig::default())
    }

    pub fn with_config(
        completion: Arc<dyn CompletionService>,
        store: Arc<dyn SessionStore>,
        config: EngineConfig,
    ) -> Self {
        let parallel = ParallelExecutor::new(Arc::clone(&completion), config.max_parallel_workers);
        let sequential = SequentialExecutor::new(Arc::clone(&completion), config.interactive);
        Self {
            completion,
            store,
            config,
            locks: SessionLocks::new(),
            parallel,
            sequential,
        }
    }

    /// Processes one chat turn for a session and returns either the next
    /// clarifying question or the final synthesized answer.
    ///
    /// The whole load-mutate-save cycle runs under the session's own lock;
    /// turns for unrelated sessions proceed concurrently. After a node
    /// failure mid-chain the progress made so far is persisted, so retrying
    /// the same turn resumes at the cursor instead of re-running completed
    /// nodes. A failed planning call persists nothing.
    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnResponse, EngineError> {
        let history = request.validate()?;
        let session_key = format!("chain-{}", request.session_id);

        let lock = self.locks.acquire(&session_key);
        let _guard = lock.lock().await;

        let mut state = self
            .store
            .load(&session_key)
            .await?
            .unwrap_or_else(|| ExecutionState::new(&request.session_id, &request.user_id));
        if state.user_id.is_empty() {
            state.user_id = request.user_id.clone();
        }
        state.sync_history(history);

        match self.drive(&mut state).await {
            Ok(()) => {
                self.store.save(&session_key, &state).await?;
                Ok(TurnResponse {
                    assistant: state.final_answer.clone().unwrap_or_default(),
                })
            }
            Err(error) => {
                if matches!(
                    error,
                    EngineError::NodeExecution { .. } | EngineError::MissingDependency { .. }
                ) {
                    if let Err(save_error) = self.store.save(&session_key, &state).await {
                        warn!(session = %session_key, error = %save_error, "failed to persist state after node failure");
                    }
                }
                Err(error)
            }
        }
    }

    async fn drive(&self, state: &mut ExecutionState) -> Result<(), EngineError> {
        if state.chain.is_none() {
            self.plan(state).await?;
        } else {
            info!(session = %state.session_id, status = ?state.status, "resuming existing chain");
        }
        self.run_chain(state).await
    }

    /// Builds a fresh chain from the planning call. Only entered when the
    /// session has no chain; a persisted in-flight run is never replanned.
    async fn plan(&self, state: &mut ExecutionState) -> Result<(), EngineError> {
        info!(session = %state.session_id, "planning a new chain");
        state.status = RunStatus::RunningChain;

        let prompt =
            prompts::planner_prompt(self.config.planner_template.as_deref(), &state.initial_message)?;
        let raw = self
            .completion
            .complete(&prompt)
            .await
            .map_err(|e| EngineError::Planning(format!("planning call failed: {e}")))?;

        let mut chain = Chain::from_plan(&raw)?;
        if !self.config.interactive {
            chain.clear_questions();
        }
        debug!(agents = chain.agents.len(), "chain built");

        state.chain = Some(chain);
        state.current_node_index = 0;
        state.sequential_cursor = 0;
        state.sequential_order = None;
        Ok(())
    }

    async fn run_chain(&self, state: &mut ExecutionState) -> Result<(), EngineError> {
        let Some(mut chain) = state.chain.take() else {
            return Err(EngineError::Planning(
                "no chain available for this session".into(),
            ));
        };

        let result = self.execute_groups(state, &mut chain).await;
        state.chain = Some(chain);

        match result? {
            ChainOutcome::Suspended => Ok(()),
            ChainOutcome::Completed(answer) => {
                info!(session = %state.session_id, "chain completed");
                state.final_answer = Some(answer);
                state.status = RunStatus::Completed;
                state.reset_transient();
                Ok(())
            }
        }
    }

    async fn execute_groups(
        &self,
        state: &mut ExecutionState,
        chain: &mut Chain,
    ) -> Result<ChainOutcome, EngineError> {
        // Classification and the parallel groups run once per chain run.
        // Resumptions and retries replay the frozen sequential order, so a
        // node that completed earlier cannot shift groups and desynchronize
        // the cursor.
        if state.sequential_order.is_none() && state.status != RunStatus::WaitingForUserAnswer {
            let group_a = classifier::independent(chain);
            debug!(agents = group_a.len(), "running independent group");
            self.parallel
                .run_group(chain, &group_a, &state.initial_message)
                .await;

            let group_b = classifier::ready_dependents(chain, &group_a);
            debug!(agents = group_b.len(), "running ready dependents group");
            self.parallel
                .run_group(chain, &group_b, &state.initial_message)
                .await;

            let taken: Vec<usize> = group_a.iter().chain(group_b.iter()).copied().collect();
            let group_c = classifier::sequential_rest(chain, &taken);
            state.sequential_order = Some(
                group_c
                    .iter()
                    .filter_map(|&index| chain.agents.get(index).map(|node| node.nickname.clone()))
                    .collect(),
            );
            state.sequential_cursor = 0;
        }

        let order_names = state.sequential_order.clone().unwrap_or_default();
        let mut order = Vec::with_capacity(order_names.len());
        for nickname in &order_names {
            let Some(index) = chain.position(nickname) else {
                return Err(EngineError::Planning(format!(
                    "persisted sequential order references unknown agent '{nickname}'"
                )));
            };
            order.push(index);
        }

        match self.sequential.run(state, chain, &order).await? {
            SequentialOutcome::Suspended { question } => {
                debug!(session = %state.session_id, question = %question, "run suspended");
                Ok(ChainOutcome::Suspended)
            }
            SequentialOutcome::Finished => {
                let answer = self.aggregate(chain, &state.initial_message).await?;
                Ok(ChainOutcome::Completed(answer))
            }
        }
    }

    /// The final single call that synthesizes all prior observations. Runs
    /// exactly once, after the sequential group has fully drained.
    async fn aggregate(&self, chain: &Chain, initial_message: &str) -> Result<String, EngineError> {
        let Some(node) = chain.agents.last().filter(|node| node.is_aggregator()) else {
            return Err(EngineError::Planning("chain has no aggregator node".into()));
        };

        info!(node = %node.nickname, "running aggregator");
        let view = chain.render_view(&node.nickname);
        let prompt = prompts::aggregator_prompt(node, &view, initial_message)?;
        self.completion
            .complete(&prompt)
            .await
            .map_err(|source| EngineError::NodeExecution {
                node: node.nickname.clone(),
                source,
            })
    }
}
