//! Strictly ordered execution with the interactive checkpoint protocol.

use crate::chain::Chain;
use crate::completion::CompletionService;
use crate::error::EngineError;
use crate::prompts;
use crate::state::{ExecutionState, RunStatus};
use std::sync::Arc;
use tracing::{debug, info};

/// How a sequential pass ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SequentialOutcome {
    /// Every node of the sequential group has executed; the aggregator may
    /// run.
    Finished,
    /// The run suspended to ask the user a question. The cursor was not
    /// advanced, so the next call revisits the same node.
    Suspended { question: String },
}

/// Executes the sequential group one node at a time, in order, starting at
/// the persisted cursor.
pub struct SequentialExecutor {
    service: Arc<dyn CompletionService>,
    interactive: bool,
}

impl SequentialExecutor {
    pub fn new(service: Arc<dyn CompletionService>, interactive: bool) -> Self {
        Self { service, interactive }
    }

    /// Walks `order` (indices into the chain) from `state.sequential_cursor`.
    ///
    /// When entered while `WaitingForUserAnswer`, the latest chat message is
    /// recorded as the answer to the question the current node asked last
    /// time, before anything else happens. In interactive mode each node may
    /// then suspend the whole run on its next unanswered question.
    ///
    /// A completion failure aborts the pass immediately; state up to the
    /// last completed node stays intact so a retry resumes at the cursor. A
    /// dependency without an observation is reported as
    /// [`EngineError::MissingDependency`] rather than executed with missing
    /// input.
    pub async fn run(
        &self,
        state: &mut ExecutionState,
        chain: &mut Chain,
        order: &[usize],
    ) -> Result<SequentialOutcome, EngineError> {
        for &index in order.iter().skip(state.sequential_cursor) {
            state.current_node_index = index;

            if state.status == RunStatus::WaitingForUserAnswer {
                if let Some(answer) = state.latest_message().map(str::to_string) {
                    if let Some(node) = chain.agents.get_mut(index) {
                        debug!(node = %node.nickname, "recording user answer");
                        node.answers.push(answer);
                    }
                }
            }

            let Some(node) = chain.agents.get(index) else {
                return Err(EngineError::Planning(format!(
                    "sequential order references missing node index {index}"
                )));
            };
            let nickname = node.nickname.clone();

            if self.interactive {
                if let Some(question) = node.next_question() {
                    info!(node = %nickname, "suspending for user answer");
                    state.final_answer = Some(question.to_string());
                    state.status = RunStatus::WaitingForUserAnswer;
                    return Ok(SequentialOutcome::Suspended {
                        question: question.to_string(),
                    });
                }
            }
            state.status = RunStatus::RunningChain;

            for dep in &node.depends_on {
                if !chain.node(dep).is_some_and(|d| d.has_observation()) {
                    return Err(EngineError::MissingDependency {
                        node: nickname,
                        dependency: dep.clone(),
                    });
                }
            }

            let prompt =
                prompts::subtask_prompt(node, &chain.render_view(&nickname), &state.initial_message)?;
            let output = self.service.complete(&prompt).await.map_err(|source| {
                EngineError::NodeExecution {
                    node: nickname.clone(),
                    source,
                }
            })?;

            info!(node = %nickname, "sequential agent produced observation");
            if let Some(node) = chain.agents.get_mut(index) {
                node.observation = Some(output);
            }
            state.sequential_cursor += 1;
        }

        Ok(SequentialOutcome::Finished)
    }
}
