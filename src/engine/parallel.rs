//! Concurrent execution of one group of independent agents.

use crate::chain::Chain;
use crate::completion::{CompletionError, CompletionService};
use crate::prompts;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Fan-out/fan-in executor for the parallel groups.
///
/// Prompts are rendered up front from each node's reduced view, then the
/// completion calls run concurrently under a bounded worker pool. The call
/// returns only when every worker has finished or failed. A failing worker
/// is logged and leaves its node's observation unset; siblings are never
/// affected, and the failure resurfaces downstream as a missing dependency
/// on whichever node needed the observation.
pub struct ParallelExecutor {
    service: Arc<dyn CompletionService>,
    max_workers: usize,
}

impl ParallelExecutor {
    pub fn new(service: Arc<dyn CompletionService>, max_workers: usize) -> Self {
        Self {
            service,
            max_workers: max_workers.max(1),
        }
    }

    /// Executes every node of `group` and writes the returned texts back as
    /// observations.
    pub async fn run_group(&self, chain: &mut Chain, group: &[usize], initial_message: &str) {
        if group.is_empty() {
            return;
        }

        let mut jobs = Vec::with_capacity(group.len());
        for &index in group {
            let Some(node) = chain.agents.get(index) else {
                continue;
            };
            let view = chain.render_view(&node.nickname);
            match prompts::subtask_prompt(node, &view, initial_message) {
                Ok(prompt) => jobs.push((index, node.nickname.clone(), prompt)),
                Err(error) => {
                    warn!(node = %node.nickname, error = %error, "prompt rendering failed, observation left unset");
                }
            }
        }

        debug!(workers = self.max_workers, agents = jobs.len(), "running parallel group");

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut tasks = Vec::with_capacity(jobs.len());
        for (index, nickname, prompt) in jobs {
            let service = Arc::clone(&self.service);
            let semaphore = Arc::clone(&semaphore);
            tasks.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            index,
                            nickname,
                            Err(CompletionError::Service("worker pool closed".into())),
                        );
                    }
                };
                let result = service.complete(&prompt).await;
                (index, nickname, result)
            }));
        }

        for task in tasks {
            match task.await {
                Ok((index, nickname, Ok(output))) => {
                    debug!(node = %nickname, "parallel agent produced observation");
                    if let Some(node) = chain.agents.get_mut(index) {
                        node.observation = Some(output);
                    }
                }
                Ok((_, nickname, Err(error))) => {
                    warn!(node = %nickname, error = %error, "parallel agent failed, observation left unset");
                }
                Err(join_error) => {
                    warn!(error = %join_error, "parallel agent task aborted");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{AGGREGATOR_NICKNAME, AgentNode};
    use crate::completion::ScriptedCompletion;

    fn node(nickname: &str, deps: &[&str]) -> AgentNode {
        AgentNode {
            nickname: nickname.to_string(),
            prompt: format!("task for {nickname}"),
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
            pending_questions: Vec::new(),
            answers: Vec::new(),
            observation: None,
        }
    }

    fn sample_chain() -> Chain {
        Chain {
            agents: vec![
                node("alpha", &[]),
                node("beta", &[]),
                node("gamma", &[]),
                node(AGGREGATOR_NICKNAME, &["alpha", "beta", "gamma"]),
            ],
        }
    }

    #[tokio::test]
    async fn test_group_members_all_execute() {
        let service = Arc::new(
            ScriptedCompletion::new()
                .respond_when("the agent \"alpha\"", "alpha-out")
                .respond_when("the agent \"beta\"", "beta-out")
                .respond_when("the agent \"gamma\"", "gamma-out"),
        );
        let executor = ParallelExecutor::new(service.clone(), 5);
        let mut chain = sample_chain();

        executor.run_group(&mut chain, &[0, 1, 2], "start").await;

        assert_eq!(chain.agents[0].observation.as_deref(), Some("alpha-out"));
        assert_eq!(chain.agents[1].observation.as_deref(), Some("beta-out"));
        assert_eq!(chain.agents[2].observation.as_deref(), Some("gamma-out"));
        assert_eq!(service.call_count(), 3);
    }

    #[tokio::test]
    async fn test_failure_is_isolated_to_one_worker() {
        let service = Arc::new(
            ScriptedCompletion::new()
                .fail_when("the agent \"beta\"", "boom")
                .with_fallback("ok"),
        );
        let executor = ParallelExecutor::new(service, 5);
        let mut chain = sample_chain();

        executor.run_group(&mut chain, &[0, 1, 2], "start").await;

        assert!(chain.agents[0].has_observation());
        assert!(chain.agents[1].observation.is_none());
        assert!(chain.agents[2].has_observation());
    }

    #[tokio::test]
    async fn test_group_completes_with_single_worker() {
        let service = Arc::new(ScriptedCompletion::new().with_fallback("ok"));
        let executor = ParallelExecutor::new(service.clone(), 1);
        let mut chain = sample_chain();

        executor.run_group(&mut chain, &[0, 1, 2], "start").await;

        assert!(chain.agents[..3].iter().all(|n| n.has_observation()));
        assert_eq!(service.call_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_group_is_a_no_op() {
        let service = Arc::new(ScriptedCompletion::new());
        let executor = ParallelExecutor::new(service.clone(), 5);
        let mut chain = sample_chain();

        executor.run_group(&mut chain, &[], "start").await;

        assert_eq!(service.call_count(), 0);
    }
}
