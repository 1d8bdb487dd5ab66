//! Partitioning of the subtask nodes into execution groups.
//!
//! Classification is a pure function of current node state, which is why
//! [`ready_dependents`] must be evaluated only after the independent group
//! has finished executing: its members qualify precisely because their
//! dependencies' observations exist at that moment.
//!
//! The three groups are disjoint and, concatenated in declared order, cover
//! every subtask node exactly once.

use crate::chain::Chain;

/// Nodes with no user questions and no dependencies. They can run
/// immediately and concurrently.
pub fn independent(chain: &Chain) -> Vec<usize> {
    chain
        .subtasks()
        .iter()
        .enumerate()
        .filter(|(_, node)| node.pending_questions.is_empty() && node.depends_on.is_empty())
        .map(|(index, _)| index)
        .collect()
}

/// Nodes outside `exclude` with no user questions whose every dependency
/// already has a non-empty observation. Evaluated against current state, so
/// call this only after the independent group has completed.
pub fn ready_dependents(chain: &Chain, exclude: &[usize]) -> Vec<usize> {
    chain
        .subtasks()
        .iter()
        .enumerate()
        .filter(|(index, node)| {
            !exclude.contains(index)
                && node.pending_questions.is_empty()
                && node
                    .depends_on
                    .iter()
                    .all(|dep| chain.node(dep).is_some_and(|d| d.has_observation()))
        })
        .map(|(index, _)| index)
        .collect()
}

/// Every subtask node not in `taken`, in declared order. These run strictly
/// one at a time with the checkpoint protocol.
pub fn sequential_rest(chain: &Chain, taken: &[usize]) -> Vec<usize> {
    (0..chain.subtasks().len())
        .filter(|index| !taken.contains(index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{AGGREGATOR_NICKNAME, AgentNode};

    fn node(nickname: &str, deps: &[&str], questions: &[&str]) -> AgentNode {
        AgentNode {
            nickname: nickname.to_string(),
            prompt: String::new(),
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
            pending_questions: questions.iter().map(|q| q.to_string()).collect(),
            answers: Vec::new(),
            observation: None,
        }
    }

    fn chain(agents: Vec<AgentNode>) -> Chain {
        let mut agents = agents;
        agents.push(node(AGGREGATOR_NICKNAME, &[], &[]));
        Chain { agents }
    }

    #[test]
    fn test_independent_excludes_questions_and_dependencies() {
        let chain = chain(vec![
            node("alpha", &[], &[]),
            node("asker", &[], &["q?"]),
            node("dependent", &["alpha"], &[]),
        ]);

        assert_eq!(independent(&chain), vec![0]);
    }

    #[test]
    fn test_ready_dependents_requires_observations() {
        let mut chain = chain(vec![node("alpha", &[], &[]), node("beta", &["alpha"], &[])]);
        let group_a = independent(&chain);

        // before alpha produced anything, beta is not ready
        assert!(ready_dependents(&chain, &group_a).is_empty());

        chain.agents[0].observation = Some("alpha-out".into());
        assert_eq!(ready_dependents(&chain, &group_a), vec![1]);
    }

    #[test]
    fn test_empty_observation_does_not_satisfy_dependency() {
        let mut chain = chain(vec![node("alpha", &[], &[]), node("beta", &["alpha"], &[])]);
        chain.agents[0].observation = Some(String::new());

        assert!(ready_dependents(&chain, &independent(&chain)).is_empty());
    }

    #[test]
    fn test_questions_force_sequential_even_when_ready() {
        let mut chain = chain(vec![node("alpha", &[], &[]), node("beta", &["alpha"], &["q?"])]);
        chain.agents[0].observation = Some("alpha-out".into());

        let group_a = independent(&chain);
        assert!(ready_dependents(&chain, &group_a).is_empty());
        assert_eq!(sequential_rest(&chain, &group_a), vec![1]);
    }

    #[test]
    fn test_groups_are_disjoint_and_cover_all_subtasks() {
        let mut chain = chain(vec![
            node("alpha", &[], &[]),
            node("asker", &[], &["q?"]),
            node("beta", &["alpha"], &[]),
            node("gamma", &["asker"], &[]),
        ]);
        chain.agents[0].observation = Some("alpha-out".into());

        let group_a = independent(&chain);
        let group_b = ready_dependents(&chain, &group_a);
        let taken: Vec<usize> = group_a.iter().chain(group_b.iter()).copied().collect();
        let group_c = sequential_rest(&chain, &taken);

        let mut all: Vec<usize> = taken.iter().chain(group_c.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3]);

        for index in &group_a {
            assert!(!group_b.contains(index));
            assert!(!group_c.contains(index));
        }
        for index in &group_b {
            assert!(!group_c.contains(index));
        }
    }

    #[test]
    fn test_sequential_rest_preserves_declared_order() {
        let chain = chain(vec![
            node("first", &[], &["q?"]),
            node("second", &[], &["q?"]),
            node("third", &[], &["q?"]),
        ]);

        assert_eq!(sequential_rest(&chain, &[]), vec![0, 1, 2]);
    }
}
