//! Dependency graph over agent nicknames.
//!
//! Used during chain validation to reject cyclic plans before any agent
//! executes. Edges point from a node to the nodes it depends on.

use crate::chain::Chain;
use std::collections::{HashMap, HashSet};

/// A directed graph of agent dependencies, keyed by nickname.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: HashMap<String, HashSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph from a chain's declared `input_from_agents` lists.
    ///
    /// References to undeclared nicknames still become nodes here; the chain
    /// validation rejects them separately before consulting the graph.
    pub fn from_chain(chain: &Chain) -> Self {
        let mut graph = Self::new();
        for node in &chain.agents {
            graph.edges.entry(node.nickname.clone()).or_default();
            for dep in &node.depends_on {
                graph.add_dependency(&node.nickname, dep);
            }
        }
        graph
    }

    /// Records that `nickname` depends on `depends_on`.
    pub fn add_dependency(&mut self, nickname: &str, depends_on: &str) {
        self.edges
            .entry(nickname.to_string())
            .or_default()
            .insert(depends_on.to_string());
        self.edges.entry(depends_on.to_string()).or_default();
    }

    /// The set of nicknames the given node depends on.
    pub fn dependencies(&self, nickname: &str) -> HashSet<String> {
        self.edges.get(nickname).cloned().unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    /// Detects cycles with a depth-first search over the dependency edges.
    pub fn has_cycle(&self) -> bool {
        let mut visited = HashSet::new();
        let mut stack = HashSet::new();

        for node in self.edges.keys() {
            if self.has_cycle_dfs(node, &mut visited, &mut stack) {
                return true;
            }
        }
        false
    }

    fn has_cycle_dfs(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        stack: &mut HashSet<String>,
    ) -> bool {
        if stack.contains(node) {
            return true;
        }
        if visited.contains(node) {
            return false;
        }

        visited.insert(node.to_string());
        stack.insert(node.to_string());

        if let Some(deps) = self.edges.get(node) {
            for dep in deps {
                if self.has_cycle_dfs(dep, visited, stack) {
                    return true;
                }
            }
        }

        stack.remove(node);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_graph_has_no_cycle() {
        let graph = DependencyGraph::new();
        assert_eq!(graph.node_count(), 0);
        assert!(!graph.has_cycle());
    }

    #[test]
    fn test_add_dependency_creates_both_nodes() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("beta", "alpha");

        assert_eq!(graph.node_count(), 2);
        assert!(graph.dependencies("beta").contains("alpha"));
        assert!(graph.dependencies("alpha").is_empty());
    }

    #[test]
    fn test_simple_cycle_detected() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("alpha", "beta");
        graph.add_dependency("beta", "alpha");

        assert!(graph.has_cycle());
    }

    #[test]
    fn test_self_cycle_detected() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("alpha", "alpha");

        assert!(graph.has_cycle());
    }

    #[test]
    fn test_diamond_is_acyclic() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("left", "root");
        graph.add_dependency("right", "root");
        graph.add_dependency("merge", "left");
        graph.add_dependency("merge", "right");

        assert!(!graph.has_cycle());
    }
}
