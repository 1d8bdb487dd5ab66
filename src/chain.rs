//! The agent chain data model.
//!
//! A [`Chain`] is the ordered graph of sub-tasks produced by the planning
//! call for one user request. It is built once, validated, and then only
//! mutated per node: answers accumulate as the user replies to checkpoint
//! questions, and observations are filled in as agents execute. Nodes are
//! never added or removed after creation.
//!
//! The serde field names match the planning schema on the wire, so the same
//! types parse the planner's response and serialize into prompt context.

use crate::error::EngineError;
use crate::graph::DependencyGraph;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Nickname of the distinguished terminal node that synthesizes all other
/// observations into the final answer.
pub const AGGREGATOR_NICKNAME: &str = "Aggregator";

/// One sub-task in the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentNode {
    /// Unique, stable identifier inside the chain. Dependency references and
    /// checkpoint answers are matched against it.
    #[serde(rename = "agent_nickname")]
    pub nickname: String,

    /// The task description for this agent. Opaque to the engine; it is
    /// expanded into a full prompt at execution time.
    #[serde(rename = "agent_llm_prompt")]
    pub prompt: String,

    /// Nicknames whose observations feed this agent's input.
    #[serde(rename = "input_from_agents", default)]
    pub depends_on: Vec<String>,

    /// Questions still to be asked of the end user, in planning order.
    #[serde(rename = "user_questions", default)]
    pub pending_questions: Vec<String>,

    /// Answers received so far, index-aligned with the asked prefix of
    /// `pending_questions`. Always `answers.len() <= pending_questions.len()`.
    #[serde(rename = "user_answers", default, skip_serializing_if = "Vec::is_empty")]
    pub answers: Vec<String>,

    /// The agent's produced output; absent until it has executed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
}

impl AgentNode {
    pub fn is_aggregator(&self) -> bool {
        self.nickname == AGGREGATOR_NICKNAME
    }

    /// The next unanswered question, if any.
    pub fn next_question(&self) -> Option<&str> {
        self.pending_questions
            .get(self.answers.len())
            .map(String::as_str)
    }

    /// Whether this node has produced a non-empty observation.
    pub fn has_observation(&self) -> bool {
        self.observation.as_deref().is_some_and(|text| !text.is_empty())
    }
}

/// The ordered sequence of agent nodes planned for one user request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    pub agents: Vec<AgentNode>,
}

impl Chain {
    /// Parses and validates a chain description returned by the planning
    /// call. Markdown code fences around the JSON are tolerated.
    pub fn from_plan(raw: &str) -> Result<Self, EngineError> {
        let sanitized = sanitize_completion(raw);
        let chain: Chain = serde_json::from_str(&sanitized)
            .map_err(|e| EngineError::Planning(format!("malformed chain description: {e}")))?;
        chain.validate()?;
        Ok(chain)
    }

    /// All nodes except the terminal aggregator.
    pub fn subtasks(&self) -> &[AgentNode] {
        match self.agents.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    pub fn node(&self, nickname: &str) -> Option<&AgentNode> {
        self.agents.iter().find(|node| node.nickname == nickname)
    }

    pub fn position(&self, nickname: &str) -> Option<usize> {
        self.agents.iter().position(|node| node.nickname == nickname)
    }

    /// Wipes every question list. Non-interactive runs call this before
    /// execution so no checkpoint can ever trigger.
    pub fn clear_questions(&mut self) {
        for node in &mut self.agents {
            node.pending_questions.clear();
        }
    }

    /// Builds the reduced view of the chain for one node: a copy in which
    /// every node outside the target's declared dependencies has its
    /// observation removed. The aggregator sees everything.
    ///
    /// The shared chain is never mutated; this is a pure projection.
    pub fn render_view(&self, for_nickname: &str) -> Chain {
        let mut view = self.clone();
        if for_nickname == AGGREGATOR_NICKNAME {
            return view;
        }

        let deps: HashSet<&str> = self
            .node(for_nickname)
            .map(|node| node.depends_on.iter().map(String::as_str).collect())
            .unwrap_or_default();

        for node in &mut view.agents {
            if !deps.contains(node.nickname.as_str()) {
                node.observation = None;
            }
        }
        view
    }

    /// Rejects chains the engine cannot execute: missing or misplaced
    /// aggregator, duplicate nicknames, references to undeclared agents,
    /// cyclic dependencies, and dependencies on later-declared agents (the
    /// declared order must be a valid topological order).
    fn validate(&self) -> Result<(), EngineError> {
        if self.agents.is_empty() {
            return Err(EngineError::Planning("chain has no agents".into()));
        }

        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (index, node) in self.agents.iter().enumerate() {
            if positions.insert(node.nickname.as_str(), index).is_some() {
                return Err(EngineError::Planning(format!(
                    "duplicate agent nickname '{}'",
                    node.nickname
                )));
            }
        }

        match self.agents.last() {
            Some(last) if last.is_aggregator() => {
                if !last.pending_questions.is_empty() {
                    return Err(EngineError::Planning(
                        "the aggregator must not carry user questions".into(),
                    ));
                }
            }
            _ => {
                return Err(EngineError::Planning(format!(
                    "the last agent must be '{AGGREGATOR_NICKNAME}'"
                )));
            }
        }

        for node in &self.agents {
            for dep in &node.depends_on {
                if !positions.contains_key(dep.as_str()) {
                    return Err(EngineError::Planning(format!(
                        "agent '{}' depends on undeclared agent '{dep}'",
                        node.nickname
                    )));
                }
            }
        }

        if DependencyGraph::from_chain(self).has_cycle() {
            return Err(EngineError::Planning(
                "cyclic dependency between agents".into(),
            ));
        }

        for (index, node) in self.agents.iter().enumerate() {
            for dep in &node.depends_on {
                if positions.get(dep.as_str()).is_some_and(|&at| at >= index) {
                    return Err(EngineError::Planning(format!(
                        "agent '{}' depends on '{dep}', which is not declared before it",
                        node.nickname
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Strips markdown code fences from a completion so the JSON body parses.
fn sanitize_completion(raw: &str) -> String {
    static FENCES: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^```[[:alnum:]]*[ \t]*").expect("fence pattern compiles"));
    FENCES.replace_all(raw, "").trim().to_string()
}
