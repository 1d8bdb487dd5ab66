//! Prompt templates for the planning, subtask and aggregation calls.
//!
//! The wording here is deliberately outside the engine's contract: the
//! engine only guarantees which data reaches which template. Subtask and
//! aggregator prompts receive the reduced view of the chain, serialized as
//! JSON, so an agent can only ever read the observations of its declared
//! inputs.

use crate::chain::{AgentNode, Chain};
use crate::error::EngineError;
use minijinja::Environment;
use serde::Serialize;

/// Default template for the planning call. Overridable per engine via
/// [`EngineConfig::with_planner_template`](crate::config::EngineConfig::with_planner_template);
/// custom templates receive the same `initial_message` and `chain_example`
/// variables.
pub const DEFAULT_PLANNER_TEMPLATE: &str = r#"# Chain Planning Task

You are an expert planner. Break the user's request below into a chain of
subtasks, each handled by one agent backed by a text-completion model. Each
agent's output feeds its dependents, and everything is finally synthesized
into one answer.

Each agent carries:
- `agent_nickname`: a unique nickname.
- `agent_llm_prompt`: the full, specific task prompt for that agent.
- `input_from_agents`: nicknames whose outputs feed this agent.
- `user_questions`: information to collect from the end user, phrased as
  questions in the user's language.

Rules:
1. Order the agents chronologically: an agent must be declared after every
   agent it takes input from.
2. The last agent must have the nickname "Aggregator", carry no
   `user_questions`, and list every other agent in `input_from_agents`.
3. Return ONLY a JSON object, with no text before or after it.

## Format example
{{ chain_example }}

## User request
{{ initial_message }}
"#;

/// Reference chain embedded in the planning prompt.
const CHAIN_EXAMPLE: &str = r#"{
  "agents": [
    {
      "agent_nickname": "MarketAnalysis",
      "agent_llm_prompt": "Analyze the target market for the proposed business: industry trends, demographics, competitors and market size.",
      "input_from_agents": [],
      "user_questions": ["Which products or services will you offer?"]
    },
    {
      "agent_nickname": "MarketingStrategy",
      "agent_llm_prompt": "Design a marketing strategy building on the market analysis: positioning, channels and campaigns.",
      "input_from_agents": ["MarketAnalysis"],
      "user_questions": []
    },
    {
      "agent_nickname": "Aggregator",
      "agent_llm_prompt": "Combine all outputs into one comprehensive business plan answering the initial request.",
      "input_from_agents": ["MarketAnalysis", "MarketingStrategy"]
    }
  ]
}"#;

const SUBTASK_TEMPLATE: &str = r#"# Subtask Execution

You are the agent "{{ nickname }}" inside a chain of cooperating agents. The
chain was planned from this initial request: "{{ initial_message }}"

## Your task
{{ task_prompt }}

{% if dependencies %}## Input agents
Your input is the `observation` field of: {{ dependencies }}
{% endif %}
## Chain context
{{ chain_json }}

{% if questions %}## User questions and answers
The user was asked: {{ questions }}
The user answered: {{ answers }}
{% endif %}
Produce the output for your subtask only. It will be read by the agents that
depend on you and by the final Aggregator, so keep it self-contained,
precise and directly usable.
"#;

const AGGREGATOR_TEMPLATE: &str = r#"# Final Aggregation

You are the "{{ nickname }}", the terminal agent of a chain planned from
this initial request: "{{ initial_message }}"

## Your task
{{ task_prompt }}

## Chain context
Every agent's `observation` below is an input to your synthesis:
{{ chain_json }}

Integrate all observations into one coherent, detailed final answer to the
initial request. Connect the contributions, resolve overlaps, and leave no
agent's output unused.
"#;

#[derive(Serialize)]
struct PlannerContext<'a> {
    initial_message: &'a str,
    chain_example: &'a str,
}

#[derive(Serialize)]
struct NodeContext<'a> {
    nickname: &'a str,
    task_prompt: &'a str,
    initial_message: &'a str,
    dependencies: String,
    chain_json: String,
    questions: &'a [String],
    answers: &'a [String],
}

fn render(template: &str, context: impl Serialize) -> Result<String, EngineError> {
    let env = Environment::new();
    let tmpl = env
        .template_from_str(template)
        .map_err(|e| EngineError::Template(e.to_string()))?;
    tmpl.render(context)
        .map_err(|e| EngineError::Template(e.to_string()))
}

/// Renders the planning prompt, using `template` when the caller configured
/// a custom one.
pub fn planner_prompt(template: Option<&str>, initial_message: &str) -> Result<String, EngineError> {
    render(
        template.unwrap_or(DEFAULT_PLANNER_TEMPLATE),
        PlannerContext {
            initial_message,
            chain_example: CHAIN_EXAMPLE,
        },
    )
}

/// Renders the execution prompt for one subtask node against its reduced
/// view of the chain.
pub fn subtask_prompt(
    node: &AgentNode,
    view: &Chain,
    initial_message: &str,
) -> Result<String, EngineError> {
    render(
        SUBTASK_TEMPLATE,
        NodeContext {
            nickname: &node.nickname,
            task_prompt: &node.prompt,
            initial_message,
            dependencies: node.depends_on.join(", "),
            chain_json: serde_json::to_string_pretty(view)?,
            questions: &node.pending_questions,
            answers: &node.answers,
        },
    )
}

/// Renders the final aggregation prompt against the full-observation view.
pub fn aggregator_prompt(
    node: &AgentNode,
    view: &Chain,
    initial_message: &str,
) -> Result<String, EngineError> {
    render(
        AGGREGATOR_TEMPLATE,
        NodeContext {
            nickname: &node.nickname,
            task_prompt: &node.prompt,
            initial_message,
            dependencies: node.depends_on.join(", "),
            chain_json: serde_json::to_string_pretty(view)?,
            questions: &node.pending_questions,
            answers: &node.answers,
        },
    )
}
