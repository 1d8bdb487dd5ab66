//! Boundary to the external text-completion service.
//!
//! The engine never talks to a model provider directly. Everything it needs
//! is the single [`CompletionService::complete`] call; wire it to an HTTP
//! client, a local model, or the bundled [`ScriptedCompletion`] in tests.

use async_trait::async_trait;
use std::sync::Mutex;
use thiserror::Error;

/// Errors that can occur while calling the completion service.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The service rejected or failed the request.
    #[error("completion service error: {0}")]
    Service(String),

    /// I/O error while reaching the service.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A synchronous-looking prompt-in, text-out completion backend.
///
/// Implementations must be safe to share across the engine's worker tasks.
/// The engine imposes no timeout and no retry policy of its own; failures
/// propagate according to where in the chain the call was made.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Sends one prompt and returns the generated text.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

enum Rule {
    Respond { needle: String, response: String },
    Fail { needle: String, message: String },
}

/// A scripted completion backend for tests and offline runs.
///
/// Rules are checked in insertion order against the incoming prompt; the
/// first whose needle is contained in the prompt wins. Prompts are recorded
/// so tests can assert on what the engine actually sent.
///
/// # Example
///
/// ```ignore
/// let service = ScriptedCompletion::new()
///     .respond_when("# Chain Planning Task", plan_json)
///     .fail_when("the agent \"flaky\"", "upstream unavailable")
///     .with_fallback("ok");
/// ```
#[derive(Default)]
pub struct ScriptedCompletion {
    rules: Vec<Rule>,
    fallback: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `response` to any prompt containing `needle`.
    pub fn respond_when(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.push(Rule::Respond {
            needle: needle.into(),
            response: response.into(),
        });
        self
    }

    /// Fails any prompt containing `needle` with a service error.
    pub fn fail_when(mut self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.rules.push(Rule::Fail {
            needle: needle.into(),
            message: message.into(),
        });
        self
    }

    /// Response used when no rule matches. Defaults to an empty string.
    pub fn with_fallback(mut self, response: impl Into<String>) -> Self {
        self.fallback = Some(response.into());
        self
    }

    /// Every prompt received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Number of prompts received so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(prompt.to_string());
        }

        for rule in &self.rules {
            match rule {
                Rule::Respond { needle, response } if prompt.contains(needle) => {
                    return Ok(response.clone());
                }
                Rule::Fail { needle, message } if prompt.contains(needle) => {
                    return Err(CompletionError::Service(message.clone()));
                }
                _ => {}
            }
        }

        Ok(self.fallback.clone().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_matching_rule_wins() {
        let service = ScriptedCompletion::new()
            .respond_when("alpha", "first")
            .respond_when("alpha beta", "second");

        let out = service.complete("alpha beta gamma").await.unwrap();
        assert_eq!(out, "first");
    }

    #[tokio::test]
    async fn test_fail_rule_produces_service_error() {
        let service = ScriptedCompletion::new().fail_when("boom", "exploded");

        let err = service.complete("please boom now").await.unwrap_err();
        assert!(matches!(err, CompletionError::Service(msg) if msg == "exploded"));
    }

    #[tokio::test]
    async fn test_fallback_and_recorded_calls() {
        let service = ScriptedCompletion::new().with_fallback("default");

        assert_eq!(service.complete("anything").await.unwrap(), "default");
        assert_eq!(service.complete("else").await.unwrap(), "default");

        assert_eq!(service.call_count(), 2);
        assert_eq!(service.calls()[1], "else");
    }
}
