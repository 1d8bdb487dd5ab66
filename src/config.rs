//! Engine configuration.

/// Configuration for a [`ChainEngine`](crate::engine::ChainEngine).
///
/// # Examples
///
/// ```ignore
/// let config = EngineConfig::new()
///     .with_max_parallel_workers(8)
///     .with_interactive(false);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on concurrently executing agents inside one parallel
    /// group.
    pub max_parallel_workers: usize,

    /// Whether sequential nodes may suspend the run to ask the user their
    /// pending questions. When disabled, every question list is cleared
    /// right after planning and the chain runs straight through.
    pub interactive: bool,

    /// Custom template for the planning prompt; `None` uses
    /// [`DEFAULT_PLANNER_TEMPLATE`](crate::prompts::DEFAULT_PLANNER_TEMPLATE).
    pub planner_template: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// Creates a configuration with the default values: 5 parallel workers,
    /// interactive mode on, default planner template.
    pub fn new() -> Self {
        Self {
            max_parallel_workers: 5,
            interactive: true,
            planner_template: None,
        }
    }

    pub fn with_max_parallel_workers(mut self, limit: usize) -> Self {
        self.max_parallel_workers = limit.max(1);
        self
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn with_planner_template(mut self, template: impl Into<String>) -> Self {
        self.planner_template = Some(template.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.max_parallel_workers, 5);
        assert!(config.interactive);
        assert!(config.planner_template.is_none());
    }

    #[test]
    fn test_builder_chain() {
        let config = EngineConfig::new()
            .with_max_parallel_workers(8)
            .with_interactive(false)
            .with_planner_template("PLAN: {{ initial_message }}");

        assert_eq!(config.max_parallel_workers, 8);
        assert!(!config.interactive);
        assert_eq!(config.planner_template.as_deref(), Some("PLAN: {{ initial_message }}"));
    }

    #[test]
    fn test_worker_limit_never_drops_to_zero() {
        let config = EngineConfig::new().with_max_parallel_workers(0);
        assert_eq!(config.max_parallel_workers, 1);
    }
}
