pub mod builtin;

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::engine::coordinator::panic_message;
use crate::engine::error::SubmitError;

/// A runnable computation bound to a single user.
///
/// Instances are built per run and never shared between runs, so an agent
/// may keep per-run state without synchronisation.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Run to completion and produce a result string.
    async fn run(&self) -> Result<String>;
}

/// Builds agents of one type.
pub trait AgentFactory: Send + Sync {
    /// Agent type identifier (e.g., "document-extractor").
    fn agent_type(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Canonical spelling of `user_id`. Runs are locked and recorded under
    /// this value, so every spelling of one user must map to the same string.
    fn canonical_user_id(&self, user_id: &str) -> Result<String> {
        Ok(user_id.to_string())
    }

    /// Construct an agent for a canonical `user_id`. Validation failures are
    /// reported to the caller as an invalid agent configuration.
    fn build(&self, user_id: &str) -> Result<Box<dyn Agent>>;
}

/// An agent built for one run, with the user it was built for.
pub struct ResolvedAgent {
    pub user_id: String,
    pub agent: Box<dyn Agent>,
}

/// Registry of available agent types.
pub struct AgentRegistry {
    factories: HashMap<String, Arc<dyn AgentFactory>>,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with all built-in agents at their default run times.
    pub fn with_builtins() -> Self {
        Self::with_builtin_run_times(&HashMap::new())
    }

    /// Create a registry with all built-in agents, overriding the run time
    /// (in seconds) of the agent types named in `run_times`.
    pub fn with_builtin_run_times(run_times: &HashMap<String, f64>) -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry, run_times);
        registry
    }

    /// Register a factory, replacing any previous one for the same type.
    pub fn register(&mut self, factory: Arc<dyn AgentFactory>) {
        self.factories
            .insert(factory.agent_type().to_string(), factory);
    }

    pub fn get(&self, agent_type: &str) -> Option<Arc<dyn AgentFactory>> {
        self.factories.get(agent_type).cloned()
    }

    pub fn contains(&self, agent_type: &str) -> bool {
        self.factories.contains_key(agent_type)
    }

    /// Look up the factory for `agent_type`, canonicalise `user_id` and build
    /// an agent for it. A panicking factory is reported as an invalid config.
    pub fn resolve(&self, agent_type: &str, user_id: &str) -> Result<ResolvedAgent, SubmitError> {
        let factory = self
            .get(agent_type)
            .ok_or_else(|| SubmitError::UnknownAgentType(agent_type.to_string()))?;

        let built = std::panic::catch_unwind(AssertUnwindSafe(|| -> Result<ResolvedAgent> {
            let user_id = factory.canonical_user_id(user_id)?;
            let agent = factory.build(&user_id)?;
            Ok(ResolvedAgent { user_id, agent })
        }));

        match built {
            Ok(Ok(resolved)) => Ok(resolved),
            Ok(Err(e)) => Err(SubmitError::InvalidAgentConfig(format!("{:#}", e))),
            Err(panic) => Err(SubmitError::InvalidAgentConfig(format!(
                "agent factory panicked: {}",
                panic_message(&*panic)
            ))),
        }
    }

    /// List all registered agent types with descriptions.
    pub fn list(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .factories
            .values()
            .map(|f| (f.agent_type(), f.description()))
            .collect();
        entries.sort_by_key(|(name, _)| *name);
        entries
    }
}
