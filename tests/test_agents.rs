//! Tests for the agent registry and the built-in agents.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use agent_runner::agents::builtin::{DocumentExtractorFactory, PolicyCheckerFactory};
use agent_runner::agents::{Agent, AgentFactory, AgentRegistry};
use agent_runner::engine::error::SubmitError;
use async_trait::async_trait;

const USER: &str = "123e4567-e89b-12d3-a456-426614174000";

struct EchoAgent(String);

#[async_trait]
impl Agent for EchoAgent {
    async fn run(&self) -> anyhow::Result<String> {
        Ok(self.0.clone())
    }
}

struct EchoFactory;

impl AgentFactory for EchoFactory {
    fn agent_type(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo the user id"
    }

    fn build(&self, user_id: &str) -> anyhow::Result<Box<dyn Agent>> {
        if user_id.is_empty() {
            anyhow::bail!("user_id is required");
        }
        Ok(Box::new(EchoAgent(user_id.to_string())))
    }
}

fn assert_elapsed(start: tokio::time::Instant, expected: Duration) {
    let elapsed = start.elapsed();
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(50),
        "elapsed {:?}, expected {:?}",
        elapsed,
        expected
    );
}

// --- Registry ---

#[test]
fn builtins_are_registered() {
    let registry = AgentRegistry::with_builtins();
    let types: Vec<&str> = registry.list().iter().map(|(t, _)| *t).collect();

    assert_eq!(types, vec!["document-extractor", "policy-checker"]);
    assert!(registry.contains("document-extractor"));
    assert!(registry.get("policy-checker").is_some());
    assert!(!registry.contains("invalid-agent"));
}

#[test]
fn list_is_sorted_with_descriptions() {
    let mut registry = AgentRegistry::with_builtins();
    registry.register(Arc::new(EchoFactory));

    let entries = registry.list();
    assert_eq!(entries[0].0, "document-extractor");
    assert_eq!(entries[1], ("echo", "Echo the user id"));
    assert_eq!(entries[2].0, "policy-checker");
    assert!(entries.iter().all(|(_, desc)| !desc.is_empty()));
}

#[test]
fn resolve_unknown_agent_type() {
    let registry = AgentRegistry::with_builtins();
    let err = registry.resolve("invalid-agent", USER).err().unwrap();

    assert!(matches!(err, SubmitError::UnknownAgentType(ref t) if t == "invalid-agent"));
    assert_eq!(err.to_string(), "Unknown agent type: invalid-agent");
}

#[test]
fn resolve_propagates_construction_error() {
    let mut registry = AgentRegistry::new();
    registry.register(Arc::new(EchoFactory));

    let err = registry.resolve("echo", "").err().unwrap();
    assert!(matches!(err, SubmitError::InvalidAgentConfig(ref msg) if msg == "user_id is required"));
}

#[test]
fn builtins_reject_non_uuid_user() {
    let registry = AgentRegistry::with_builtins();

    for agent_type in ["document-extractor", "policy-checker"] {
        let err = registry.resolve(agent_type, "not-a-uuid").err().unwrap();
        match err {
            SubmitError::InvalidAgentConfig(msg) => {
                assert!(msg.contains("user_id must be a UUID"), "{}", msg)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}

#[tokio::test]
async fn custom_agent_runs_after_resolve() {
    let mut registry = AgentRegistry::new();
    registry.register(Arc::new(EchoFactory));

    let resolved = registry.resolve("echo", "u42").unwrap();
    assert_eq!(resolved.user_id, "u42");
    assert_eq!(resolved.agent.run().await.unwrap(), "u42");
}

#[test]
fn builtins_canonicalise_uuid_spellings() {
    let registry = AgentRegistry::with_builtins();
    let spellings = [
        USER.to_string(),
        USER.to_uppercase(),
        USER.replace('-', ""),
        format!("{{{}}}", USER),
        format!("urn:uuid:{}", USER),
        format!("  {} ", USER),
    ];

    for agent_type in ["document-extractor", "policy-checker"] {
        for spelling in &spellings {
            let resolved = registry.resolve(agent_type, spelling).unwrap();
            assert_eq!(resolved.user_id, USER, "{} for {}", agent_type, spelling);
        }
    }
}

struct PanickingFactory;

impl AgentFactory for PanickingFactory {
    fn agent_type(&self) -> &str {
        "broken"
    }

    fn description(&self) -> &str {
        "Panics while building"
    }

    fn build(&self, _user_id: &str) -> anyhow::Result<Box<dyn Agent>> {
        panic!("factory exploded");
    }
}

#[test]
fn resolve_contains_factory_panic() {
    let mut registry = AgentRegistry::new();
    registry.register(Arc::new(PanickingFactory));

    let err = registry.resolve("broken", USER).err().unwrap();
    match err {
        SubmitError::InvalidAgentConfig(msg) => {
            assert_eq!(msg, "agent factory panicked: factory exploded")
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

// --- Built-in agents ---

#[tokio::test(start_paused = true)]
async fn document_extractor_returns_extracted_after_run_time() {
    let factory = DocumentExtractorFactory::default();
    let agent = factory.build(USER).unwrap();

    let start = tokio::time::Instant::now();
    let result = agent.run().await.unwrap();

    assert_eq!(result, "extracted");
    assert_elapsed(start, Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn policy_checker_approves_or_rejects() {
    let factory = PolicyCheckerFactory::default();
    let agent = factory.build(USER).unwrap();

    let start = tokio::time::Instant::now();
    let result = agent.run().await.unwrap();

    assert!(result == "approved" || result == "rejected", "{}", result);
    assert_elapsed(start, Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn run_time_overrides_apply() {
    let mut run_times = HashMap::new();
    run_times.insert("document-extractor".to_string(), 0.5);
    run_times.insert("policy-checker".to_string(), -1.0);
    let registry = AgentRegistry::with_builtin_run_times(&run_times);

    let start = tokio::time::Instant::now();
    registry
        .resolve("document-extractor", USER)
        .unwrap()
        .agent
        .run()
        .await
        .unwrap();
    assert_elapsed(start, Duration::from_millis(500));

    // Invalid overrides fall back to the default
    let start = tokio::time::Instant::now();
    registry
        .resolve("policy-checker", USER)
        .unwrap()
        .agent
        .run()
        .await
        .unwrap();
    assert_elapsed(start, Duration::from_secs(3));
}
