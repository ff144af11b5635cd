pub mod document_extractor;
pub mod policy_checker;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use uuid::Uuid;

use crate::agents::AgentRegistry;

pub use document_extractor::DocumentExtractorFactory;
pub use policy_checker::PolicyCheckerFactory;

/// Register all built-in agents into the registry.
pub fn register_all(registry: &mut AgentRegistry, run_times: &HashMap<String, f64>) {
    let run_time = |agent_type: &str, default: Duration| {
        run_times
            .get(agent_type)
            .and_then(|s| Duration::try_from_secs_f64(*s).ok())
            .unwrap_or(default)
    };

    registry.register(Arc::new(DocumentExtractorFactory::new(run_time(
        document_extractor::AGENT_TYPE,
        document_extractor::DEFAULT_RUN_TIME,
    ))));
    registry.register(Arc::new(PolicyCheckerFactory::new(run_time(
        policy_checker::AGENT_TYPE,
        policy_checker::DEFAULT_RUN_TIME,
    ))));
}

/// Built-in agents only serve users identified by a UUID.
fn parse_user_id(user_id: &str) -> Result<Uuid> {
    Uuid::parse_str(user_id.trim()).with_context(|| format!("user_id must be a UUID: '{}'", user_id))
}

/// Lowercase hyphenated form, whatever spelling of the UUID was given.
fn canonical_user_id(user_id: &str) -> Result<String> {
    Ok(parse_user_id(user_id)?.hyphenated().to_string())
}
