use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::agents::{Agent, AgentFactory};

pub const AGENT_TYPE: &str = "policy-checker";
pub const DEFAULT_RUN_TIME: Duration = Duration::from_secs(3);

pub const APPROVED: &str = "approved";
pub const REJECTED: &str = "rejected";

pub struct PolicyCheckerFactory {
    run_time: Duration,
}

impl PolicyCheckerFactory {
    pub fn new(run_time: Duration) -> Self {
        Self { run_time }
    }
}

impl Default for PolicyCheckerFactory {
    fn default() -> Self {
        Self::new(DEFAULT_RUN_TIME)
    }
}

impl AgentFactory for PolicyCheckerFactory {
    fn agent_type(&self) -> &str {
        AGENT_TYPE
    }

    fn description(&self) -> &str {
        "Check a user's request against policy and approve or reject it"
    }

    fn canonical_user_id(&self, user_id: &str) -> Result<String> {
        super::canonical_user_id(user_id)
    }

    fn build(&self, user_id: &str) -> Result<Box<dyn Agent>> {
        Ok(Box::new(PolicyChecker {
            user_id: super::parse_user_id(user_id)?,
            run_time: self.run_time,
        }))
    }
}

pub struct PolicyChecker {
    user_id: Uuid,
    run_time: Duration,
}

#[async_trait]
impl Agent for PolicyChecker {
    async fn run(&self) -> Result<String> {
        info!(user_id = %self.user_id, agent_type = AGENT_TYPE, "Checking policy");

        tokio::time::sleep(self.run_time).await;

        let decision = if rand::random_bool(0.5) {
            APPROVED
        } else {
            REJECTED
        };

        info!(user_id = %self.user_id, agent_type = AGENT_TYPE, decision, "Policy check complete");
        Ok(decision.to_string())
    }
}
