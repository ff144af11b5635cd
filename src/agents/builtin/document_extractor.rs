use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::agents::{Agent, AgentFactory};

pub const AGENT_TYPE: &str = "document-extractor";
pub const DEFAULT_RUN_TIME: Duration = Duration::from_secs(5);

pub struct DocumentExtractorFactory {
    run_time: Duration,
}

impl DocumentExtractorFactory {
    pub fn new(run_time: Duration) -> Self {
        Self { run_time }
    }
}

impl Default for DocumentExtractorFactory {
    fn default() -> Self {
        Self::new(DEFAULT_RUN_TIME)
    }
}

impl AgentFactory for DocumentExtractorFactory {
    fn agent_type(&self) -> &str {
        AGENT_TYPE
    }

    fn description(&self) -> &str {
        "Extract structured content from a user's documents"
    }

    fn canonical_user_id(&self, user_id: &str) -> Result<String> {
        super::canonical_user_id(user_id)
    }

    fn build(&self, user_id: &str) -> Result<Box<dyn Agent>> {
        Ok(Box::new(DocumentExtractor {
            user_id: super::parse_user_id(user_id)?,
            run_time: self.run_time,
        }))
    }
}

pub struct DocumentExtractor {
    user_id: Uuid,
    run_time: Duration,
}

#[async_trait]
impl Agent for DocumentExtractor {
    async fn run(&self) -> Result<String> {
        info!(user_id = %self.user_id, agent_type = AGENT_TYPE, "Extracting documents");

        tokio::time::sleep(self.run_time).await;

        info!(user_id = %self.user_id, agent_type = AGENT_TYPE, "Extraction complete");
        Ok("extracted".to_string())
    }
}
