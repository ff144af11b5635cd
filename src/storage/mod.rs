pub mod memory_store;

use async_trait::async_trait;
use uuid::Uuid;

use crate::engine::error::StoreError;
use crate::engine::types::*;

/// Trait for run status bookkeeping.
///
/// Each record is written by exactly one execution body, so implementations
/// only need to make the map itself safe for concurrent use. Readers must
/// always observe a whole record, never a partially updated one.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Insert a new `running` record. Fails if `run_id` is already present.
    async fn create(
        &self,
        run_id: Uuid,
        agent_type: &str,
        user_id: &str,
    ) -> Result<RunRecord, StoreError>;

    /// Record the terminal outcome of a run and stamp `completed_at`.
    async fn finish(&self, run_id: Uuid, outcome: RunOutcome) -> Result<RunRecord, StoreError>;

    /// Snapshot of a single run.
    async fn get(&self, run_id: Uuid) -> Result<RunRecord, StoreError>;

    /// List runs, newest first, optionally filtered by status.
    async fn list(&self, status: Option<RunStatus>) -> Vec<RunRecord>;
}
