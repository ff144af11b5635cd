use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use crate::engine::error::StoreError;
use crate::engine::types::*;
use crate::storage::StatusStore;

/// In-memory status store. Holds run records for the lifetime of the process;
/// nothing is persisted.
#[derive(Default)]
pub struct MemoryStatusStore {
    runs: RwLock<HashMap<Uuid, RunRecord>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn create(
        &self,
        run_id: Uuid,
        agent_type: &str,
        user_id: &str,
    ) -> Result<RunRecord, StoreError> {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        match runs.entry(run_id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(run_id)),
            Entry::Vacant(slot) => Ok(slot
                .insert(RunRecord::new(run_id, agent_type, user_id))
                .clone()),
        }
    }

    async fn finish(&self, run_id: Uuid, outcome: RunOutcome) -> Result<RunRecord, StoreError> {
        let mut runs = self.runs.write().unwrap_or_else(PoisonError::into_inner);
        let record = runs.get_mut(&run_id).ok_or(StoreError::NotFound(run_id))?;
        if !record.finish(outcome) {
            return Err(StoreError::AlreadyFinished(run_id));
        }
        Ok(record.clone())
    }

    async fn get(&self, run_id: Uuid) -> Result<RunRecord, StoreError> {
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        runs.get(&run_id)
            .cloned()
            .ok_or(StoreError::NotFound(run_id))
    }

    async fn list(&self, status: Option<RunStatus>) -> Vec<RunRecord> {
        let runs = self.runs.read().unwrap_or_else(PoisonError::into_inner);
        let mut records: Vec<RunRecord> = runs
            .values()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();

        // Sort by start time, newest first
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        records
    }
}
