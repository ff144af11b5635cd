use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agents::{Agent, AgentRegistry};
use crate::engine::error::{InvalidTimeout, StoreError, SubmitError};
use crate::engine::locks::LockManager;
use crate::engine::types::*;
use crate::storage::StatusStore;

/// Lock wait and run time bound applied when a submission names none.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Convert a timeout given in seconds. Only finite, positive values are accepted.
pub fn timeout_from_secs(seconds: f64) -> Result<Duration, InvalidTimeout> {
    if !(seconds.is_finite() && seconds > 0.0) {
        return Err(InvalidTimeout(seconds));
    }
    Duration::try_from_secs_f64(seconds).map_err(|_| InvalidTimeout(seconds))
}

pub const LOCK_TIMED_OUT: &str = "lock acquisition timed out";
pub const RUN_TIMED_OUT: &str = "run timed out";

/// Accepts agent runs, enforces one run at a time per key, and drives each
/// run to a terminal status in the background.
///
/// Submission does a cheap non-blocking check of the key's lock and then
/// schedules the run; the scheduled body does the authoritative acquire.
/// Two submissions that both pass the check therefore still never overlap:
/// the loser waits and, if the winner outlasts its lock timeout, fails with
/// a lock timeout.
pub struct RunCoordinator {
    registry: Arc<AgentRegistry>,
    store: Arc<dyn StatusStore>,
    locks: LockManager,
    scope: LockScope,
    lock_timeout: Duration,
}

impl RunCoordinator {
    pub fn new(registry: Arc<AgentRegistry>, store: Arc<dyn StatusStore>) -> Self {
        Self {
            registry,
            store,
            locks: LockManager::new(),
            scope: LockScope::default(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_scope(mut self, scope: LockScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    pub fn lock_scope(&self) -> LockScope {
        self.scope
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Validate and schedule a run. Returns once the run is recorded as
    /// `running`; its outcome is only observable through [`status`](Self::status).
    ///
    /// Rejections leave no trace: no record is created and nothing is scheduled.
    pub async fn submit(
        &self,
        agent_type: &str,
        user_id: &str,
        lock_timeout: Option<Duration>,
    ) -> Result<Submission, SubmitError> {
        if !self.registry.contains(agent_type) {
            warn!(agent_type, user_id, "Rejected run: unknown agent type");
            return Err(SubmitError::UnknownAgentType(agent_type.to_string()));
        }

        let resolved = self.registry.resolve(agent_type, user_id).inspect_err(|e| {
            warn!(agent_type, user_id, error = %e, "Rejected run: invalid agent config");
        })?;
        let user_id = resolved.user_id.as_str();

        let key = self.scope.key_for(user_id, agent_type);
        if self.locks.try_begin(&key).is_err() {
            warn!(key = %key, "Rejected run: an agent is already running");
            return Err(SubmitError::RunConflict { key });
        }

        let run_id = Uuid::new_v4();
        self.store.create(run_id, agent_type, user_id).await?;

        let timeout = lock_timeout.unwrap_or(self.lock_timeout);
        info!(
            run_id = %run_id,
            agent_type,
            user_id,
            timeout_s = timeout.as_secs_f64(),
            "Scheduled agent run"
        );

        tokio::spawn(Self::execute(
            self.store.clone(),
            self.locks.clone(),
            key,
            run_id,
            resolved.agent,
            timeout,
        ));

        Ok(Submission {
            run_id,
            status: RunStatus::Running,
        })
    }

    /// Snapshot of a run's record.
    pub async fn status(&self, run_id: Uuid) -> Result<RunRecord, StoreError> {
        self.store.get(run_id).await
    }

    pub async fn list_runs(&self, status: Option<RunStatus>) -> Vec<RunRecord> {
        self.store.list(status).await
    }

    /// Detached execution body of a single run. Never returns an error: every
    /// failure ends up as the run's terminal status.
    async fn execute(
        store: Arc<dyn StatusStore>,
        locks: LockManager,
        key: RunKey,
        run_id: Uuid,
        agent: Box<dyn Agent>,
        timeout: Duration,
    ) {
        let outcome = match locks.acquire(&key, timeout).await {
            Err(_) => {
                warn!(run_id = %run_id, key = %key, "Could not acquire run lock");
                RunOutcome::Failed(LOCK_TIMED_OUT.to_string())
            }
            Ok(guard) => {
                info!(run_id = %run_id, key = %key, "Run lock acquired");
                let outcome = Self::run_agent(agent.as_ref(), timeout).await;
                guard.release();
                outcome
            }
        };

        match &outcome {
            RunOutcome::Completed(result) => {
                info!(run_id = %run_id, result = %result, "Agent run completed");
            }
            RunOutcome::Failed(err) => {
                warn!(run_id = %run_id, error = %err, "Agent run failed");
            }
        }

        if let Err(e) = store.finish(run_id, outcome).await {
            error!(run_id = %run_id, error = %e, "Ignoring status update");
        }
    }

    /// Run the agent bounded by `timeout`, containing errors and panics.
    async fn run_agent(agent: &dyn Agent, timeout: Duration) -> RunOutcome {
        let run = AssertUnwindSafe(agent.run()).catch_unwind();
        match tokio::time::timeout(timeout, run).await {
            Ok(Ok(Ok(result))) => RunOutcome::Completed(result),
            Ok(Ok(Err(e))) => RunOutcome::Failed(format!("{:#}", e)),
            Ok(Err(panic)) => {
                RunOutcome::Failed(format!("agent panicked: {}", panic_message(&*panic)))
            }
            Err(_) => RunOutcome::Failed(RUN_TIMED_OUT.to_string()),
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
