use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of an agent run. A record is created already `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            _ => Err(format!(
                "Invalid status '{}'. Use: running, completed, failed",
                s
            )),
        }
    }
}

/// Terminal outcome of a run, written once by its execution body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(String),
    Failed(String),
}

impl RunOutcome {
    pub fn status(&self) -> RunStatus {
        match self {
            RunOutcome::Completed(_) => RunStatus::Completed,
            RunOutcome::Failed(_) => RunStatus::Failed,
        }
    }
}

/// Observable snapshot of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub agent_type: String,
    pub user_id: String,
    pub status: RunStatus,
    pub result: Option<String>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunRecord {
    pub fn new(run_id: Uuid, agent_type: &str, user_id: &str) -> Self {
        Self {
            run_id,
            agent_type: agent_type.to_string(),
            user_id: user_id.to_string(),
            status: RunStatus::Running,
            result: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Move the record into its terminal state. Returns `false` and leaves the
    /// record untouched if it is already terminal.
    pub fn finish(&mut self, outcome: RunOutcome) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = outcome.status();
        match outcome {
            RunOutcome::Completed(result) => self.result = Some(result),
            RunOutcome::Failed(error) => self.error = Some(error),
        }
        self.completed_at = Some(Utc::now());
        true
    }
}

/// How wide the mutual-exclusion domain of a run is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LockScope {
    /// One run at a time per (user, agent type).
    #[default]
    UserAgent,
    /// One run at a time per user, whatever the agent type.
    User,
}

impl LockScope {
    pub fn key_for(&self, user_id: &str, agent_type: &str) -> RunKey {
        match self {
            LockScope::UserAgent => RunKey::new(user_id, Some(agent_type)),
            LockScope::User => RunKey::new(user_id, None),
        }
    }
}

impl std::fmt::Display for LockScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockScope::UserAgent => write!(f, "user-agent"),
            LockScope::User => write!(f, "user"),
        }
    }
}

/// Exclusion domain: two runs with equal keys never execute concurrently.
/// `agent_type` is `None` when the lock scope covers every agent type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunKey {
    pub user_id: String,
    pub agent_type: Option<String>,
}

impl RunKey {
    pub fn new(user_id: &str, agent_type: Option<&str>) -> Self {
        Self {
            user_id: user_id.to_string(),
            agent_type: agent_type.map(str::to_string),
        }
    }
}

impl std::fmt::Display for RunKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.agent_type {
            Some(agent_type) => write!(f, "{}/{}", self.user_id, agent_type),
            None => write!(f, "{}/*", self.user_id),
        }
    }
}

/// Returned to the caller once a run has been scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub run_id: Uuid,
    pub status: RunStatus,
}
