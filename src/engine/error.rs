use thiserror::Error;
use uuid::Uuid;

use super::types::RunKey;

/// Reasons a submission is rejected before anything is scheduled.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Unknown agent type: {0}")]
    UnknownAgentType(String),

    #[error("{0}")]
    InvalidAgentConfig(String),

    #[error("An agent is already running for {key}")]
    RunConflict { key: RunKey },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Run ID: {0} not found")]
    NotFound(Uuid),

    #[error("Run ID: {0} already exists")]
    Duplicate(Uuid),

    #[error("Run ID: {0} has already finished")]
    AlreadyFinished(Uuid),
}

/// The lock for a key could not be acquired before the deadline.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("lock acquisition timed out")]
pub struct LockTimeout;

/// A timeout given in seconds that is not a finite, positive number.
#[derive(Debug, Error, PartialEq)]
#[error("timeout must be a positive number of seconds, got {0}")]
pub struct InvalidTimeout(pub f64);
