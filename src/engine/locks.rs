//! Keyed run locks.
//!
//! One async mutex per [`RunKey`], created on first use and evicted once
//! nobody holds or waits for it. Every waiter registers its interest in the
//! table entry before it starts waiting, and eviction only happens when that
//! interest count drops back to zero. All table mutations happen under a
//! single coarse lock, so a release can never evict an entry that another
//! waiter has just registered on.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::error::LockTimeout;
use super::types::RunKey;

/// The key is currently held by another run.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0} is busy")]
pub struct LockBusy(pub RunKey);

struct Slot {
    lock: Arc<AsyncMutex<()>>,
    /// Holders plus queued waiters.
    interest: usize,
}

type Table = Arc<Mutex<HashMap<RunKey, Slot>>>;

fn lock_table(table: &Table) -> MutexGuard<'_, HashMap<RunKey, Slot>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-wide table of per-key locks. Cloning shares the table.
#[derive(Clone, Default)]
pub struct LockManager {
    table: Table,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-blocking check used at submission time. Never mutates the table
    /// and never keeps the lock: a free key only means the caller may go on
    /// and schedule a run that will [`acquire`](Self::acquire) later.
    pub fn try_begin(&self, key: &RunKey) -> Result<(), LockBusy> {
        let table = lock_table(&self.table);
        match table.get(key) {
            Some(slot) if slot.lock.try_lock().is_err() => Err(LockBusy(key.clone())),
            _ => Ok(()),
        }
    }

    /// Wait up to `timeout` for exclusive ownership of `key`.
    ///
    /// On timeout nothing is held, so there is nothing to release; the
    /// waiter's interest is withdrawn and an idle entry is evicted.
    pub async fn acquire(&self, key: &RunKey, timeout: Duration) -> Result<KeyGuard, LockTimeout> {
        let lease = self.register(key);
        match tokio::time::timeout(timeout, lease.lock.clone().lock_owned()).await {
            Ok(guard) => Ok(KeyGuard {
                _guard: guard,
                lease,
            }),
            Err(_) => Err(LockTimeout),
        }
    }

    /// Whether some run currently owns `key`.
    pub fn is_held(&self, key: &RunKey) -> bool {
        lock_table(&self.table)
            .get(key)
            .is_some_and(|slot| slot.lock.try_lock().is_err())
    }

    /// Number of keys with a holder or waiter.
    pub fn active_keys(&self) -> usize {
        lock_table(&self.table).len()
    }

    fn register(&self, key: &RunKey) -> Lease {
        let mut table = lock_table(&self.table);
        let slot = table.entry(key.clone()).or_insert_with(|| Slot {
            lock: Arc::new(AsyncMutex::new(())),
            interest: 0,
        });
        slot.interest += 1;
        Lease {
            table: self.table.clone(),
            key: key.clone(),
            lock: slot.lock.clone(),
        }
    }
}

/// Registered interest in a key. Dropping it withdraws the interest and
/// evicts the entry if it was the last one.
struct Lease {
    table: Table,
    key: RunKey,
    lock: Arc<AsyncMutex<()>>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        let mut table = lock_table(&self.table);
        let idle = match table.get_mut(&self.key) {
            Some(slot) => {
                slot.interest = slot.interest.saturating_sub(1);
                slot.interest == 0
            }
            None => false,
        };
        if idle {
            table.remove(&self.key);
        }
    }
}

/// Exclusive ownership of a key. Released on drop, on every exit path.
pub struct KeyGuard {
    // Field order matters: the mutex is unlocked before interest is withdrawn.
    _guard: OwnedMutexGuard<()>,
    lease: Lease,
}

impl KeyGuard {
    pub fn key(&self) -> &RunKey {
        &self.lease.key
    }

    pub fn release(self) {
        drop(self);
    }
}

impl std::fmt::Debug for KeyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyGuard").field("key", &self.lease.key).finish()
    }
}
