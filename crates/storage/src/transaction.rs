//! MemoryTransaction: staged writes and held update locks
//!
//! ## Lifecycle
//!
//! ```text
//! Active ──commit()──> Committed   (staged writes applied, locks released)
//!    └────abort()────> Aborted     (staged writes dropped, locks released)
//! ```
//!
//! Dropping an active transaction aborts it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;

use playerdb_core::{StoreFault, StoreResult, Transaction};

use crate::faults::FaultPoint;
use crate::memory::StoreShared;

/// A write applied to a collection when its transaction commits
pub(crate) type StagedWrite = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxStatus {
    Active,
    Committed,
    Aborted,
}

struct TxState {
    status: TxStatus,
    /// Update locks held, keyed by the address of the key's lock
    locks: HashMap<usize, OwnedMutexGuard<()>>,
    staged: Vec<StagedWrite>,
}

/// Transaction over a [`MemoryStore`](crate::MemoryStore)
pub struct MemoryTransaction {
    id: u64,
    shared: Arc<StoreShared>,
    state: Mutex<TxState>,
}

impl fmt::Debug for MemoryTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryTransaction")
            .field("id", &self.id)
            .field("status", &state.status)
            .field("locks", &state.locks.len())
            .field("staged", &state.staged.len())
            .finish()
    }
}

impl MemoryTransaction {
    pub(crate) fn new(id: u64, shared: Arc<StoreShared>) -> Self {
        MemoryTransaction {
            id,
            shared,
            state: Mutex::new(TxState {
                status: TxStatus::Active,
                locks: HashMap::new(),
                staged: Vec::new(),
            }),
        }
    }

    /// True until the transaction commits or aborts.
    pub fn is_active(&self) -> bool {
        self.state.lock().status == TxStatus::Active
    }

    pub(crate) fn ensure_active(&self) -> StoreResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(StoreFault::TransactionNotActive(self.id))
        }
    }

    pub(crate) fn holds_lock(&self, lock_id: usize) -> bool {
        self.state.lock().locks.contains_key(&lock_id)
    }

    /// Keep `guard` until the transaction ends.
    ///
    /// If the transaction ended while the lock was being acquired the guard
    /// is released immediately.
    pub(crate) fn hold_lock(&self, lock_id: usize, guard: OwnedMutexGuard<()>) -> StoreResult<()> {
        let mut state = self.state.lock();
        if state.status != TxStatus::Active {
            return Err(StoreFault::TransactionNotActive(self.id));
        }
        state.locks.insert(lock_id, guard);
        Ok(())
    }

    pub(crate) fn stage(&self, write: StagedWrite) -> StoreResult<()> {
        let mut state = self.state.lock();
        if state.status != TxStatus::Active {
            return Err(StoreFault::TransactionNotActive(self.id));
        }
        state.staged.push(write);
        Ok(())
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    fn id(&self) -> u64 {
        self.id
    }

    async fn commit(&self) -> StoreResult<()> {
        self.ensure_active()?;
        self.shared.check_open()?;
        self.shared.faults.check(FaultPoint::Commit)?;

        let (staged, locks) = {
            let mut state = self.state.lock();
            if state.status != TxStatus::Active {
                return Err(StoreFault::TransactionNotActive(self.id));
            }
            if !state.staged.is_empty() {
                self.shared.check_writable()?;
            }
            state.status = TxStatus::Committed;
            (
                std::mem::take(&mut state.staged),
                std::mem::take(&mut state.locks),
            )
        };

        {
            let _gate = self.shared.commit_gate.write();
            for write in staged {
                write();
            }
        }
        drop(locks);

        self.shared.record_commit();
        tracing::trace!(txn_id = self.id, "transaction committed");
        Ok(())
    }

    fn abort(&self) {
        let released = {
            let mut state = self.state.lock();
            if state.status != TxStatus::Active {
                return;
            }
            state.status = TxStatus::Aborted;
            state.staged.clear();
            std::mem::take(&mut state.locks)
        };
        drop(released);

        self.shared.record_abort();
        tracing::trace!(txn_id = self.id, "transaction aborted");
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        self.abort();
    }
}
