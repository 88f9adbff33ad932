//! Scoped transaction guard
//!
//! A store transaction must end in commit or abort on every exit path.
//! `TxGuard` aborts on drop unless `commit` succeeded, so early returns,
//! `?` and cancellation (which drops the pending future) all release it.

use playerdb_core::{StoreResult, Transaction};

/// Owns a transaction until it commits or is dropped
#[derive(Debug)]
pub struct TxGuard<T: Transaction> {
    tx: T,
    finished: bool,
}

impl<T: Transaction> TxGuard<T> {
    /// Guard a freshly begun transaction.
    pub fn new(tx: T) -> Self {
        TxGuard {
            tx,
            finished: false,
        }
    }

    /// The guarded transaction.
    pub fn tx(&self) -> &T {
        &self.tx
    }

    /// Commit. On failure the guard is dropped and the transaction aborted.
    pub async fn commit(mut self) -> StoreResult<()> {
        self.tx.commit().await?;
        self.finished = true;
        Ok(())
    }

    /// End without committing.
    pub fn abort(mut self) {
        self.tx.abort();
        self.finished = true;
    }
}

impl<T: Transaction> Drop for TxGuard<T> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::trace!(txn_id = self.tx.id(), "aborting unfinished transaction");
            self.tx.abort();
        }
    }
}
