//! MemoryCollection: one named key/value collection of a MemoryStore
//!
//! Values are stored as `Arc<V>` and never mutated in place; an update
//! swaps in a new `Arc`. The `Arc` handed out by `try_get` therefore
//! identifies the exact stored instance, which is what `try_update`
//! compares against.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use playerdb_core::{Collection, LockMode, StoreFault, StoreKey, StoreResult, StoreValue};

use crate::faults::{FaultPoint, Injection};
use crate::memory::StoreShared;
use crate::transaction::MemoryTransaction;

type Entries<K, V> = Arc<RwLock<HashMap<K, Arc<V>>>>;

/// Typed collection inside a [`MemoryStore`](crate::MemoryStore)
pub struct MemoryCollection<K, V> {
    name: String,
    entries: Entries<K, V>,
    /// Per-key update locks; entries are never removed (keys are never deleted)
    locks: Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>,
    shared: Arc<StoreShared>,
}

impl<K, V> fmt::Debug for MemoryCollection<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCollection")
            .field("name", &self.name)
            .field("len", &self.entries.read().len())
            .finish()
    }
}

impl<K: StoreKey, V: StoreValue> MemoryCollection<K, V> {
    pub(crate) fn new(name: &str, shared: Arc<StoreShared>) -> Self {
        MemoryCollection {
            name: name.to_string(),
            entries: Arc::new(RwLock::new(HashMap::new())),
            locks: Mutex::new(HashMap::new()),
            shared,
        }
    }

    /// Committed value for `key`, outside of any transaction.
    pub fn peek(&self, key: &K) -> Option<Arc<V>> {
        let _gate = self.shared.commit_gate.read();
        self.entries.read().get(key).cloned()
    }

    /// Number of committed keys.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True if nothing has been committed.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn key_lock(&self, key: &K) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    /// Take the update lock on `key` for `tx`, waiting at most `timeout`.
    async fn lock_key(&self, tx: &MemoryTransaction, key: &K, timeout: Duration) -> StoreResult<()> {
        let lock = self.key_lock(key);
        let lock_id = Arc::as_ptr(&lock) as usize;
        if tx.holds_lock(lock_id) {
            return Ok(());
        }
        let guard = tokio::time::timeout(timeout, lock.lock_owned())
            .await
            .map_err(|_| StoreFault::Timeout)?;
        tx.hold_lock(lock_id, guard)
    }

    fn current(&self, key: &K) -> Option<Arc<V>> {
        self.entries.read().get(key).cloned()
    }

    fn stage_put(&self, tx: &MemoryTransaction, key: K, value: V) -> StoreResult<()> {
        let entries = Arc::clone(&self.entries);
        let value = Arc::new(value);
        tx.stage(Box::new(move || {
            entries.write().insert(key, value);
        }))
    }

    /// Checks shared by add and update, in the order the store applies them.
    fn write_preamble(&self, tx: &MemoryTransaction, point: FaultPoint) -> StoreResult<bool> {
        tx.ensure_active()?;
        self.shared.check_writable()?;
        match self.shared.faults.hit(point) {
            Some(Injection::Fail(fault)) => Err(fault),
            Some(Injection::Reject) => Ok(false),
            None => Ok(true),
        }
    }
}

#[async_trait]
impl<K: StoreKey, V: StoreValue> Collection<K, V> for MemoryCollection<K, V> {
    type Tx = MemoryTransaction;

    fn name(&self) -> &str {
        &self.name
    }

    async fn try_get(
        &self,
        tx: &MemoryTransaction,
        key: &K,
        lock: LockMode,
        timeout: Duration,
    ) -> StoreResult<Option<Arc<V>>> {
        tx.ensure_active()?;
        self.shared.check_readable()?;
        self.shared.faults.check(FaultPoint::Get)?;
        if lock == LockMode::Update {
            self.shared.check_writable()?;
            self.lock_key(tx, key, timeout).await?;
        }
        let _gate = self.shared.commit_gate.read();
        Ok(self.current(key))
    }

    async fn try_add(
        &self,
        tx: &MemoryTransaction,
        key: K,
        value: V,
        timeout: Duration,
    ) -> StoreResult<bool> {
        if !self.write_preamble(tx, FaultPoint::Add)? {
            return Ok(false);
        }
        self.lock_key(tx, &key, timeout).await?;
        if self.current(&key).is_some() {
            return Ok(false);
        }
        self.stage_put(tx, key, value)?;
        Ok(true)
    }

    async fn try_update(
        &self,
        tx: &MemoryTransaction,
        key: K,
        value: V,
        comparand: &Arc<V>,
        timeout: Duration,
    ) -> StoreResult<bool> {
        if !self.write_preamble(tx, FaultPoint::Update)? {
            return Ok(false);
        }
        self.lock_key(tx, &key, timeout).await?;
        match self.current(&key) {
            Some(stored) if Arc::ptr_eq(&stored, comparand) => {
                self.stage_put(tx, key, value)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
