//! MemoryStore: in-process backing transactional store
//!
//! # Design Notes
//!
//! - **Typed collections by name**: each name maps to exactly one
//!   `MemoryCollection<K, V>`, stored type-erased and downcast on lookup.
//!   Asking for a name with other types is an `IncompatibleType` fault.
//! - **Update locks**: a per-key async mutex, acquired with a timeout by
//!   update-intent reads and by add/update, held until the transaction ends.
//! - **Staged writes**: add/update only stage a closure; commit applies all
//!   of a transaction's closures under the commit gate, so readers never
//!   observe half of a commit.
//! - **No deletes**: records live until the store is dropped.

use std::any::{type_name, Any};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;

use playerdb_core::{StoreFault, StoreKey, StoreResult, StoreValue, TransactionalStore};

use crate::collection::MemoryCollection;
use crate::faults::{FaultInjector, FaultPoint};
use crate::transaction::MemoryTransaction;

/// Role of the replica this store stands in for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicaRole {
    /// Reads and writes allowed
    Primary,
    /// Reads allowed; update locks, writes and commits of writes refused
    Secondary,
}

/// Transaction lifecycle counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Transactions opened
    pub begun: u64,
    /// Transactions committed
    pub committed: u64,
    /// Transactions aborted (explicitly or by drop)
    pub aborted: u64,
}

impl StoreStats {
    /// Transactions opened but not yet ended.
    pub fn open(&self) -> u64 {
        self.begun - self.committed - self.aborted
    }
}

#[derive(Debug)]
struct Health {
    role: ReplicaRole,
    readable: bool,
    closed: bool,
}

/// State shared by the store, its collections and its transactions
#[derive(Debug)]
pub(crate) struct StoreShared {
    health: RwLock<Health>,
    /// Held for writing while a commit applies its staged writes
    pub(crate) commit_gate: RwLock<()>,
    pub(crate) faults: FaultInjector,
    next_txn_id: AtomicU64,
    begun: AtomicU64,
    committed: AtomicU64,
    aborted: AtomicU64,
}

impl StoreShared {
    pub(crate) fn check_open(&self) -> StoreResult<()> {
        if self.health.read().closed {
            return Err(StoreFault::Closed);
        }
        Ok(())
    }

    pub(crate) fn check_readable(&self) -> StoreResult<()> {
        let health = self.health.read();
        if health.closed {
            return Err(StoreFault::Closed);
        }
        if !health.readable {
            return Err(StoreFault::NotReadable);
        }
        Ok(())
    }

    pub(crate) fn check_writable(&self) -> StoreResult<()> {
        let health = self.health.read();
        if health.closed {
            return Err(StoreFault::Closed);
        }
        if health.role != ReplicaRole::Primary {
            return Err(StoreFault::NotPrimary);
        }
        Ok(())
    }

    pub(crate) fn record_commit(&self) {
        self.committed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_abort(&self) {
        self.aborted.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-process transactional store with named, typed collections
///
/// Cloning a `MemoryStore` yields another handle onto the same data.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    shared: Arc<StoreShared>,
    collections: Arc<DashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty primary store
    pub fn new() -> Self {
        MemoryStore {
            shared: Arc::new(StoreShared {
                health: RwLock::new(Health {
                    role: ReplicaRole::Primary,
                    readable: true,
                    closed: false,
                }),
                commit_gate: RwLock::new(()),
                faults: FaultInjector::new(),
                next_txn_id: AtomicU64::new(1),
                begun: AtomicU64::new(0),
                committed: AtomicU64::new(0),
                aborted: AtomicU64::new(0),
            }),
            collections: Arc::new(DashMap::new()),
        }
    }

    /// Get or create the collection `name` holding `K -> V`.
    ///
    /// This is the provisioning side of the store; clients only look
    /// collections up through `try_get_collection`.
    ///
    /// # Errors
    ///
    /// `IncompatibleType` if `name` already holds other types, `Closed`
    /// if the store is closed.
    pub fn create_collection<K: StoreKey, V: StoreValue>(
        &self,
        name: &str,
    ) -> StoreResult<Arc<MemoryCollection<K, V>>> {
        self.shared.check_open()?;
        let erased = {
            let entry = self
                .collections
                .entry(name.to_string())
                .or_insert_with(|| {
                    tracing::debug!(collection = name, "created collection");
                    Arc::new(MemoryCollection::<K, V>::new(name, Arc::clone(&self.shared)))
                        as Arc<dyn Any + Send + Sync>
                });
            Arc::clone(entry.value())
        };
        Self::downcast(name, erased)
    }

    fn downcast<K: StoreKey, V: StoreValue>(
        name: &str,
        erased: Arc<dyn Any + Send + Sync>,
    ) -> StoreResult<Arc<MemoryCollection<K, V>>> {
        erased
            .downcast::<MemoryCollection<K, V>>()
            .map_err(|_| StoreFault::IncompatibleType {
                collection: name.to_string(),
                requested: type_name::<V>(),
            })
    }

    /// Fault injector consulted by every store operation.
    pub fn faults(&self) -> &FaultInjector {
        &self.shared.faults
    }

    /// Snapshot of transaction counters.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            begun: self.shared.begun.load(Ordering::SeqCst),
            committed: self.shared.committed.load(Ordering::SeqCst),
            aborted: self.shared.aborted.load(Ordering::SeqCst),
        }
    }

    /// Switch between primary and secondary.
    pub fn set_role(&self, role: ReplicaRole) {
        tracing::info!(?role, "replica role changed");
        self.shared.health.write().role = role;
    }

    /// Make the store refuse (or accept again) reads.
    pub fn set_readable(&self, readable: bool) {
        self.shared.health.write().readable = readable;
    }

    /// Close the store. Every later operation fails with `Closed`.
    pub fn close(&self) {
        self.shared.health.write().closed = true;
    }
}

#[async_trait]
impl TransactionalStore for MemoryStore {
    type Tx = MemoryTransaction;
    type Collection<K: StoreKey, V: StoreValue> = MemoryCollection<K, V>;

    async fn try_get_collection<K: StoreKey, V: StoreValue>(
        &self,
        name: &str,
    ) -> StoreResult<Option<Arc<MemoryCollection<K, V>>>> {
        self.shared.check_readable()?;
        self.shared.faults.check(FaultPoint::OpenCollection)?;
        let erased = match self.collections.get(name) {
            Some(entry) => Arc::clone(entry.value()),
            None => return Ok(None),
        };
        Self::downcast(name, erased).map(Some)
    }

    fn begin_transaction(&self) -> StoreResult<MemoryTransaction> {
        self.shared.check_open()?;
        let id = self.shared.next_txn_id.fetch_add(1, Ordering::SeqCst);
        self.shared.begun.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryTransaction::new(id, Arc::clone(&self.shared)))
    }
}
