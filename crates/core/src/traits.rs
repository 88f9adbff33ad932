//! Backing transactional store abstraction
//!
//! The read and write controllers only need a small contract from the
//! store that actually holds the data: named collections of typed
//! key/value pairs, and isolated transactions over them. This module
//! defines that contract so the replication engine behind it can be
//! swapped without touching the controllers.
//!
//! Thread safety: all implementations must be safe to call concurrently
//! from multiple tasks (requires Send + Sync).

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreResult;

/// Bounds required of a collection key.
pub trait StoreKey: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

impl<T> StoreKey for T where T: Eq + Hash + Clone + Debug + Send + Sync + 'static {}

/// Bounds required of a collection value.
pub trait StoreValue: Send + Sync + 'static {}

impl<T> StoreValue for T where T: Send + Sync + 'static {}

/// Lock taken by a point read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Non-exclusive read; never blocks on other readers or writers
    Default,
    /// Update intent; exclusive against other update-intent holders and
    /// held until the transaction commits or aborts
    Update,
}

/// An isolated unit of work against the store.
///
/// A transaction must end in exactly one `commit` or `abort`. Writes
/// staged through a [`Collection`] become visible only on commit.
#[async_trait]
pub trait Transaction: Send + Sync {
    /// Store-assigned transaction id (for logs)
    fn id(&self) -> u64;

    /// Apply every staged write atomically and release held locks.
    ///
    /// # Errors
    ///
    /// `Timeout`, `NotPrimary`, `Closed`, or `TransactionNotActive` if the
    /// transaction already ended.
    async fn commit(&self) -> StoreResult<()>;

    /// Discard staged writes and release held locks. Idempotent.
    fn abort(&self);
}

/// A named collection mapping keys to values.
///
/// Values are handed out as `Arc<V>`; the `Arc` returned by `try_get` is the
/// identity used as the comparand of `try_update`.
#[async_trait]
pub trait Collection<K: StoreKey, V: StoreValue>: Send + Sync {
    /// Transaction type accepted by this collection
    type Tx: Transaction;

    /// Collection name
    fn name(&self) -> &str;

    /// Point read under `lock`, waiting at most `timeout` for the lock.
    ///
    /// Returns None if the key is absent.
    async fn try_get(
        &self,
        tx: &Self::Tx,
        key: &K,
        lock: LockMode,
        timeout: Duration,
    ) -> StoreResult<Option<Arc<V>>>;

    /// Stage an insert. Returns false if the key already exists.
    async fn try_add(&self, tx: &Self::Tx, key: K, value: V, timeout: Duration)
        -> StoreResult<bool>;

    /// Stage a replacement that only applies if the stored value is still
    /// the `comparand` instance. Returns false otherwise.
    async fn try_update(
        &self,
        tx: &Self::Tx,
        key: K,
        value: V,
        comparand: &Arc<V>,
        timeout: Duration,
    ) -> StoreResult<bool>;
}

/// The backing transactional store.
#[async_trait]
pub trait TransactionalStore: Send + Sync + 'static {
    /// Transaction type
    type Tx: Transaction + 'static;

    /// Typed collection type
    type Collection<K: StoreKey, V: StoreValue>: Collection<K, V, Tx = Self::Tx> + 'static;

    /// Look up a named collection. Idempotent and safe to poll.
    ///
    /// Returns None while the collection does not exist yet.
    ///
    /// # Errors
    ///
    /// `IncompatibleType` if the collection holds other types, `NotReadable`
    /// or `Closed` if the store cannot answer.
    async fn try_get_collection<K: StoreKey, V: StoreValue>(
        &self,
        name: &str,
    ) -> StoreResult<Option<Arc<Self::Collection<K, V>>>>;

    /// Open a new isolated transaction.
    ///
    /// # Errors
    ///
    /// `Closed` if the store has been shut down.
    fn begin_transaction(&self) -> StoreResult<Self::Tx>;
}
