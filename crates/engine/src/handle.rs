//! CollectionHandle: lazily opened, cached reference to a named collection
//!
//! The backing store may not have created the collection yet when the
//! first request arrives (for example while a replica is still coming up).
//! `open` therefore polls with a fixed schedule of growing waits before
//! giving up with `NotAvailable`. A successful open is cached for the
//! lifetime of the handle; a failed or cancelled one caches nothing, so the
//! next caller polls again.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use playerdb_concurrency::PollSchedule;
use playerdb_core::{Error, Result, StoreFault, StoreKey, StoreValue, TransactionalStore};

use crate::cancel::{cancellable, ensure_live, sleep};
use crate::transaction::TxGuard;

/// Collection type served by a handle
pub type CollectionRef<S, K, V> = Arc<<S as TransactionalStore>::Collection<K, V>>;

/// Handle on the collection `name` of `store`, typed `K -> V`
pub struct CollectionHandle<S: TransactionalStore, K: StoreKey, V: StoreValue> {
    store: Arc<S>,
    name: String,
    schedule: PollSchedule,
    opened: OnceCell<CollectionRef<S, K, V>>,
    _types: PhantomData<fn() -> (K, V)>,
}

impl<S: TransactionalStore, K: StoreKey, V: StoreValue> fmt::Debug for CollectionHandle<S, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionHandle")
            .field("name", &self.name)
            .field("opened", &self.opened.initialized())
            .finish()
    }
}

impl<S: TransactionalStore, K: StoreKey, V: StoreValue> CollectionHandle<S, K, V> {
    /// Handle that polls `store` for `name` according to `schedule`.
    pub fn new(store: Arc<S>, name: impl Into<String>, schedule: PollSchedule) -> Self {
        CollectionHandle {
            store,
            name: name.into(),
            schedule,
            opened: OnceCell::new(),
            _types: PhantomData,
        }
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once a previous `open` succeeded.
    pub fn is_open(&self) -> bool {
        self.opened.initialized()
    }

    /// Resolve the collection, polling the store on first use.
    ///
    /// Concurrent first callers share a single poll sequence. A caller
    /// waiting on someone else's poll still returns as soon as its own
    /// `cancel` fires.
    ///
    /// # Errors
    ///
    /// - `NotAvailable` once every poll found nothing
    /// - `Cancelled` if `cancel` fires before a poll or during a wait
    /// - `IncompatiblePayload` if the collection holds other types
    /// - any other store fault, unchanged
    pub async fn open(&self, cancel: &CancellationToken) -> Result<CollectionRef<S, K, V>> {
        if let Some(collection) = self.opened.get() {
            return Ok(Arc::clone(collection));
        }
        let init = self.opened.get_or_try_init(|| self.poll(cancel));
        let collection = cancellable(cancel, init).await??;
        Ok(Arc::clone(collection))
    }

    async fn poll(&self, cancel: &CancellationToken) -> Result<CollectionRef<S, K, V>> {
        let mut waits = self.schedule.waits().iter();
        let mut polls = 0usize;
        loop {
            ensure_live(cancel)?;
            polls += 1;
            let lookup = self.store.try_get_collection::<K, V>(&self.name);
            match cancellable(cancel, lookup).await? {
                Ok(Some(collection)) => {
                    info!(collection = %self.name, polls, "opened collection");
                    return Ok(collection);
                }
                Ok(None) => {
                    debug!(collection = %self.name, poll = polls, "collection not created yet");
                }
                Err(StoreFault::NotReadable) => {
                    debug!(collection = %self.name, poll = polls, "store not readable");
                }
                Err(fault) => return Err(fault.into()),
            }

            match waits.next() {
                Some(wait) => sleep(cancel, *wait).await?,
                None => break,
            }
        }

        warn!(collection = %self.name, polls, "collection did not become available");
        Err(Error::NotAvailable {
            collection: self.name.clone(),
        })
    }

    /// Begin a transaction on the backing store.
    ///
    /// The returned guard aborts the transaction if dropped uncommitted.
    pub fn begin_transaction(&self) -> Result<TxGuard<S::Tx>> {
        Ok(TxGuard::new(self.store.begin_transaction()?))
    }
}
