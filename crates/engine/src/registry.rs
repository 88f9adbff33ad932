//! HandleRegistry: one CollectionHandle per (key type, value type)
//!
//! All handles of a registry point at the same collection name. Requests
//! for the same typed pairing share one handle, and therefore one cached
//! open, even when they race on first use.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use playerdb_concurrency::PollSchedule;
use playerdb_core::{Error, Result, StoreKey, StoreValue, TransactionalStore};

use crate::handle::CollectionHandle;

type ErasedHandle = Arc<dyn Any + Send + Sync>;

/// Memoizes typed handles onto a single named collection
pub struct HandleRegistry<S: TransactionalStore> {
    store: Arc<S>,
    collection_name: String,
    schedule: PollSchedule,
    handles: DashMap<(TypeId, TypeId), ErasedHandle>,
}

impl<S: TransactionalStore> fmt::Debug for HandleRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("collection_name", &self.collection_name)
            .field("handles", &self.handles.len())
            .finish()
    }
}

impl<S: TransactionalStore> HandleRegistry<S> {
    /// Registry over `collection_name` in `store`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `collection_name` is empty or whitespace.
    pub fn new(store: Arc<S>, collection_name: impl Into<String>, schedule: PollSchedule) -> Result<Self> {
        let collection_name = collection_name.into();
        if collection_name.trim().is_empty() {
            return Err(Error::invalid_input("collection name must not be blank"));
        }
        Ok(HandleRegistry {
            store,
            collection_name,
            schedule,
            handles: DashMap::new(),
        })
    }

    /// Name of the collection every handle resolves.
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Number of distinct typed handles created so far.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// True if no handle has been requested yet.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// The handle for `K -> V`, created on first request.
    pub fn resolve<K: StoreKey, V: StoreValue>(&self) -> Result<Arc<CollectionHandle<S, K, V>>> {
        let key = (TypeId::of::<K>(), TypeId::of::<V>());
        let erased = {
            let entry = self.handles.entry(key).or_insert_with(|| {
                tracing::debug!(
                    collection = %self.collection_name,
                    key = type_name::<K>(),
                    value = type_name::<V>(),
                    "created collection handle"
                );
                Arc::new(CollectionHandle::<S, K, V>::new(
                    Arc::clone(&self.store),
                    self.collection_name.clone(),
                    self.schedule.clone(),
                )) as ErasedHandle
            });
            Arc::clone(entry.value())
        };
        erased
            .downcast::<CollectionHandle<S, K, V>>()
            .map_err(|_| Error::IncompatiblePayload {
                collection: self.collection_name.clone(),
                requested: type_name::<V>(),
            })
    }
}
