//! ReadController: typed point reads of player records
//!
//! Each attempt opens a transaction, reads the record under a shared lock
//! and releases the transaction. A missing record, an empty record and a
//! missing secure hash all read as `None`. Store timeouts and faulted
//! transactions are retried; every other fault is returned on the spot.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use playerdb_concurrency::Backoff;
use playerdb_core::{
    Collection, DataRecord, EntityId, LockMode, Partition, Payload, Result, SecureHash,
    TransactionalStore,
};

use crate::cancel::cancellable;
use crate::handle::{CollectionHandle, CollectionRef};
use crate::registry::HandleRegistry;
use crate::retry::{retry_transient, Attempt};

/// Reads payloads out of player records
#[derive(Debug)]
pub struct ReadController<S: TransactionalStore> {
    registry: Arc<HandleRegistry<S>>,
    backoff: Arc<Backoff>,
    timeout: Duration,
}

impl<S: TransactionalStore> ReadController<S> {
    /// Controller reading through `registry`, waiting at most `timeout`
    /// per attempt.
    pub fn new(registry: Arc<HandleRegistry<S>>, backoff: Arc<Backoff>, timeout: Duration) -> Self {
        ReadController {
            registry,
            backoff,
            timeout,
        }
    }

    /// The insecure payload of entity `id`, if any.
    pub async fn get_insecure<T: Payload>(
        &self,
        id: EntityId,
        cancel: &CancellationToken,
    ) -> Result<Option<T>> {
        self.get(id, &Partition::Insecure, cancel).await
    }

    /// The payload stored for `hash` in entity `id`'s secure partition, if any.
    pub async fn get_secure<T: Payload>(
        &self,
        id: EntityId,
        hash: &SecureHash,
        cancel: &CancellationToken,
    ) -> Result<Option<T>> {
        self.get(id, &Partition::Secure(hash.clone()), cancel).await
    }

    /// A copy of the payload in `partition` of entity `id`'s record.
    ///
    /// # Errors
    ///
    /// - `Timeout` once every attempt hit a transient fault
    /// - `NotAvailable` / `IncompatiblePayload` from opening the collection
    /// - `Cancelled`
    /// - any other store fault, unchanged
    pub async fn get<T: Payload>(
        &self,
        id: EntityId,
        partition: &Partition,
        cancel: &CancellationToken,
    ) -> Result<Option<T>> {
        let handle = self.registry.resolve::<EntityId, DataRecord<T>>()?;
        let collection = handle.open(cancel).await?;

        let handle = &handle;
        let collection = &collection;
        retry_transient(&self.backoff, cancel, "read", move |_| async move {
            self.read_once(handle, collection, id, partition, cancel).await
        })
        .await
    }

    async fn read_once<T: Payload>(
        &self,
        handle: &CollectionHandle<S, EntityId, DataRecord<T>>,
        collection: &CollectionRef<S, EntityId, DataRecord<T>>,
        id: EntityId,
        partition: &Partition,
        cancel: &CancellationToken,
    ) -> Result<Attempt<Option<T>>> {
        let tx = handle.begin_transaction()?;
        let read = collection.try_get(tx.tx(), &id, LockMode::Default, self.timeout);
        match cancellable(cancel, read).await? {
            Ok(record) => {
                tx.abort();
                Ok(Attempt::Done(
                    record.and_then(|record| record.copy_payload(partition)),
                ))
            }
            Err(fault) if fault.is_transient() => Ok(Attempt::Transient(fault)),
            Err(fault) => Err(fault.into()),
        }
    }
}
