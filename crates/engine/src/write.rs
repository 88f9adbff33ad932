//! WriteController: compare-and-set writes of player records
//!
//! One attempt:
//!
//! ```text
//! begin ─> read (update lock) ─> merge ─┬─ conflict ─────────> ConcurrencyViolation
//!                                       └─ next record ─> add / update
//!                                                          ├─ false ──> ConcurrencyViolation (lost race)
//!                                                          └─ true ───> commit ─> done
//! ```
//!
//! Timeouts on the read, the add/update or the commit abort the attempt and
//! are retried with backoff. A faulted write transaction means another
//! writer got in between, so it surfaces as a conflict. Conflicts are never
//! retried here; the caller re-reads and decides.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use playerdb_concurrency::{Backoff, MergeStep, PartitionWrite};
use playerdb_core::{
    Collection, ConflictReason, DataRecord, EntityId, Error, LockMode, Partition, Payload, Result,
    SecureHash, StoreFault, TransactionalStore,
};

use crate::cancel::{cancellable, ensure_live};
use crate::handle::{CollectionHandle, CollectionRef};
use crate::registry::HandleRegistry;
use crate::retry::{retry_transient, Attempt};

/// Writes payloads into player records
#[derive(Debug)]
pub struct WriteController<S: TransactionalStore> {
    registry: Arc<HandleRegistry<S>>,
    backoff: Arc<Backoff>,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl<S: TransactionalStore> WriteController<S> {
    /// Controller writing through `registry`.
    ///
    /// `read_timeout` bounds the update-intent read, `write_timeout` the
    /// add or update.
    pub fn new(
        registry: Arc<HandleRegistry<S>>,
        backoff: Arc<Backoff>,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Self {
        WriteController {
            registry,
            backoff,
            read_timeout,
            write_timeout,
        }
    }

    /// Set the insecure payload of entity `id` to a copy of `new_value`,
    /// provided it currently holds `expected`.
    pub async fn write_insecure<T: Payload>(
        &self,
        id: EntityId,
        new_value: &T,
        expected: Option<&T>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let partition = Partition::Insecure;
        self.write(id, &PartitionWrite::new(&partition, new_value, expected), cancel)
            .await
    }

    /// Set the payload under `hash` in entity `id`'s secure partition to a
    /// copy of `new_value`, provided it currently holds `expected`.
    pub async fn write_secure<T: Payload>(
        &self,
        id: EntityId,
        hash: &SecureHash,
        new_value: &T,
        expected: Option<&T>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let partition = Partition::Secure(hash.clone());
        self.write(id, &PartitionWrite::new(&partition, new_value, expected), cancel)
            .await
    }

    /// Run the merge-validate-apply loop for `merge` on entity `id`.
    ///
    /// # Errors
    ///
    /// - `ConcurrencyViolation` if `merge` rejects the stored record or a
    ///   concurrent writer won
    /// - `Timeout` once every attempt hit a store timeout
    /// - `NotWritable` on a replica without write authority
    /// - `NotAvailable` / `IncompatiblePayload` from opening the collection
    /// - `Cancelled` (nothing is committed)
    /// - any other store fault, unchanged
    pub async fn write<T: Payload, M: MergeStep<T>>(
        &self,
        id: EntityId,
        merge: &M,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let handle = self.registry.resolve::<EntityId, DataRecord<T>>()?;
        let collection = handle.open(cancel).await?;

        let handle = &handle;
        let collection = &collection;
        retry_transient(&self.backoff, cancel, "write", move |_| async move {
            self.write_once(handle, collection, id, merge, cancel).await
        })
        .await?;

        debug!(id, "record written");
        Ok(())
    }

    async fn write_once<T: Payload, M: MergeStep<T>>(
        &self,
        handle: &CollectionHandle<S, EntityId, DataRecord<T>>,
        collection: &CollectionRef<S, EntityId, DataRecord<T>>,
        id: EntityId,
        merge: &M,
        cancel: &CancellationToken,
    ) -> Result<Attempt<()>> {
        let tx = handle.begin_transaction()?;

        let read = collection.try_get(tx.tx(), &id, LockMode::Update, self.read_timeout);
        let current = match cancellable(cancel, read).await? {
            Ok(current) => current,
            Err(fault) => return write_fault(id, fault),
        };

        let next = merge
            .merge(current.as_deref())
            .map_err(|reason| Error::conflict(id, reason))?;

        let applied = match &current {
            Some(comparand) => {
                let update = collection.try_update(tx.tx(), id, next, comparand, self.write_timeout);
                cancellable(cancel, update).await?
            }
            None => {
                let add = collection.try_add(tx.tx(), id, next, self.write_timeout);
                cancellable(cancel, add).await?
            }
        };
        match applied {
            Ok(true) => {}
            Ok(false) => return Err(Error::conflict(id, ConflictReason::LostRace)),
            Err(fault) => return write_fault(id, fault),
        }

        // Last chance to back out; once commit starts it runs to completion
        ensure_live(cancel)?;
        match tx.commit().await {
            Ok(()) => Ok(Attempt::Done(())),
            Err(fault) => write_fault(id, fault),
        }
    }
}

/// Classify a store fault raised inside a write attempt.
fn write_fault<T>(id: EntityId, fault: StoreFault) -> Result<Attempt<T>> {
    match fault {
        StoreFault::Timeout => Ok(Attempt::Transient(fault)),
        StoreFault::TransactionFaulted => Err(Error::conflict(id, ConflictReason::TransactionFaulted)),
        other => Err(other.into()),
    }
}
