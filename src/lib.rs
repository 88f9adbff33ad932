//! playerdb - per-character record store client with optimistic concurrency
//!
//! Each entity id maps to one [`DataRecord`] with two independent partitions:
//! an insecure payload visible to every reader, and secure payloads keyed by
//! an opaque per-account hash. Writes are compare-and-set: the caller passes
//! the value it last read, and a write that would overwrite someone else's
//! change fails with [`Error::ConcurrencyViolation`] instead.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use playerdb::{CancellationToken, MemoryStore, PlayerDataReader, PlayerDataWriter,
//!                PlayerDatabase, PlayerDbConfig};
//!
//! let store = MemoryStore::new();
//! store.create_collection::<i32, playerdb::DataRecord<String>>("PlayerDatabase")?;
//! let db = PlayerDatabase::new(Arc::new(store), PlayerDbConfig::default())?;
//! let cancel = CancellationToken::new();
//!
//! db.write_insecure(7, &"level 3".to_string(), None, &cancel).await?;
//! let seen = db.get_insecure::<String>(7, &cancel).await?;
//! db.write_insecure(7, &"level 4".to_string(), seen.as_ref(), &cancel).await?;
//! ```
//!
//! # Architecture
//!
//! - `playerdb-core`: data model, errors, backing store traits
//! - `playerdb-storage`: in-process [`MemoryStore`]
//! - `playerdb-concurrency`: validation, merge, retry policy
//! - `playerdb-engine`: handles, controllers, [`PlayerDatabase`]

pub use playerdb_concurrency::{
    validate_expected, Backoff, MergeStep, PartitionWrite, PollSchedule, RetryPolicy,
};
pub use playerdb_core::{
    Collection, ConflictReason, DataRecord, EntityId, Error, LockMode, Partition, Payload,
    Result, SecureHash, StoreFault, StoreResult, Transaction, TransactionalStore,
};
pub use playerdb_engine::{
    CancellationToken, CollectionHandle, HandleRegistry, PlayerDataReader, PlayerDataWriter,
    PlayerDatabase, PlayerDbConfig, ReadController, TxGuard, WriteController,
};
pub use playerdb_storage::{
    FaultInjector, FaultPoint, MemoryCollection, MemoryStore, ReplicaRole, StoreStats,
};
