//! Core types and traits for playerdb
//!
//! This crate defines the foundational types used throughout the system:
//! - EntityId / SecureHash: how a record and its secure entries are addressed
//! - Partition: the insecure payload or one secure-hash entry of a record
//! - DataRecord: the per-entity value holding both partitions
//! - Payload: the capability set (equality, deep-copying Clone) a payload must offer
//! - Error / StoreFault / ConflictReason: error taxonomy
//! - Traits: the backing transactional store contract (TransactionalStore,
//!   Collection, Transaction)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod record;
pub mod traits;
pub mod types;

pub use error::{ConflictReason, Error, Result, StoreFault, StoreResult};
pub use record::{DataRecord, Payload};
pub use traits::{Collection, LockMode, StoreKey, StoreValue, Transaction, TransactionalStore};
pub use types::{EntityId, Partition, SecureHash};
