//! Storage layer for playerdb
//!
//! This crate implements an in-process backing store satisfying the
//! `TransactionalStore` contract from `playerdb-core`:
//! - MemoryStore: named, typed collections registered in a DashMap
//! - MemoryCollection: HashMap of `Arc<V>` behind a parking_lot RwLock,
//!   with per-key update locks held until commit/abort
//! - MemoryTransaction: staged writes applied atomically on commit
//! - FaultInjector: scripted store faults for exercising retry paths
//!
//! # Replica Role
//!
//! The store can be switched to a secondary role, made unreadable, or
//! closed, so every failure signal a replicated store can raise is
//! reachable without a cluster.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod faults;
pub mod memory;
pub mod transaction;

pub use collection::MemoryCollection;
pub use faults::{FaultInjector, FaultPoint, Injection};
pub use memory::{MemoryStore, ReplicaRole, StoreStats};
pub use transaction::MemoryTransaction;
