//! Engine for playerdb
//!
//! This crate ties the store-independent pieces together:
//! - Collection handles: lazy, cached, polled opening of the record collection
//! - Handle registry: one handle per typed pairing
//! - Read controller: retried point reads
//! - Write controller: merge-validate-apply with retry of transient faults
//! - PlayerDatabase: the reader/writer contracts over a backing store
//!
//! The engine is the only component that knows about:
//! - Transaction lifecycle (begin, commit, abort on every other exit)
//! - Cancellation
//! - Timeouts and backoff waits

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cancel;
pub mod config;
pub mod handle;
pub mod read;
pub mod registry;
mod retry;
pub mod service;
pub mod transaction;
pub mod write;

pub use config::{PlayerDbConfig, CONFIG_FILE_NAME, DEFAULT_COLLECTION_NAME};
pub use handle::{CollectionHandle, CollectionRef};
pub use read::ReadController;
pub use registry::HandleRegistry;
pub use service::{PlayerDataReader, PlayerDataWriter, PlayerDatabase};
pub use transaction::TxGuard;
pub use write::WriteController;

pub use tokio_util::sync::CancellationToken;
