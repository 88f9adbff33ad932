//! Concurrency layer for playerdb
//!
//! This crate holds the store-independent pieces of optimistic concurrency
//! control used by the write and read controllers:
//! - Validation: compare an expected previous payload with the stored one
//! - Merge: build the next record from the current one for one partition
//! - Backoff: attempt budget and jittered exponential delays for transient
//!   store faults, plus the fixed poll schedule for opening collections
//!
//! Nothing here performs I/O or sleeps; delays are computed and handed
//! back to the caller, which owns the suspension.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backoff;
pub mod merge;
pub mod validation;

pub use backoff::{Backoff, PollSchedule, RetryPolicy};
pub use merge::{MergeStep, PartitionWrite};
pub use validation::validate_expected;
