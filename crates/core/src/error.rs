//! Error types for playerdb
//!
//! Two layers of errors live here:
//! - [`StoreFault`]: failure signals raised by the backing transactional store
//! - [`Error`]: what the read/write controllers surface to their callers
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! | Category | Variants | Retried locally |
//! |----------|----------|-----------------|
//! | Availability | `NotAvailable` | no (poll schedule already spent) |
//! | Transient | `Timeout` | yes, surfaced once the attempt budget is spent |
//! | Conflict | `ConcurrencyViolation` | never |
//! | Data | `IncompatiblePayload` | never |
//! | Role | `NotWritable` | never |
//! | Caller | `Cancelled`, `InvalidInput`, `Config` | never |
//! | Passthrough | `Store` | never |

use std::fmt;

use thiserror::Error;

use crate::types::EntityId;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreFault>;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure signals raised by the backing transactional store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreFault {
    /// The replica cannot serve reads (e.g. quorum loss)
    #[error("store is not readable")]
    NotReadable,

    /// A lock or operation did not complete within its timeout
    #[error("store operation timed out")]
    Timeout,

    /// The transaction was faulted by the store and cannot continue
    #[error("transaction faulted")]
    TransactionFaulted,

    /// The replica has no write authority
    #[error("replica is not primary")]
    NotPrimary,

    /// The store is closed and must not be used
    #[error("store is closed")]
    Closed,

    /// The named collection exists but holds other key/value types
    #[error("collection {collection} does not hold {requested}")]
    IncompatibleType {
        /// Collection name
        collection: String,
        /// Type name of the requested value type
        requested: &'static str,
    },

    /// The transaction was already committed or aborted
    #[error("transaction {0} is not active")]
    TransactionNotActive(u64),
}

impl StoreFault {
    /// Faults worth another attempt after a backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreFault::Timeout | StoreFault::TransactionFaulted)
    }
}

/// Why a write was rejected as a concurrency violation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    /// The caller expected a previous value to exist (or not) and the store disagrees
    ExistenceMismatch {
        /// Whether the caller supplied an expected previous value
        expected_present: bool,
        /// Whether the store held a value for the partition
        found_present: bool,
    },
    /// Both sides hold a value, but they are not equal
    ValueMismatch,
    /// The atomic add/update lost against another commit
    LostRace,
    /// The store faulted the write transaction
    TransactionFaulted,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictReason::ExistenceMismatch {
                expected_present,
                found_present,
            } => write!(
                f,
                "expected previous value {}, found {}",
                if *expected_present { "present" } else { "absent" },
                if *found_present { "present" } else { "absent" },
            ),
            ConflictReason::ValueMismatch => write!(f, "previous value does not match"),
            ConflictReason::LostRace => write!(f, "a concurrent write committed first"),
            ConflictReason::TransactionFaulted => write!(f, "write transaction faulted"),
        }
    }
}

/// Errors surfaced by the read and write controllers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The named collection never became available during polling
    #[error("collection {collection} is not available")]
    NotAvailable {
        /// Collection name
        collection: String,
    },

    /// Every attempt hit a transient store fault
    #[error("store operation timed out after {attempts} attempts")]
    Timeout {
        /// Attempts made before giving up
        attempts: u32,
        /// Fault raised by the final attempt
        #[source]
        last: StoreFault,
    },

    /// The expected previous value did not match, or another writer won
    #[error("concurrency violation on entity {id}: {reason}")]
    ConcurrencyViolation {
        /// Entity whose record was being written
        id: EntityId,
        /// What did not match
        reason: ConflictReason,
    },

    /// The collection cannot serve the requested payload type
    #[error("collection {collection} cannot serve payload type {requested}")]
    IncompatiblePayload {
        /// Collection name
        collection: String,
        /// Type name of the requested value type
        requested: &'static str,
    },

    /// The replica has no write authority
    #[error("replica does not have write authority")]
    NotWritable,

    /// The caller cancelled the operation; nothing was committed
    #[error("operation cancelled")]
    Cancelled,

    /// Any other store fault, passed through unchanged
    #[error("store error: {0}")]
    Store(StoreFault),

    /// Invalid argument at construction time
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// What was wrong
        reason: String,
    },

    /// Invalid or unreadable configuration
    #[error("configuration error: {reason}")]
    Config {
        /// What was wrong
        reason: String,
    },
}

impl Error {
    /// Create a concurrency violation for `id`.
    pub fn conflict(id: EntityId, reason: ConflictReason) -> Self {
        Error::ConcurrencyViolation { id, reason }
    }

    /// Create a configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        Error::Config {
            reason: reason.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            reason: reason.into(),
        }
    }

    /// True for `ConcurrencyViolation`.
    ///
    /// The caller is expected to re-read and decide whether to write again.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::ConcurrencyViolation { .. })
    }

    /// True for `Timeout`.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// True if the same call may succeed later without the caller changing
    /// anything: exhausted retries, an unavailable collection, or a
    /// transient store fault.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout { .. } | Error::NotAvailable { .. } => true,
            Error::Store(fault) => fault.is_transient(),
            _ => false,
        }
    }

    /// True for `Cancelled`.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// The conflict reason, if this is a concurrency violation.
    pub fn conflict_reason(&self) -> Option<ConflictReason> {
        match self {
            Error::ConcurrencyViolation { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

impl From<StoreFault> for Error {
    fn from(fault: StoreFault) -> Self {
        match fault {
            StoreFault::NotPrimary => Error::NotWritable,
            StoreFault::IncompatibleType {
                collection,
                requested,
            } => Error::IncompatiblePayload {
                collection,
                requested,
            },
            other => Error::Store(other),
        }
    }
}
