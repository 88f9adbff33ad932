//! Addressing types for records and their partitions

use std::fmt;

/// Integer key addressing one `DataRecord` within a collection.
pub type EntityId = i32;

/// Opaque hash scoping a secure payload to one account/entity pairing.
///
/// The value is caller-supplied and never interpreted. `Debug` only
/// reports its length so hashes do not end up in logs.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecureHash(String);

impl SecureHash {
    /// Wrap a caller-supplied hash.
    pub fn new(hash: impl Into<String>) -> Self {
        SecureHash(hash.into())
    }

    /// The raw hash string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the hash in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the hash is the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecureHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureHash(<{} bytes>)", self.0.len())
    }
}

impl From<&str> for SecureHash {
    fn from(s: &str) -> Self {
        SecureHash::new(s)
    }
}

impl From<String> for SecureHash {
    fn from(s: String) -> Self {
        SecureHash(s)
    }
}

/// The part of a `DataRecord` a read or write targets.
///
/// The two partitions are independent: an operation on one never
/// observes or mutates the other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Shared data visible to any reader.
    Insecure,
    /// Data scoped to one secure hash.
    Secure(SecureHash),
}

impl Partition {
    /// Short label for log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Partition::Insecure => "insecure",
            Partition::Secure(_) => "secure",
        }
    }
}
