//! Per-entity record holding the insecure and secure partitions
//!
//! A `DataRecord` is created implicitly by the first successful write to
//! either partition and is never deleted. The store owns the persisted
//! instance; callers only ever see deep copies of its payloads.

use std::collections::HashMap;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::types::{Partition, SecureHash};

/// Capability set a payload type must provide.
///
/// The contracts are carried by the supertraits rather than by overridable
/// methods: `PartialEq` is the equality used for conflict detection and
/// `Clone` must produce a deep copy that shares no mutable state with the
/// original. Owned Rust data satisfies that by construction; a payload
/// holding shared interior state (such as `Arc<Mutex<_>>`) must
/// implement `Clone` by hand so that it copies the inner value.
pub trait Payload: Clone + PartialEq + Debug + Send + Sync + 'static {}

impl<T> Payload for T where T: Clone + PartialEq + Debug + Send + Sync + 'static {}

/// The value stored per entity id.
///
/// A record with no insecure payload and no secure entries reads the same
/// as an absent key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct DataRecord<T> {
    /// Shared data visible to any reader regardless of account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    insecure: Option<T>,
    /// Data scoped to one account/entity pairing, keyed by secure hash
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    secure: HashMap<String, T>,
}

impl<T> Default for DataRecord<T> {
    fn default() -> Self {
        DataRecord {
            insecure: None,
            secure: HashMap::new(),
        }
    }
}

impl<T: Payload> DataRecord<T> {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// The insecure payload, if any.
    pub fn insecure(&self) -> Option<&T> {
        self.insecure.as_ref()
    }

    /// The secure payload stored under `hash`, if any.
    pub fn secure(&self, hash: &SecureHash) -> Option<&T> {
        self.secure.get(hash.as_str())
    }

    /// The payload held by `partition`, if any.
    pub fn payload(&self, partition: &Partition) -> Option<&T> {
        match partition {
            Partition::Insecure => self.insecure(),
            Partition::Secure(hash) => self.secure(hash),
        }
    }

    /// Deep copy of the payload held by `partition`.
    ///
    /// This is the only way payloads leave a stored record.
    pub fn copy_payload(&self, partition: &Partition) -> Option<T> {
        self.payload(partition).cloned()
    }

    /// Store a deep copy of `value` into `partition`, leaving the other
    /// partition untouched.
    pub fn set_payload(&mut self, partition: &Partition, value: &T) {
        let value = value.clone();
        match partition {
            Partition::Insecure => self.insecure = Some(value),
            Partition::Secure(hash) => {
                self.secure.insert(hash.as_str().to_string(), value);
            }
        }
    }

    /// Deep copy of the whole record.
    pub fn deep_copy(&self) -> Self {
        DataRecord {
            insecure: self.insecure.clone(),
            secure: self.secure.clone(),
        }
    }

    /// Number of secure entries.
    pub fn secure_len(&self) -> usize {
        self.secure.len()
    }

    /// True if neither partition holds data.
    pub fn is_empty(&self) -> bool {
        self.insecure.is_none() && self.secure.is_empty()
    }
}
