//! Merge step of the write loop
//!
//! Given the record currently stored for an entity (or None), a merge step
//! either rejects the write with a [`ConflictReason`] or produces the next
//! record to store. The stored record is never modified: the next record
//! starts from a deep copy of it.

use playerdb_core::{ConflictReason, DataRecord, Partition, Payload};

use crate::validation::validate_expected;

/// Produces the next record from the current one
pub trait MergeStep<T: Payload>: Send + Sync {
    /// Validate against `current` and build the record to write.
    fn merge(&self, current: Option<&DataRecord<T>>) -> Result<DataRecord<T>, ConflictReason>;
}

/// Compare-and-set of a single partition
///
/// Validates `expected` against the partition's stored payload, then sets a
/// deep copy of `new_value` into that partition. The other partition is
/// carried over unchanged.
#[derive(Debug)]
pub struct PartitionWrite<'a, T> {
    partition: &'a Partition,
    new_value: &'a T,
    expected: Option<&'a T>,
}

impl<'a, T: Payload> PartitionWrite<'a, T> {
    /// Write `new_value` into `partition` if it still holds `expected`.
    pub fn new(partition: &'a Partition, new_value: &'a T, expected: Option<&'a T>) -> Self {
        PartitionWrite {
            partition,
            new_value,
            expected,
        }
    }

    /// The targeted partition.
    pub fn partition(&self) -> &Partition {
        self.partition
    }
}

impl<T: Payload> MergeStep<T> for PartitionWrite<'_, T> {
    fn merge(&self, current: Option<&DataRecord<T>>) -> Result<DataRecord<T>, ConflictReason> {
        let found = current.and_then(|record| record.payload(self.partition));
        validate_expected(found, self.expected)?;

        let mut next = current.map(DataRecord::deep_copy).unwrap_or_default();
        next.set_payload(self.partition, self.new_value);
        Ok(next)
    }
}
