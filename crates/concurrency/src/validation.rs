//! Expected-previous validation
//!
//! A write carries the value the caller last saw for the targeted
//! partition (or None if it saw nothing). The write may only proceed if the
//! store still agrees:
//!
//! | stored | expected | outcome |
//! |--------|----------|---------|
//! | absent | absent | ok |
//! | present | present, equal | ok |
//! | present | present, different | `ValueMismatch` |
//! | absent | present | `ExistenceMismatch` |
//! | present | absent | `ExistenceMismatch` |
//!
//! Conflicts are final: they are never retried by the controllers.

use playerdb_core::{ConflictReason, Payload};

/// Validate `expected` against the `current` stored payload.
pub fn validate_expected<T: Payload>(
    current: Option<&T>,
    expected: Option<&T>,
) -> Result<(), ConflictReason> {
    match (current, expected) {
        (None, None) => Ok(()),
        (Some(current), Some(expected)) => {
            if current == expected {
                Ok(())
            } else {
                Err(ConflictReason::ValueMismatch)
            }
        }
        (current, expected) => Err(ConflictReason::ExistenceMismatch {
            expected_present: expected.is_some(),
            found_present: current.is_some(),
        }),
    }
}
