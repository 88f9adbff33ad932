//! Client configuration via `playerdb.toml`
//!
//! Every field has a default, so an empty file is a valid configuration.
//! Timeouts and backoff bounds are in milliseconds.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use playerdb_concurrency::{PollSchedule, RetryPolicy};
use playerdb_core::{Error, Result};

/// Conventional config file name.
pub const CONFIG_FILE_NAME: &str = "playerdb.toml";

/// Name of the collection holding every player record.
pub const DEFAULT_COLLECTION_NAME: &str = "PlayerDatabase";

fn default_collection_name() -> String {
    DEFAULT_COLLECTION_NAME.to_string()
}

fn default_read_timeout_ms() -> u64 {
    1000
}

fn default_write_timeout_ms() -> u64 {
    4000
}

fn default_access_attempts() -> u32 {
    4
}

fn default_backoff_floor_ms() -> u64 {
    10
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_open_schedule_ms() -> Vec<u64> {
    vec![1000, 2000, 4000, 8000]
}

/// Client configuration loaded from `playerdb.toml`.
///
/// # Example
///
/// ```toml
/// collection_name = "PlayerDatabase"
/// read_timeout_ms = 1000
/// write_timeout_ms = 4000
/// access_attempts = 4
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerDbConfig {
    /// Collection holding all records.
    #[serde(default = "default_collection_name")]
    pub collection_name: String,
    /// Per-attempt timeout of record reads, including update-intent reads.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Per-attempt timeout of add and update.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    /// Total attempts of the read and write loops.
    #[serde(default = "default_access_attempts")]
    pub access_attempts: u32,
    /// Lower bound of a backoff delay.
    #[serde(default = "default_backoff_floor_ms")]
    pub backoff_floor_ms: u64,
    /// Exclusive upper bound of the first backoff delay, doubled per attempt.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Waits between polls while the collection is not available.
    #[serde(default = "default_open_schedule_ms")]
    pub open_schedule_ms: Vec<u64>,
}

impl Default for PlayerDbConfig {
    fn default() -> Self {
        Self {
            collection_name: default_collection_name(),
            read_timeout_ms: default_read_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            access_attempts: default_access_attempts(),
            backoff_floor_ms: default_backoff_floor_ms(),
            backoff_base_ms: default_backoff_base_ms(),
            open_schedule_ms: default_open_schedule_ms(),
        }
    }
}

impl PlayerDbConfig {
    /// Check the values that would make the client unusable.
    ///
    /// # Errors
    ///
    /// `Error::Config` for a blank collection name, zero attempts, a zero
    /// backoff base, or a floor that is not below the base.
    pub fn validate(&self) -> Result<()> {
        if self.collection_name.trim().is_empty() {
            return Err(Error::config("collection_name must not be blank"));
        }
        if self.access_attempts == 0 {
            return Err(Error::config("access_attempts must be at least 1"));
        }
        if self.backoff_base_ms == 0 {
            return Err(Error::config("backoff_base_ms must be positive"));
        }
        if self.backoff_floor_ms >= self.backoff_base_ms {
            return Err(Error::config(format!(
                "backoff_floor_ms ({}) must be below backoff_base_ms ({})",
                self.backoff_floor_ms, self.backoff_base_ms
            )));
        }
        Ok(())
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PlayerDbConfig = toml::from_str(content)
            .map_err(|e| Error::config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file.
    ///
    /// # Errors
    ///
    /// `Error::Config` if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config { reason } => {
                Error::config(format!("{} ({})", reason, path.display()))
            }
            other => other,
        })
    }

    /// The default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# playerdb client configuration

# Collection holding every player record
collection_name = "PlayerDatabase"

# Per-attempt timeouts in milliseconds
read_timeout_ms = 1000
write_timeout_ms = 4000

# Total attempts for reads and writes hitting transient store faults
access_attempts = 4

# Backoff between attempts is drawn from [floor, base * 2^attempt)
backoff_floor_ms = 10
backoff_base_ms = 500

# Waits between polls while the collection is not yet available
open_schedule_ms = [1000, 2000, 4000, 8000]
"#
    }

    /// Retry policy of the read and write loops.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .with_attempts(self.access_attempts)
            .with_floor_ms(self.backoff_floor_ms)
            .with_base_ms(self.backoff_base_ms)
    }

    /// Poll schedule used when opening the collection.
    pub fn open_schedule(&self) -> PollSchedule {
        PollSchedule::from_millis(&self.open_schedule_ms)
    }

    /// Read timeout as a Duration.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Write timeout as a Duration.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}
