//! Shared test utilities for the integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::{Arc, Once};

pub use playerdb::{
    Backoff, CancellationToken, Collection, ConflictReason, DataRecord, EntityId, Error,
    FaultPoint, LockMode, MemoryCollection, MemoryStore, PlayerDataReader, PlayerDataWriter,
    PlayerDatabase, PlayerDbConfig, ReplicaRole, RetryPolicy, SecureHash, StoreFault,
    Transaction, TransactionalStore,
};

/// Collection name used by every test database.
pub const COLLECTION: &str = "PlayerDatabase";

/// Seed for the retry backoff, so waits are reproducible.
pub const BACKOFF_SEED: u64 = 0x5EED;

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output to the test harness. Safe to call from every test.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

// ============================================================================
// Payload
// ============================================================================

/// A payload with owned, nested data, so copies are observable.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub name: String,
    pub level: u32,
    pub items: Vec<String>,
}

impl Profile {
    pub fn new(name: &str, level: u32) -> Self {
        Profile {
            name: name.to_string(),
            level,
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: &str) -> Self {
        self.items.push(item.to_string());
        self
    }
}

// ============================================================================
// TestDb
// ============================================================================

/// A `PlayerDatabase` over a fresh `MemoryStore`, with the store kept at
/// hand for fault injection and inspection.
pub struct TestDb {
    pub store: MemoryStore,
    pub db: Arc<PlayerDatabase<MemoryStore>>,
}

impl TestDb {
    /// Database whose collection already exists.
    pub fn new() -> Self {
        let test_db = Self::without_collection();
        test_db.create_collection();
        test_db
    }

    /// Database whose collection has not been created yet.
    pub fn without_collection() -> Self {
        Self::with_config(PlayerDbConfig::default())
    }

    /// Database with a custom config; the collection is not created.
    pub fn with_config(config: PlayerDbConfig) -> Self {
        init_tracing();
        let store = MemoryStore::new();
        let backoff = Backoff::with_seed(config.retry_policy(), BACKOFF_SEED);
        let db = PlayerDatabase::with_backoff(Arc::new(store.clone()), config, backoff)
            .expect("valid test config");
        TestDb {
            store,
            db: Arc::new(db),
        }
    }

    /// Create the record collection for `Profile` payloads.
    pub fn create_collection(&self) -> Arc<MemoryCollection<EntityId, DataRecord<Profile>>> {
        self.store
            .create_collection::<EntityId, DataRecord<Profile>>(&self.db.config().collection_name)
            .expect("create collection")
    }

    /// The committed record for `id`, read around the client.
    pub fn stored(&self, id: EntityId) -> Option<DataRecord<Profile>> {
        self.create_collection().peek(&id).map(|record| (*record).clone())
    }

    /// Every transaction the client began has ended.
    pub fn assert_no_open_transactions(&self) {
        let stats = self.store.stats();
        assert_eq!(
            stats.begun,
            stats.committed + stats.aborted,
            "open transactions left behind: {:?}",
            stats
        );
    }

    pub async fn read_insecure(&self, id: EntityId) -> Result<Option<Profile>, Error> {
        self.db.get_insecure(id, &CancellationToken::new()).await
    }

    pub async fn read_secure(&self, id: EntityId, hash: &str) -> Result<Option<Profile>, Error> {
        self.db
            .get_secure(id, &SecureHash::from(hash), &CancellationToken::new())
            .await
    }

    pub async fn write_insecure(
        &self,
        id: EntityId,
        value: &Profile,
        expected: Option<&Profile>,
    ) -> Result<(), Error> {
        self.db
            .write_insecure(id, value, expected, &CancellationToken::new())
            .await
    }

    pub async fn write_secure(
        &self,
        id: EntityId,
        hash: &str,
        value: &Profile,
        expected: Option<&Profile>,
    ) -> Result<(), Error> {
        self.db
            .write_secure(
                id,
                &SecureHash::from(hash),
                value,
                expected,
                &CancellationToken::new(),
            )
            .await
    }
}
