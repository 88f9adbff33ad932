//! PlayerDatabase: the read and write surface offered to upstream callers
//!
//! Callers hold a `PlayerDatabase` (or just one of its contracts) and never
//! see the store, the handles or the transactions behind it.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use playerdb_concurrency::Backoff;
use playerdb_core::{EntityId, Payload, Result, SecureHash, TransactionalStore};

use crate::config::PlayerDbConfig;
use crate::read::ReadController;
use crate::registry::HandleRegistry;
use crate::write::WriteController;

/// Read side of the player data contract
#[async_trait]
pub trait PlayerDataReader: Send + Sync {
    /// The insecure payload of entity `id`, or None if it has none.
    async fn get_insecure<T: Payload>(
        &self,
        id: EntityId,
        cancel: &CancellationToken,
    ) -> Result<Option<T>>;

    /// The secure payload of entity `id` under `hash`, or None if it has none.
    async fn get_secure<T: Payload>(
        &self,
        id: EntityId,
        hash: &SecureHash,
        cancel: &CancellationToken,
    ) -> Result<Option<T>>;
}

/// Write side of the player data contract
///
/// `expected` is the value the caller last read for the targeted partition
/// (None if it read nothing). A write whose `expected` no longer matches
/// fails with `ConcurrencyViolation` and changes nothing.
#[async_trait]
pub trait PlayerDataWriter: Send + Sync {
    /// Replace the insecure payload of entity `id`.
    async fn write_insecure<T: Payload>(
        &self,
        id: EntityId,
        new_value: &T,
        expected: Option<&T>,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Replace the secure payload of entity `id` under `hash`.
    async fn write_secure<T: Payload>(
        &self,
        id: EntityId,
        hash: &SecureHash,
        new_value: &T,
        expected: Option<&T>,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

/// Player record store client over a backing transactional store
#[derive(Debug)]
pub struct PlayerDatabase<S: TransactionalStore> {
    config: PlayerDbConfig,
    registry: Arc<HandleRegistry<S>>,
    reader: ReadController<S>,
    writer: WriteController<S>,
}

impl<S: TransactionalStore> PlayerDatabase<S> {
    /// Client over `store` configured by `config`.
    ///
    /// # Errors
    ///
    /// `Config` if `config` does not validate.
    pub fn new(store: Arc<S>, config: PlayerDbConfig) -> Result<Self> {
        config.validate()?;
        let backoff = Backoff::new(config.retry_policy());
        Self::with_backoff(store, config, backoff)
    }

    /// Client drawing its retry delays from `backoff`.
    ///
    /// The attempt budget and delay bounds come from `backoff`'s policy;
    /// the remaining settings from `config`.
    pub fn with_backoff(store: Arc<S>, config: PlayerDbConfig, backoff: Backoff) -> Result<Self> {
        let registry = Arc::new(HandleRegistry::new(
            store,
            config.collection_name.clone(),
            config.open_schedule(),
        )?);
        let backoff = Arc::new(backoff);
        let reader = ReadController::new(
            Arc::clone(&registry),
            Arc::clone(&backoff),
            config.read_timeout(),
        );
        let writer = WriteController::new(
            Arc::clone(&registry),
            backoff,
            config.read_timeout(),
            config.write_timeout(),
        );
        tracing::debug!(collection = %config.collection_name, "player database ready");
        Ok(PlayerDatabase {
            config,
            registry,
            reader,
            writer,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &PlayerDbConfig {
        &self.config
    }

    /// Handle registry shared by the controllers.
    pub fn registry(&self) -> &HandleRegistry<S> {
        &self.registry
    }

    /// Read controller.
    pub fn reader(&self) -> &ReadController<S> {
        &self.reader
    }

    /// Write controller.
    pub fn writer(&self) -> &WriteController<S> {
        &self.writer
    }

    /// Liveness probe. The client holds no state that can go bad on its
    /// own, so it is healthy whenever the process is.
    pub fn is_healthy(&self) -> bool {
        true
    }
}

#[async_trait]
impl<S: TransactionalStore> PlayerDataReader for PlayerDatabase<S> {
    async fn get_insecure<T: Payload>(
        &self,
        id: EntityId,
        cancel: &CancellationToken,
    ) -> Result<Option<T>> {
        self.reader.get_insecure(id, cancel).await
    }

    async fn get_secure<T: Payload>(
        &self,
        id: EntityId,
        hash: &SecureHash,
        cancel: &CancellationToken,
    ) -> Result<Option<T>> {
        self.reader.get_secure(id, hash, cancel).await
    }
}

#[async_trait]
impl<S: TransactionalStore> PlayerDataWriter for PlayerDatabase<S> {
    async fn write_insecure<T: Payload>(
        &self,
        id: EntityId,
        new_value: &T,
        expected: Option<&T>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.writer.write_insecure(id, new_value, expected, cancel).await
    }

    async fn write_secure<T: Payload>(
        &self,
        id: EntityId,
        hash: &SecureHash,
        new_value: &T,
        expected: Option<&T>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.writer
            .write_secure(id, hash, new_value, expected, cancel)
            .await
    }
}
