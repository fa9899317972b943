//! Storage sink - idempotent upserts of provider metadata and results.

use std::sync::Arc;

use tally_sdk::Icon;
use tracing::{debug, trace};
use uuid::Uuid;

use super::statement::{
    PlayerValueRecord, PluginRecord, ProviderRecord, ProviderValue, Record, Statement, TabRecord,
};
use super::{Executor, StorageError};
use crate::provider::{PluginDefinition, ProviderDefinition};

/// How an upsert landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    /// An existing row was updated.
    Updated,
    /// A new row was inserted.
    Inserted,
}

/// Writes provider metadata and latest results for one server.
#[derive(Clone)]
pub struct StorageSink {
    executor: Arc<dyn Executor>,
    server_uuid: Uuid,
}

impl StorageSink {
    /// Create a sink writing through `executor` on behalf of `server_uuid`.
    pub fn new(executor: Arc<dyn Executor>, server_uuid: Uuid) -> Self {
        Self {
            executor,
            server_uuid,
        }
    }

    /// Server this sink writes for.
    pub fn server_uuid(&self) -> Uuid {
        self.server_uuid
    }

    /// Store a plugin row and its icon.
    pub async fn upsert_plugin(&self, plugin: &PluginDefinition) -> Result<(), StorageError> {
        self.upsert(Record::Icon(&plugin.icon)).await?;
        self.upsert(Record::Plugin(PluginRecord {
            server_uuid: self.server_uuid,
            plugin,
            last_updated: chrono::Utc::now().timestamp_millis(),
        }))
        .await?;
        Ok(())
    }

    /// Store a provider's metadata: its icon, its tab and the provider row.
    ///
    /// The owning plugin row must already exist.
    pub async fn upsert_provider_metadata(
        &self,
        definition: &ProviderDefinition,
    ) -> Result<(), StorageError> {
        let tab_icon = Icon::default();

        self.upsert(Record::Icon(&definition.icon)).await?;
        if definition.icon != tab_icon {
            self.upsert(Record::Icon(&tab_icon)).await?;
        }
        self.upsert(Record::Tab(TabRecord {
            server_uuid: self.server_uuid,
            plugin_name: &definition.plugin_name,
            name: definition.tab_name(),
            icon: &tab_icon,
        }))
        .await?;
        self.upsert(Record::Provider(ProviderRecord {
            server_uuid: self.server_uuid,
            definition,
        }))
        .await?;
        Ok(())
    }

    /// Store the latest value of a provider for one player.
    ///
    /// The provider row must already exist.
    pub async fn upsert_result(
        &self,
        player_uuid: Uuid,
        definition: &ProviderDefinition,
        value: &ProviderValue,
    ) -> Result<Upserted, StorageError> {
        self.upsert(Record::PlayerValue(PlayerValueRecord {
            server_uuid: self.server_uuid,
            plugin_name: &definition.plugin_name,
            method_name: &definition.method_name,
            player_uuid,
            value,
        }))
        .await
    }

    /// Update the record; insert it if nothing matched.
    ///
    /// An insert affecting no rows means another writer inserted the same
    /// identity in between, so the update is retried once.
    async fn upsert(&self, record: Record<'_>) -> Result<Upserted, StorageError> {
        if self.executor.execute(Statement::update(record)).await? > 0 {
            trace!(table = record.table(), identity = %record.identity(), "updated");
            return Ok(Upserted::Updated);
        }

        if self.executor.execute(Statement::insert(record)).await? > 0 {
            trace!(table = record.table(), identity = %record.identity(), "inserted");
            return Ok(Upserted::Inserted);
        }

        debug!(
            table = record.table(),
            identity = %record.identity(),
            "insert lost to a concurrent writer, updating instead"
        );
        if self.executor.execute(Statement::update(record)).await? > 0 {
            return Ok(Upserted::Updated);
        }

        Err(StorageError::UpsertLost {
            table: record.table(),
            identity: record.identity(),
        })
    }
}

impl std::fmt::Debug for StorageSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageSink")
            .field("server_uuid", &self.server_uuid)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::storage::{MemoryExecutor, Operation};

    fn sink(executor: Arc<dyn Executor>) -> StorageSink {
        StorageSink::new(executor, Uuid::from_u128(7))
    }

    async fn seeded(memory: &Arc<MemoryExecutor>) -> (StorageSink, ProviderDefinition) {
        let sink = sink(memory.clone());
        let definition = ProviderDefinition::boolean("essentials", "isJailed");
        sink.upsert_plugin(&PluginDefinition::new("essentials"))
            .await
            .unwrap();
        sink.upsert_provider_metadata(&definition).await.unwrap();
        (sink, definition)
    }

    #[tokio::test]
    async fn metadata_upsert_is_idempotent() {
        let memory = Arc::new(MemoryExecutor::new());
        let (sink, definition) = seeded(&memory).await;

        sink.upsert_provider_metadata(&definition).await.unwrap();

        assert_eq!(memory.providers().len(), 1);
        assert_eq!(memory.tabs().len(), 1);
        assert_eq!(memory.icon_count(), 1);
    }

    #[tokio::test]
    async fn metadata_update_changes_attributes() {
        let memory = Arc::new(MemoryExecutor::new());
        let (sink, definition) = seeded(&memory).await;

        let changed = definition.with_text("In jail").with_priority(3).hidden();
        sink.upsert_provider_metadata(&changed).await.unwrap();

        let providers = memory.providers();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].text, "In jail");
        assert_eq!(providers[0].priority, 3);
        assert!(providers[0].hidden);
    }

    #[tokio::test]
    async fn result_upsert_inserts_then_updates() {
        let memory = Arc::new(MemoryExecutor::new());
        let (sink, definition) = seeded(&memory).await;
        let player = Uuid::from_u128(42);

        let first = sink
            .upsert_result(player, &definition, &ProviderValue::Boolean(true))
            .await
            .unwrap();
        let second = sink
            .upsert_result(player, &definition, &ProviderValue::Boolean(false))
            .await
            .unwrap();

        assert_eq!(first, Upserted::Inserted);
        assert_eq!(second, Upserted::Updated);
        assert_eq!(memory.player_value_count(), 1);
        assert_eq!(
            memory.player_value("essentials", "isJailed", player),
            Some(ProviderValue::Boolean(false))
        );
    }

    #[tokio::test]
    async fn result_without_provider_row_fails() {
        let memory = Arc::new(MemoryExecutor::new());
        let sink = sink(memory.clone());
        let definition = ProviderDefinition::boolean("essentials", "isJailed");

        let err = sink
            .upsert_result(Uuid::nil(), &definition, &ProviderValue::Boolean(true))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::MissingReference { .. }));
    }

    /// Hides existing rows from the first update, as if a concurrent
    /// writer inserted the row between our update and our insert.
    struct RacingExecutor {
        inner: MemoryExecutor,
        raced: AtomicBool,
    }

    #[async_trait]
    impl Executor for RacingExecutor {
        async fn execute(&self, statement: Statement<'_>) -> Result<u64, StorageError> {
            if statement.op == Operation::Update
                && matches!(statement.record, Record::PlayerValue(_))
                && !self.raced.swap(true, Ordering::SeqCst)
            {
                return Ok(0);
            }
            self.inner.execute(statement).await
        }
    }

    #[tokio::test]
    async fn lost_insert_race_falls_back_to_update() {
        let memory = Arc::new(MemoryExecutor::new());
        let (sink, definition) = seeded(&memory).await;
        let player = Uuid::from_u128(42);
        sink.upsert_result(player, &definition, &ProviderValue::Boolean(true))
            .await
            .unwrap();

        let racing = Arc::new(RacingExecutor {
            inner: MemoryExecutor::clone(&memory),
            raced: AtomicBool::new(false),
        });
        let racing_sink = StorageSink::new(racing, sink.server_uuid());
        let outcome = racing_sink
            .upsert_result(player, &definition, &ProviderValue::Boolean(false))
            .await
            .unwrap();

        assert_eq!(outcome, Upserted::Updated);
        assert_eq!(memory.player_value_count(), 1);
        assert_eq!(
            memory.player_value("essentials", "isJailed", player),
            Some(ProviderValue::Boolean(false))
        );
    }

    #[tokio::test]
    async fn rows_are_scoped_per_server() {
        let memory = Arc::new(MemoryExecutor::new());
        let plugin = PluginDefinition::new("essentials");
        let definition = ProviderDefinition::boolean("essentials", "isJailed");

        for server in [1u128, 2] {
            let sink = StorageSink::new(memory.clone(), Uuid::from_u128(server));
            sink.upsert_plugin(&plugin).await.unwrap();
            sink.upsert_provider_metadata(&definition).await.unwrap();
        }

        assert_eq!(memory.plugins().len(), 2);
        assert_eq!(memory.providers().len(), 2);
    }
}
