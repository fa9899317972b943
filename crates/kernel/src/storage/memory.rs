//! In-process executor.
//!
//! Keeps the same tables and uniqueness rules as the PostgreSQL schema,
//! for tests and for embedders that do not persist results.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tally_sdk::Icon;
use uuid::Uuid;

use super::statement::{Operation, ProviderValue, Record, Statement};
use super::{Executor, StorageError};
use crate::provider::ValueKind;

/// A stored plugin row.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPlugin {
    pub name: String,
    pub server_uuid: Uuid,
    pub icon: Icon,
    pub last_updated: i64,
}

/// A stored tab row.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTab {
    pub plugin_name: String,
    pub server_uuid: Uuid,
    pub name: String,
    pub icon: Icon,
}

/// A stored provider row.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredProvider {
    pub plugin_name: String,
    pub server_uuid: Uuid,
    pub name: String,
    pub text: String,
    pub description: Option<String>,
    pub priority: i32,
    pub condition: Option<String>,
    pub provided_condition: Option<String>,
    pub hidden: bool,
    pub tab: String,
    pub icon: Icon,
    pub kind: ValueKind,
}

/// One statement as seen by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedStatement {
    pub op: Operation,
    pub table: &'static str,
    pub identity: String,
    pub rows: u64,
}

type PluginKey = (String, Uuid);
type ScopedKey = (String, String, Uuid);
type ValueKey = (String, String, Uuid, Uuid);

#[derive(Debug, Default)]
struct Tables {
    icons: Vec<Icon>,
    plugins: HashMap<PluginKey, StoredPlugin>,
    tabs: HashMap<ScopedKey, StoredTab>,
    providers: HashMap<ScopedKey, StoredProvider>,
    player_values: HashMap<ValueKey, ProviderValue>,
    log: Option<Vec<ExecutedStatement>>,
}

/// Executor backed by in-memory tables.
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryExecutor {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryExecutor {
    /// Create an executor with empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an executor that also records every executed statement.
    pub fn with_statement_log() -> Self {
        let executor = Self::default();
        executor.tables.lock().log = Some(Vec::new());
        executor
    }

    /// All plugin rows.
    pub fn plugins(&self) -> Vec<StoredPlugin> {
        self.tables.lock().plugins.values().cloned().collect()
    }

    /// All tab rows.
    pub fn tabs(&self) -> Vec<StoredTab> {
        self.tables.lock().tabs.values().cloned().collect()
    }

    /// All provider rows, ordered by plugin then name.
    pub fn providers(&self) -> Vec<StoredProvider> {
        let mut rows: Vec<_> = self.tables.lock().providers.values().cloned().collect();
        rows.sort_by(|a, b| (&a.plugin_name, &a.name).cmp(&(&b.plugin_name, &b.name)));
        rows
    }

    /// Number of distinct icons.
    pub fn icon_count(&self) -> usize {
        self.tables.lock().icons.len()
    }

    /// Number of player value rows.
    pub fn player_value_count(&self) -> usize {
        self.tables.lock().player_values.len()
    }

    /// Latest value of a provider for a player, on any server.
    pub fn player_value(&self, plugin: &str, method: &str, player_uuid: Uuid) -> Option<ProviderValue> {
        self.tables
            .lock()
            .player_values
            .iter()
            .find(|((p, m, _, player), _)| p == plugin && m == method && *player == player_uuid)
            .map(|(_, value)| value.clone())
    }

    /// Every statement executed so far, in order.
    ///
    /// Empty unless the executor was built with
    /// [`MemoryExecutor::with_statement_log`].
    pub fn statements(&self) -> Vec<ExecutedStatement> {
        self.tables.lock().log.clone().unwrap_or_default()
    }
}

impl Tables {
    fn apply(&mut self, statement: &Statement<'_>) -> Result<u64, StorageError> {
        let insert = statement.op == Operation::Insert;
        let record = statement.record;

        match record {
            Record::Icon(icon) => {
                let exists = self.icons.contains(icon);
                if insert && !exists {
                    self.icons.push(icon.clone());
                    return Ok(1);
                }
                Ok(u64::from(exists && !insert))
            }

            Record::Plugin(r) => {
                self.require_icon(&record, &r.plugin.icon)?;
                let key = (r.plugin.name.clone(), r.server_uuid);
                match (self.plugins.get_mut(&key), insert) {
                    (Some(row), false) => {
                        row.icon = r.plugin.icon.clone();
                        row.last_updated = r.last_updated;
                        Ok(1)
                    }
                    (None, true) => {
                        self.plugins.insert(
                            key,
                            StoredPlugin {
                                name: r.plugin.name.clone(),
                                server_uuid: r.server_uuid,
                                icon: r.plugin.icon.clone(),
                                last_updated: r.last_updated,
                            },
                        );
                        Ok(1)
                    }
                    _ => Ok(0),
                }
            }

            Record::Tab(r) => {
                self.require_plugin(&record, r.plugin_name, r.server_uuid)?;
                self.require_icon(&record, r.icon)?;
                let key = (r.plugin_name.to_string(), r.name.to_string(), r.server_uuid);
                match (self.tabs.get_mut(&key), insert) {
                    (Some(row), false) => {
                        row.icon = r.icon.clone();
                        Ok(1)
                    }
                    (None, true) => {
                        self.tabs.insert(
                            key,
                            StoredTab {
                                plugin_name: r.plugin_name.to_string(),
                                server_uuid: r.server_uuid,
                                name: r.name.to_string(),
                                icon: r.icon.clone(),
                            },
                        );
                        Ok(1)
                    }
                    _ => Ok(0),
                }
            }

            Record::Provider(r) => {
                let d = r.definition;
                self.require_plugin(&record, &d.plugin_name, r.server_uuid)?;
                self.require_icon(&record, &d.icon)?;
                let tab_key = (d.plugin_name.clone(), d.tab_name().to_string(), r.server_uuid);
                if !self.tabs.contains_key(&tab_key) {
                    return Err(missing(&record, format!("tab '{}'", d.tab_name())));
                }

                let row = StoredProvider {
                    plugin_name: d.plugin_name.clone(),
                    server_uuid: r.server_uuid,
                    name: d.method_name.clone(),
                    text: d.text.clone(),
                    description: d.description.clone(),
                    priority: d.priority,
                    condition: d.condition.as_ref().map(ToString::to_string),
                    provided_condition: d.provided_condition.clone(),
                    hidden: d.hidden,
                    tab: d.tab_name().to_string(),
                    icon: d.icon.clone(),
                    kind: d.kind,
                };
                let key = (d.plugin_name.clone(), d.method_name.clone(), r.server_uuid);
                match (self.providers.get_mut(&key), insert) {
                    (Some(existing), false) => {
                        *existing = row;
                        Ok(1)
                    }
                    (None, true) => {
                        self.providers.insert(key, row);
                        Ok(1)
                    }
                    _ => Ok(0),
                }
            }

            Record::PlayerValue(r) => {
                let provider_key = (
                    r.plugin_name.to_string(),
                    r.method_name.to_string(),
                    r.server_uuid,
                );
                if !self.providers.contains_key(&provider_key) {
                    return Err(missing(
                        &record,
                        format!("provider '{}.{}'", r.plugin_name, r.method_name),
                    ));
                }
                let key = (
                    r.plugin_name.to_string(),
                    r.method_name.to_string(),
                    r.server_uuid,
                    r.player_uuid,
                );
                match (self.player_values.get_mut(&key), insert) {
                    (Some(existing), false) => {
                        *existing = r.value.clone();
                        Ok(1)
                    }
                    (None, true) => {
                        self.player_values.insert(key, r.value.clone());
                        Ok(1)
                    }
                    _ => Ok(0),
                }
            }
        }
    }

    fn require_icon(&self, record: &Record<'_>, icon: &Icon) -> Result<(), StorageError> {
        if self.icons.contains(icon) {
            Ok(())
        } else {
            Err(missing(record, format!("icon '{}'", icon.name)))
        }
    }

    fn require_plugin(
        &self,
        record: &Record<'_>,
        plugin: &str,
        server_uuid: Uuid,
    ) -> Result<(), StorageError> {
        if self
            .plugins
            .contains_key(&(plugin.to_string(), server_uuid))
        {
            Ok(())
        } else {
            Err(missing(record, format!("plugin '{plugin}'")))
        }
    }
}

fn missing(record: &Record<'_>, what: String) -> StorageError {
    StorageError::MissingReference {
        table: record.table(),
        identity: record.identity(),
        missing: what,
    }
}

#[async_trait]
impl Executor for MemoryExecutor {
    async fn execute(&self, statement: Statement<'_>) -> Result<u64, StorageError> {
        let mut tables = self.tables.lock();
        let rows = tables.apply(&statement)?;
        if let Some(log) = tables.log.as_mut() {
            log.push(ExecutedStatement {
                op: statement.op,
                table: statement.record.table(),
                identity: statement.record.identity(),
                rows,
            });
        }
        Ok(rows)
    }
}
