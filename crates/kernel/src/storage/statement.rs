//! Statements the storage sink hands to an [`Executor`](super::Executor).
//!
//! A statement is an operation (update or insert) on one record. Records
//! borrow from the caller; executors translate them into whatever their
//! backend needs and report the number of rows affected.

use serde::{Deserialize, Serialize};
use tally_sdk::Icon;
use uuid::Uuid;

use crate::provider::{PluginDefinition, ProviderDefinition, ValueKind};

/// Longest string value accepted by storage.
pub const STRING_VALUE_MAX: usize = 50;

/// A value produced by a provider for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ProviderValue {
    Boolean(bool),
    Number(i64),
    Double(f64),
    Percentage(f64),
    String(String),
}

impl ProviderValue {
    /// A string value, truncated to [`STRING_VALUE_MAX`] characters.
    pub fn string(value: impl Into<String>) -> Self {
        let value: String = value.into();
        if value.chars().count() > STRING_VALUE_MAX {
            ProviderValue::String(value.chars().take(STRING_VALUE_MAX).collect())
        } else {
            ProviderValue::String(value)
        }
    }

    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            ProviderValue::Boolean(_) => ValueKind::Boolean,
            ProviderValue::Number(_) => ValueKind::Number,
            ProviderValue::Double(_) => ValueKind::Double,
            ProviderValue::Percentage(_) => ValueKind::Percentage,
            ProviderValue::String(_) => ValueKind::String,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ProviderValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            ProviderValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            ProviderValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_percentage(&self) -> Option<f64> {
        match self {
            ProviderValue::Percentage(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ProviderValue::String(v) => Some(v),
            _ => None,
        }
    }
}

/// Update an existing row, or insert a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Update,
    Insert,
}

/// A plugin row: identity is `(name, server_uuid)`.
#[derive(Debug, Clone, Copy)]
pub struct PluginRecord<'a> {
    pub server_uuid: Uuid,
    pub plugin: &'a PluginDefinition,
    /// Epoch milliseconds of this write.
    pub last_updated: i64,
}

/// A tab row: identity is `(name, plugin, server_uuid)`.
#[derive(Debug, Clone, Copy)]
pub struct TabRecord<'a> {
    pub server_uuid: Uuid,
    pub plugin_name: &'a str,
    pub name: &'a str,
    pub icon: &'a Icon,
}

/// A provider row: identity is `(plugin, method, server_uuid)`.
#[derive(Debug, Clone, Copy)]
pub struct ProviderRecord<'a> {
    pub server_uuid: Uuid,
    pub definition: &'a ProviderDefinition,
}

/// A player value row: identity is `(plugin, method, server_uuid, player_uuid)`.
#[derive(Debug, Clone, Copy)]
pub struct PlayerValueRecord<'a> {
    pub server_uuid: Uuid,
    pub plugin_name: &'a str,
    pub method_name: &'a str,
    pub player_uuid: Uuid,
    pub value: &'a ProviderValue,
}

/// Any record the sink writes.
#[derive(Debug, Clone, Copy)]
pub enum Record<'a> {
    Icon(&'a Icon),
    Plugin(PluginRecord<'a>),
    Tab(TabRecord<'a>),
    Provider(ProviderRecord<'a>),
    PlayerValue(PlayerValueRecord<'a>),
}

impl Record<'_> {
    /// Name of the table the record lives in.
    pub fn table(&self) -> &'static str {
        match self {
            Record::Icon(_) => "extension_icon",
            Record::Plugin(_) => "extension_plugin",
            Record::Tab(_) => "extension_tab",
            Record::Provider(_) => "extension_provider",
            Record::PlayerValue(_) => "extension_player_value",
        }
    }

    /// Human-readable natural identity, for logs and errors.
    pub fn identity(&self) -> String {
        match self {
            Record::Icon(icon) => format!(
                "{}/{}/{}",
                icon.name,
                icon.family.as_str(),
                icon.color.as_str()
            ),
            Record::Plugin(r) => format!("{}@{}", r.plugin.name, r.server_uuid),
            Record::Tab(r) => format!("{}:{}@{}", r.plugin_name, r.name, r.server_uuid),
            Record::Provider(r) => format!(
                "{}.{}@{}",
                r.definition.plugin_name, r.definition.method_name, r.server_uuid
            ),
            Record::PlayerValue(r) => format!(
                "{}.{}@{} for {}",
                r.plugin_name, r.method_name, r.server_uuid, r.player_uuid
            ),
        }
    }
}

/// One operation on one record.
#[derive(Debug, Clone, Copy)]
pub struct Statement<'a> {
    pub op: Operation,
    pub record: Record<'a>,
}

impl<'a> Statement<'a> {
    pub fn update(record: Record<'a>) -> Self {
        Self {
            op: Operation::Update,
            record,
        }
    }

    pub fn insert(record: Record<'a>) -> Self {
        Self {
            op: Operation::Insert,
            record,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn string_values_are_truncated() {
        let value = ProviderValue::string("s".repeat(70));
        assert_eq!(value.as_str().unwrap().len(), STRING_VALUE_MAX);
        assert_eq!(value.kind(), ValueKind::String);
    }

    #[test]
    fn accessors_match_variant() {
        assert_eq!(ProviderValue::Boolean(true).as_bool(), Some(true));
        assert_eq!(ProviderValue::Boolean(true).as_number(), None);
        assert_eq!(ProviderValue::Number(3).as_number(), Some(3));
        assert_eq!(ProviderValue::Percentage(0.5).as_percentage(), Some(0.5));
        assert_eq!(ProviderValue::Double(0.5).as_percentage(), None);
    }

    #[test]
    fn identity_names_the_natural_key() {
        let def = ProviderDefinition::boolean("essentials", "isJailed");
        let record = Record::Provider(ProviderRecord {
            server_uuid: Uuid::nil(),
            definition: &def,
        });
        assert_eq!(record.table(), "extension_provider");
        assert!(record.identity().starts_with("essentials.isJailed@"));
    }
}
