//! Storage error types.

use thiserror::Error;

/// Errors raised while writing provider metadata or results.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The database rejected a statement.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A referenced row (plugin, tab, icon, provider) does not exist.
    #[error("{table} row for {identity} references missing {missing}")]
    MissingReference {
        table: &'static str,
        identity: String,
        missing: String,
    },

    /// Neither the update nor the insert touched a row.
    #[error("upsert into {table} for {identity} affected no rows")]
    UpsertLost {
        table: &'static str,
        identity: String,
    },
}

impl StorageError {
    /// Short machine-readable kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            StorageError::Database(_) => "database",
            StorageError::MissingReference { .. } => "missing_reference",
            StorageError::UpsertLost { .. } => "upsert_lost",
        }
    }
}
