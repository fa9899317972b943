//! Persistence of provider metadata and results.
//!
//! The [`StorageSink`] owns the upsert discipline (update, insert on miss,
//! update again if a concurrent insert won). Backends only implement
//! [`Executor`], which runs one statement and reports rows affected.

mod error;
mod memory;
mod postgres;
mod sink;
mod statement;

use async_trait::async_trait;

pub use error::StorageError;
pub use memory::{ExecutedStatement, MemoryExecutor, StoredPlugin, StoredProvider, StoredTab};
pub use postgres::PgExecutor;
pub use sink::{StorageSink, Upserted};
pub use statement::{
    Operation, PlayerValueRecord, PluginRecord, ProviderRecord, ProviderValue, Record,
    STRING_VALUE_MAX, Statement, TabRecord,
};

/// Runs storage statements against a backend.
///
/// Inserts must not create a second row for an identity that already
/// exists; an insert that would do so affects zero rows instead.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute one statement, returning the number of rows affected.
    async fn execute(&self, statement: Statement<'_>) -> Result<u64, StorageError>;
}
