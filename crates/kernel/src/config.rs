//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result, bail};
use uuid::Uuid;

use crate::gather::{GatherOptions, PrerequisitePolicy, StorageErrorPolicy};

/// Kernel configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Identity of the server results are stored for.
    pub server_uuid: Uuid,

    /// Display name of the server (default: "Server").
    pub server_name: String,

    /// Subjects gathered concurrently (default: 4).
    pub gather_workers: usize,

    /// Prerequisite and storage error policies for gathering passes.
    pub gather: GatherOptions,
}

impl Config {
    /// Load configuration from the environment, after reading `.env` if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value
    /// or `None` when unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url =
            lookup("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let server_uuid = lookup("SERVER_UUID")
            .context("SERVER_UUID environment variable is required")?
            .parse()
            .context("SERVER_UUID must be a valid UUID")?;

        let server_name = lookup("SERVER_NAME").unwrap_or_else(|| "Server".to_string());

        let gather_workers: usize = lookup("GATHER_WORKERS")
            .unwrap_or_else(|| "4".to_string())
            .parse()
            .context("GATHER_WORKERS must be a valid usize")?;
        if gather_workers == 0 {
            bail!("GATHER_WORKERS must be at least 1");
        }

        let prerequisites: PrerequisitePolicy = lookup("GATHER_PREREQUISITES")
            .unwrap_or_else(|| "lenient".to_string())
            .parse()
            .map_err(anyhow::Error::msg)
            .context("GATHER_PREREQUISITES must be 'lenient' or 'strict'")?;

        let storage_errors: StorageErrorPolicy = lookup("GATHER_STORAGE_ERRORS")
            .unwrap_or_else(|| "continue".to_string())
            .parse()
            .map_err(anyhow::Error::msg)
            .context("GATHER_STORAGE_ERRORS must be 'continue' or 'abort'")?;

        Ok(Self {
            database_url,
            database_max_connections,
            server_uuid,
            server_name,
            gather_workers,
            gather: GatherOptions {
                prerequisites,
                storage_errors,
            },
        })
    }
}
