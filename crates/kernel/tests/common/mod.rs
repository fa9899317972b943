#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Tests run the real kernel gathering code against [`MemoryExecutor`],
//! which enforces the same uniqueness and reference rules as the
//! PostgreSQL schema and records every statement it executes.

#![allow(dead_code)]

use std::sync::Arc;

use tally_kernel::gather::{BooleanGatherer, GatherOptions, Subject};
use tally_kernel::provider::{
    PluginDefinition, ProviderCallback, ProviderDefinition, ProviderRegistry,
};
use tally_kernel::storage::{MemoryExecutor, StorageSink};
use tally_sdk::Evaluable;
use uuid::Uuid;

/// Server every test stores results for.
pub const SERVER: Uuid = Uuid::from_u128(0x5e7e_7000);

/// Test plugin name.
pub const PLUGIN: &str = "essentials";

/// A registry with the test plugin registered and no providers.
pub fn registry() -> ProviderRegistry {
    let registry = ProviderRegistry::new();
    registry
        .register_plugin(PluginDefinition::new(PLUGIN))
        .unwrap();
    registry
}

/// Register a boolean provider on the test plugin.
pub fn boolean(
    registry: &ProviderRegistry,
    definition: ProviderDefinition,
    callback: Arc<dyn Evaluable<bool>>,
) {
    registry
        .register(definition, ProviderCallback::Boolean(callback))
        .unwrap();
}

/// A boolean provider definition on the test plugin.
pub fn provider(method: &str) -> ProviderDefinition {
    ProviderDefinition::boolean(PLUGIN, method)
}

/// In-memory storage and a sink writing to it.
pub fn memory_sink() -> (Arc<MemoryExecutor>, StorageSink) {
    let memory = Arc::new(MemoryExecutor::with_statement_log());
    let sink = StorageSink::new(memory.clone(), SERVER);
    (memory, sink)
}

/// A boolean gatherer over the test plugin's current providers.
pub fn gatherer(registry: &ProviderRegistry, sink: StorageSink) -> BooleanGatherer {
    BooleanGatherer::new(registry.snapshot(PLUGIN).unwrap(), sink)
}

/// Same, with explicit options.
pub fn gatherer_with(
    registry: &ProviderRegistry,
    sink: StorageSink,
    options: GatherOptions,
) -> BooleanGatherer {
    gatherer(registry, sink).with_options(options)
}

/// A player subject.
pub fn player(n: u128, name: &str) -> Subject {
    Subject::new(Uuid::from_u128(n), name)
}
