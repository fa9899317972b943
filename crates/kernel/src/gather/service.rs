//! Per-subject gathering across every registered plugin.

use std::sync::Arc;

use tracing::{debug, info};

use super::boolean::BooleanGatherer;
use super::invoker::Subject;
use super::options::GatherOptions;
use super::report::GatherReport;
use super::values::ValueGatherer;
use crate::metrics::GatherMetrics;
use crate::provider::{ProviderRegistry, ProviderSet};
use crate::storage::StorageSink;

/// Reports for one plugin's passes over one subject.
#[derive(Debug)]
pub struct PluginReport {
    pub plugin: String,
    /// The boolean pass.
    pub conditions: GatherReport,
    /// The value pass; `None` when the boolean pass was aborted.
    pub values: Option<GatherReport>,
}

impl PluginReport {
    /// Results stored by both passes.
    pub fn stored(&self) -> usize {
        self.conditions.stored + self.values.as_ref().map_or(0, |v| v.stored)
    }

    /// Faults raised by both passes.
    pub fn fault_count(&self) -> usize {
        self.conditions.faults.len() + self.values.as_ref().map_or(0, |v| v.faults.len())
    }
}

/// Gathers every plugin's player providers for a subject.
#[derive(Debug, Clone)]
pub struct ExtensionService {
    registry: Arc<ProviderRegistry>,
    sink: StorageSink,
    options: GatherOptions,
    metrics: Option<Arc<GatherMetrics>>,
}

impl ExtensionService {
    pub fn new(registry: Arc<ProviderRegistry>, sink: StorageSink) -> Self {
        Self {
            registry,
            sink,
            options: GatherOptions::default(),
            metrics: None,
        }
    }

    pub fn with_options(mut self, options: GatherOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<GatherMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Run the boolean pass and then the value pass of every plugin, in
    /// plugin name order.
    pub async fn update_player(&self, subject: &Subject) -> Vec<PluginReport> {
        let mut reports = Vec::new();
        for plugin in self.registry.plugin_names() {
            // Unregistered since the names were listed.
            let Some(providers) = self.registry.snapshot(&plugin) else {
                continue;
            };
            reports.push(self.gather_plugin(providers, subject).await);
        }

        info!(
            player = %subject.uuid,
            plugins = reports.len(),
            stored = reports.iter().map(PluginReport::stored).sum::<usize>(),
            faults = reports.iter().map(PluginReport::fault_count).sum::<usize>(),
            "updated player extension data"
        );
        reports
    }

    /// Run both passes of a single plugin. Returns `None` if the plugin is
    /// not registered.
    pub async fn update_player_for(&self, plugin: &str, subject: &Subject) -> Option<PluginReport> {
        let providers = self.registry.snapshot(plugin)?;
        Some(self.gather_plugin(providers, subject).await)
    }

    async fn gather_plugin(&self, providers: Arc<ProviderSet>, subject: &Subject) -> PluginReport {
        let plugin = providers.plugin().name.clone();

        let mut booleans = BooleanGatherer::new(Arc::clone(&providers), self.sink.clone())
            .with_options(self.options);
        let mut values = ValueGatherer::new(providers, self.sink.clone()).with_options(self.options);
        if let Some(metrics) = &self.metrics {
            booleans = booleans.with_metrics(Arc::clone(metrics));
            values = values.with_metrics(Arc::clone(metrics));
        }

        let conditions = booleans.gather_with_report(subject).await;
        let values = if conditions.aborted {
            debug!(plugin = %plugin, player = %subject.uuid, "boolean pass aborted, skipping values");
            None
        } else {
            Some(values.gather(subject, &conditions.ledger).await)
        };

        PluginReport {
            plugin,
            conditions,
            values,
        }
    }
}
