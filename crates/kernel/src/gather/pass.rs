//! State shared by the boolean and value passes.

use std::ops::ControlFlow;
use std::sync::Arc;

use tally_sdk::Evaluable;
use tracing::{debug, error, warn};

use super::invoker::{CallbackInvoker, Subject};
use super::ledger::{Condition, ConditionLedger};
use super::options::{GatherOptions, PrerequisitePolicy, StorageErrorPolicy};
use super::report::{GatherReport, SkipReason, SkippedProvider, StorageFailure};
use crate::metrics::GatherMetrics;
use crate::provider::{PluginDefinition, ProviderDefinition};
use crate::storage::{ProviderValue, StorageError, StorageSink};

/// Collaborators of a pass.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub sink: StorageSink,
    pub invoker: CallbackInvoker,
    pub options: GatherOptions,
    pub metrics: Option<Arc<GatherMetrics>>,
}

impl Settings {
    pub fn new(sink: StorageSink) -> Self {
        Self {
            sink,
            invoker: CallbackInvoker::new(),
            options: GatherOptions::default(),
            metrics: None,
        }
    }
}

/// One in-flight pass for one plugin and subject.
pub(crate) struct Pass<'a> {
    settings: &'a Settings,
    plugin: &'a PluginDefinition,
    subject: &'a Subject,
    plugin_written: bool,
    pub report: GatherReport,
}

impl<'a> Pass<'a> {
    pub fn new(
        settings: &'a Settings,
        plugin: &'a PluginDefinition,
        subject: &'a Subject,
        ledger: ConditionLedger,
    ) -> Self {
        Self {
            settings,
            plugin,
            subject,
            plugin_written: false,
            report: GatherReport::new(&plugin.name, subject.uuid, ledger),
        }
    }

    /// Invoke a callback, recording the invocation and any fault.
    pub async fn invoke<T>(
        &mut self,
        definition: &ProviderDefinition,
        callback: &Arc<dyn Evaluable<T>>,
    ) -> Option<T>
    where
        T: Send + 'static,
    {
        self.report.invoked.push(definition.method_name.clone());
        if let Some(metrics) = &self.settings.metrics {
            metrics.record_invocation(&self.plugin.name);
        }

        match self
            .settings
            .invoker
            .invoke(definition, callback, self.subject)
            .await
        {
            Ok(value) => Some(value),
            Err(fault) => {
                if let Some(metrics) = &self.settings.metrics {
                    metrics.record_fault(&self.plugin.name, fault.fault.kind());
                }
                self.report.faults.push(fault);
                None
            }
        }
    }

    /// Store a provider's metadata and its result for the subject.
    ///
    /// The plugin row is written once, before the first provider of the pass.
    pub async fn store(
        &mut self,
        definition: &ProviderDefinition,
        value: ProviderValue,
    ) -> ControlFlow<()> {
        match self.write(definition, &value).await {
            Ok(()) => {
                self.report.stored += 1;
                if let Some(metrics) = &self.settings.metrics {
                    metrics.record_stored(&self.plugin.name);
                }
                ControlFlow::Continue(())
            }
            Err(e) => {
                error!(
                    plugin = %self.plugin.name,
                    method = %definition.method_name,
                    player = %self.subject.uuid,
                    error = %e,
                    "failed to store provider result"
                );
                if let Some(metrics) = &self.settings.metrics {
                    metrics.record_storage_error(&self.plugin.name);
                }
                self.report.storage_errors.push(StorageFailure {
                    method: Some(definition.method_name.clone()),
                    error: e,
                });
                match self.settings.options.storage_errors {
                    StorageErrorPolicy::Continue => ControlFlow::Continue(()),
                    StorageErrorPolicy::Abort => {
                        self.report.aborted = true;
                        ControlFlow::Break(())
                    }
                }
            }
        }
    }

    async fn write(
        &mut self,
        definition: &ProviderDefinition,
        value: &ProviderValue,
    ) -> Result<(), StorageError> {
        let sink = &self.settings.sink;
        if !self.plugin_written {
            sink.upsert_plugin(self.plugin).await?;
            self.plugin_written = true;
        }
        sink.upsert_provider_metadata(definition).await?;
        sink.upsert_result(self.subject.uuid, definition, value).await?;
        Ok(())
    }

    /// Record a provider whose prerequisite was never met.
    pub fn skip(&mut self, definition: &ProviderDefinition, requires: &Condition) {
        let reason = if self.report.ledger.has_outcome(requires.name()) {
            SkipReason::GatedOff
        } else {
            SkipReason::DependencyFailed
        };

        match (reason, self.settings.options.prerequisites) {
            (SkipReason::DependencyFailed, PrerequisitePolicy::Strict) => {
                warn!(
                    plugin = %self.plugin.name,
                    method = %definition.method_name,
                    player = %self.subject.uuid,
                    requires = %requires,
                    "provider skipped, its prerequisite was never established"
                );
                if let Some(metrics) = &self.settings.metrics {
                    metrics.record_skip(&self.plugin.name, reason.as_str());
                }
            }
            _ => debug!(
                plugin = %self.plugin.name,
                method = %definition.method_name,
                player = %self.subject.uuid,
                requires = %requires,
                reason = reason.as_str(),
                "provider skipped"
            ),
        }

        self.report.skipped.push(SkippedProvider {
            method: definition.method_name.clone(),
            requires: requires.clone(),
            reason,
        });
    }

    pub fn finish(self) -> GatherReport {
        self.report
    }
}
