//! Single pass over a plugin's non-boolean player providers.
//!
//! Value providers establish no conditions, so one round suffices. Each one
//! is gated on the ledger produced by the boolean pass for the same subject.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use super::invoker::Subject;
use super::ledger::ConditionLedger;
use super::options::GatherOptions;
use super::pass::{Pass, Settings};
use super::report::GatherReport;
use crate::metrics::GatherMetrics;
use crate::provider::{ProviderCallback, ProviderScope, ProviderSet, RegisteredProvider};
use crate::storage::{ProviderValue, StorageSink};

/// Gathers one plugin's number, double, percentage and string providers.
#[derive(Debug, Clone)]
pub struct ValueGatherer {
    providers: Arc<ProviderSet>,
    settings: Settings,
}

impl ValueGatherer {
    pub fn new(providers: Arc<ProviderSet>, sink: StorageSink) -> Self {
        Self {
            providers,
            settings: Settings::new(sink),
        }
    }

    pub fn with_options(mut self, options: GatherOptions) -> Self {
        self.settings.options = options;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<GatherMetrics>) -> Self {
        self.settings.metrics = Some(metrics);
        self
    }

    /// Evaluate every value provider whose prerequisite holds in `conditions`.
    pub async fn gather(&self, subject: &Subject, conditions: &ConditionLedger) -> GatherReport {
        let started = Instant::now();
        let plugin = self.providers.plugin();
        let mut pass = Pass::new(&self.settings, plugin, subject, conditions.clone());
        pass.report.rounds = 1;

        for provider in self.providers.providers() {
            if provider.definition.scope != ProviderScope::Player {
                continue;
            }
            if matches!(provider.callback, ProviderCallback::Boolean(_)) {
                continue;
            }
            if self.evaluate(&mut pass, provider).await.is_break() {
                break;
            }
        }

        let report = pass.finish();
        debug!(
            plugin = %report.plugin,
            player = %subject.uuid,
            invoked = report.invoked.len(),
            skipped = report.skipped.len(),
            faults = report.faults.len(),
            "value pass complete"
        );
        if let Some(metrics) = &self.settings.metrics {
            metrics.record_pass(&report.plugin, started.elapsed().as_secs_f64());
        }
        report
    }

    async fn evaluate(&self, pass: &mut Pass<'_>, provider: &RegisteredProvider) -> ControlFlow<()> {
        let definition = &provider.definition;
        if let Some(requires) = &definition.condition {
            if !pass.report.ledger.is_met(requires) {
                pass.skip(definition, requires);
                return ControlFlow::Continue(());
            }
        }

        let value = match &provider.callback {
            ProviderCallback::Number(cb) => {
                pass.invoke(definition, cb).await.map(ProviderValue::Number)
            }
            ProviderCallback::Double(cb) => {
                pass.invoke(definition, cb).await.map(ProviderValue::Double)
            }
            ProviderCallback::Percentage(cb) => {
                pass.invoke(definition, cb).await.map(ProviderValue::Percentage)
            }
            ProviderCallback::String(cb) => {
                pass.invoke(definition, cb).await.map(ProviderValue::string)
            }
            ProviderCallback::Boolean(_) => None,
        };

        match value {
            Some(value) => pass.store(definition, value).await,
            None => ControlFlow::Continue(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use tally_test_utils::{Misbehavior, counting, faulty, returns};
    use uuid::Uuid;

    use super::*;
    use crate::provider::{PluginDefinition, ProviderDefinition, ProviderRegistry, ValueKind};
    use crate::storage::MemoryExecutor;

    fn subject() -> Subject {
        Subject::new(Uuid::from_u128(3), "jeb_")
    }

    #[tokio::test]
    async fn values_are_gated_on_conditions() {
        let registry = ProviderRegistry::new();
        registry
            .register_plugin(PluginDefinition::new("economy"))
            .unwrap();
        let balance = counting(1200_i64);
        registry
            .register(
                ProviderDefinition::new("economy", "balance", ValueKind::Number)
                    .requires("hasAccount"),
                ProviderCallback::Number(balance.clone()),
            )
            .unwrap();
        registry
            .register(
                ProviderDefinition::new("economy", "rank", ValueKind::String),
                ProviderCallback::String(returns("Gold".to_string())),
            )
            .unwrap();

        let memory = Arc::new(MemoryExecutor::new());
        let gatherer = ValueGatherer::new(
            registry.snapshot("economy").unwrap(),
            StorageSink::new(memory.clone(), Uuid::from_u128(7)),
        );

        let report = gatherer.gather(&subject(), &ConditionLedger::new()).await;
        assert_eq!(balance.calls(), 0);
        assert_eq!(report.invoked, vec!["rank"]);
        assert_eq!(report.skipped.len(), 1);

        let mut conditions = ConditionLedger::new();
        conditions.satisfy("hasAccount");
        let report = gatherer.gather(&subject(), &conditions).await;
        assert_eq!(balance.calls(), 1);
        assert_eq!(report.stored, 2);
        assert_eq!(
            memory.player_value("economy", "balance", subject().uuid),
            Some(ProviderValue::Number(1200))
        );
    }

    #[tokio::test]
    async fn faults_do_not_stop_other_values() {
        let registry = ProviderRegistry::new();
        registry
            .register_plugin(PluginDefinition::new("economy"))
            .unwrap();
        registry
            .register(
                ProviderDefinition::new("economy", "debt", ValueKind::Double),
                ProviderCallback::Double(faulty(Misbehavior::Panics)),
            )
            .unwrap();
        registry
            .register(
                ProviderDefinition::new("economy", "share", ValueKind::Percentage),
                ProviderCallback::Percentage(returns(0.42_f64)),
            )
            .unwrap();

        let memory = Arc::new(MemoryExecutor::new());
        let report = ValueGatherer::new(
            registry.snapshot("economy").unwrap(),
            StorageSink::new(memory.clone(), Uuid::from_u128(7)),
        )
        .gather(&subject(), &ConditionLedger::new())
        .await;

        assert_eq!(report.faults.len(), 1);
        assert_eq!(report.stored, 1);
        assert_eq!(
            memory.player_value("economy", "share", subject().uuid),
            Some(ProviderValue::Percentage(0.42))
        );
    }
}
