//! Condition-resolving pass over a plugin's boolean providers.
//!
//! Providers may require a condition that another provider of the same
//! plugin establishes. Registration order says nothing about dependency
//! order, so the pass relaxes to a fixed point: every round evaluates each
//! unresolved provider whose prerequisite now holds, and the pass ends when
//! a round resolves nothing. A chain of depth `k` resolves in at most `k`
//! rounds; `n` providers cost at most `n * (n + 1) / 2` prerequisite checks.
//!
//! A provider is resolved once it has been evaluated, whether it produced
//! a value or failed. Failed providers are not retried within the pass.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Instant;

use tally_sdk::Evaluable;
use tracing::debug;

use super::invoker::Subject;
use super::ledger::{Condition, ConditionLedger};
use super::options::GatherOptions;
use super::pass::{Pass, Settings};
use super::report::GatherReport;
use crate::metrics::GatherMetrics;
use crate::provider::{ProviderDefinition, ProviderScope, ProviderSet};
use crate::storage::{ProviderValue, StorageSink};

type BooleanProvider = (Arc<ProviderDefinition>, Arc<dyn Evaluable<bool>>);

/// Gathers one plugin's boolean player providers for a subject.
#[derive(Debug, Clone)]
pub struct BooleanGatherer {
    providers: Arc<ProviderSet>,
    settings: Settings,
}

impl BooleanGatherer {
    /// Create a gatherer over a registry snapshot.
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

    /// Run a pass and return the conditions it established.
    pub async fn gather(&self, subject: &Subject) -> ConditionLedger {
        self.gather_with_report(subject).await.ledger
    }

    /// Run a pass and return everything it did.
    pub async fn gather_with_report(&self, subject: &Subject) -> GatherReport {
        let started = Instant::now();
        let plugin = self.providers.plugin();
        let mut pass = Pass::new(&self.settings, plugin, subject, ConditionLedger::new());
        let mut unresolved: Vec<BooleanProvider> = self.providers.booleans(ProviderScope::Player);

        if self.relax(&mut pass, &mut unresolved).await.is_continue() {
            for (definition, _) in &unresolved {
                if let Some(requires) = &definition.condition {
                    pass.skip(definition, requires);
                }
            }
        }

        let report = pass.finish();
        debug!(
            plugin = %report.plugin,
            player = %subject.uuid,
            rounds = report.rounds,
            invoked = report.invoked.len(),
            skipped = report.skipped.len(),
            faults = report.faults.len(),
            conditions = report.ledger.len(),
            "boolean pass complete"
        );
        if let Some(metrics) = &self.settings.metrics {
            metrics.record_pass(&report.plugin, started.elapsed().as_secs_f64());
        }
        report
    }

    /// Evaluate rounds until one resolves nothing or nothing is left.
    async fn relax(
        &self,
        pass: &mut Pass<'_>,
        unresolved: &mut Vec<BooleanProvider>,
    ) -> ControlFlow<()> {
        while !unresolved.is_empty() {
            pass.report.rounds += 1;
            let mut resolved = vec![false; unresolved.len()];

            for (index, (definition, callback)) in unresolved.iter().enumerate() {
                if !prerequisite_met(&pass.report.ledger, definition.condition.as_ref()) {
                    continue;
                }
                resolved[index] = true;

                let Some(result) = pass.invoke(definition, callback).await else {
                    continue;
                };
                if let Some(provided) = &definition.provided_condition {
                    pass.report
                        .ledger
                        .record(Condition::from_result(provided, result));
                }
                pass.store(definition, ProviderValue::Boolean(result)).await?;
            }

            if !resolved.contains(&true) {
                break;
            }
            let mut flags = resolved.into_iter();
            unresolved.retain(|_| !flags.next().unwrap_or(false));
        }
        ControlFlow::Continue(())
    }
}

fn prerequisite_met(ledger: &ConditionLedger, condition: Option<&Condition>) -> bool {
    condition.is_none_or(|c| ledger.is_met(c))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use tally_test_utils::{Misbehavior, counting, faulty, returns};
    use uuid::Uuid;

    use super::*;
    use crate::gather::SkipReason;
    use crate::provider::{PluginDefinition, ProviderCallback, ProviderRegistry};
    use crate::storage::MemoryExecutor;

    fn registry_with(providers: Vec<(ProviderDefinition, ProviderCallback)>) -> ProviderRegistry {
        let registry = ProviderRegistry::new();
        registry
            .register_plugin(PluginDefinition::new("essentials"))
            .unwrap();
        for (definition, callback) in providers {
            registry
                .register(definition, callback)
                .unwrap();
        }
        registry
    }

    fn gatherer(registry: &ProviderRegistry, memory: &Arc<MemoryExecutor>) -> BooleanGatherer {
        let sink = StorageSink::new(memory.clone(), Uuid::from_u128(7));
        BooleanGatherer::new(registry.snapshot("essentials").unwrap(), sink)
    }

    fn subject() -> Subject {
        Subject::new(Uuid::from_u128(1), "Notch")
    }

    #[tokio::test]
    async fn provided_condition_unlocks_dependent() {
        let registry = registry_with(vec![
            (
                ProviderDefinition::boolean("essentials", "isVip").requires("isOnline"),
                ProviderCallback::Boolean(returns(true)),
            ),
            (
                ProviderDefinition::boolean("essentials", "isOnlineNow").provides("isOnline"),
                ProviderCallback::Boolean(returns(true)),
            ),
        ]);
        let memory = Arc::new(MemoryExecutor::new());

        let report = gatherer(&registry, &memory)
            .gather_with_report(&subject())
            .await;

        assert_eq!(report.invoked, vec!["isOnlineNow", "isVip"]);
        assert_eq!(report.rounds, 2);
        assert_eq!(report.stored, 2);
        assert!(report.ledger.is_satisfied("isOnline"));
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn failed_provider_is_not_retried() {
        let broken = faulty(Misbehavior::Errors);
        let waiting = counting(true);
        let registry = registry_with(vec![
            (
                ProviderDefinition::boolean("essentials", "isBanned").provides("banned"),
                ProviderCallback::Boolean(broken.clone()),
            ),
            (
                ProviderDefinition::boolean("essentials", "appeal").requires("banned"),
                ProviderCallback::Boolean(waiting.clone()),
            ),
        ]);
        let memory = Arc::new(MemoryExecutor::new());

        let report = gatherer(&registry, &memory)
            .gather_with_report(&subject())
            .await;

        assert_eq!(broken.calls(), 1);
        assert_eq!(waiting.calls(), 0);
        assert_eq!(report.faults.len(), 1);
        assert_eq!(report.stored, 0);
        assert_eq!(memory.player_value_count(), 0);
        assert_eq!(
            report.skip_of("appeal").map(|s| s.reason),
            Some(SkipReason::DependencyFailed)
        );
    }

    #[tokio::test]
    async fn empty_plugin_runs_no_rounds() {
        let registry = registry_with(Vec::new());
        let memory = Arc::new(MemoryExecutor::new());

        let report = gatherer(&registry, &memory)
            .gather_with_report(&subject())
            .await;

        assert_eq!(report.rounds, 0);
        assert!(report.ledger.is_empty());
        assert!(memory.plugins().is_empty());
    }

    #[test]
    fn missing_prerequisite_is_met() {
        let ledger = ConditionLedger::new();
        assert!(prerequisite_met(&ledger, None));
        assert!(!prerequisite_met(&ledger, Some(&Condition::parse("x"))));
        assert!(!prerequisite_met(&ledger, Some(&Condition::parse("not_x"))));
    }
}
