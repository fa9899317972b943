//! Prometheus metrics for gathering passes.
//!
//! Provides gathering metrics in Prometheus format.

use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;

/// Per-plugin labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct PluginLabels {
    pub plugin: String,
}

/// Provider fault labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct FaultLabels {
    pub plugin: String,
    pub kind: String,
}

/// Skipped provider labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct SkipLabels {
    pub plugin: String,
    pub reason: String,
}

/// Gathering metrics.
pub struct GatherMetrics {
    registry: Registry,

    /// Provider callbacks invoked, by plugin.
    pub invocations: Family<PluginLabels, Counter>,

    /// Provider faults, by plugin and fault kind.
    pub faults: Family<FaultLabels, Counter>,

    /// Providers left unresolved at the end of a pass.
    pub skipped: Family<SkipLabels, Counter>,

    /// Failed storage writes, by plugin.
    pub storage_errors: Family<PluginLabels, Counter>,

    /// Results stored, by plugin.
    pub stored: Family<PluginLabels, Counter>,

    /// Duration of one plugin's pass for one subject.
    pub pass_duration_seconds: Family<PluginLabels, Histogram>,
}

impl GatherMetrics {
    /// Create a new metrics registry.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let invocations = Family::<PluginLabels, Counter>::default();
        registry.register(
            "provider_invocations_total",
            "Provider callbacks invoked",
            invocations.clone(),
        );

        let faults = Family::<FaultLabels, Counter>::default();
        registry.register(
            "provider_faults_total",
            "Provider callbacks that failed",
            faults.clone(),
        );

        let skipped = Family::<SkipLabels, Counter>::default();
        registry.register(
            "provider_skipped_total",
            "Providers whose prerequisite was never met",
            skipped.clone(),
        );

        let storage_errors = Family::<PluginLabels, Counter>::default();
        registry.register(
            "gather_storage_errors_total",
            "Failed storage writes during gathering",
            storage_errors.clone(),
        );

        let stored = Family::<PluginLabels, Counter>::default();
        registry.register(
            "gather_results_stored_total",
            "Provider results stored",
            stored.clone(),
        );

        let pass_duration_seconds = Family::<PluginLabels, Histogram>::new_with_constructor(|| {
            Histogram::new(exponential_buckets(0.0001, 2.0, 16))
        });
        registry.register(
            "gather_pass_duration_seconds",
            "Gathering pass duration in seconds",
            pass_duration_seconds.clone(),
        );

        Self {
            registry,
            invocations,
            faults,
            skipped,
            storage_errors,
            stored,
            pass_duration_seconds,
        }
    }

    /// Record a provider invocation.
    pub fn record_invocation(&self, plugin: &str) {
        self.invocations.get_or_create(&plugin_labels(plugin)).inc();
    }

    /// Record a provider fault.
    pub fn record_fault(&self, plugin: &str, kind: &str) {
        let labels = FaultLabels {
            plugin: plugin.to_string(),
            kind: kind.to_string(),
        };
        self.faults.get_or_create(&labels).inc();
    }

    /// Record a provider left unresolved.
    pub fn record_skip(&self, plugin: &str, reason: &str) {
        let labels = SkipLabels {
            plugin: plugin.to_string(),
            reason: reason.to_string(),
        };
        self.skipped.get_or_create(&labels).inc();
    }

    /// Record a failed storage write.
    pub fn record_storage_error(&self, plugin: &str) {
        self.storage_errors.get_or_create(&plugin_labels(plugin)).inc();
    }

    /// Record a stored result.
    pub fn record_stored(&self, plugin: &str) {
        self.stored.get_or_create(&plugin_labels(plugin)).inc();
    }

    /// Record the duration of a pass.
    pub fn record_pass(&self, plugin: &str, duration_secs: f64) {
        self.pass_duration_seconds
            .get_or_create(&plugin_labels(plugin))
            .observe(duration_secs);
    }

    /// Encode metrics in Prometheus text format.
    ///
    /// # Panics
    ///
    /// Panics if Prometheus metric encoding to a `String` buffer fails,
    /// which the `fmt::Write` impl for `String` never does.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        #[allow(clippy::expect_used)]
        encode(&mut buffer, &self.registry).expect("encoding metrics");
        buffer
    }
}

impl Default for GatherMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GatherMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatherMetrics").finish()
    }
}

fn plugin_labels(plugin: &str) -> PluginLabels {
    PluginLabels {
        plugin: plugin.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn encode_includes_registered_metrics() {
        let metrics = GatherMetrics::new();
        metrics.record_invocation("essentials");
        metrics.record_fault("essentials", "panic");
        metrics.record_skip("essentials", "gated_off");
        metrics.record_pass("essentials", 0.002);

        let output = metrics.encode();
        assert!(output.contains("provider_invocations_total"));
        assert!(output.contains("provider_faults_total"));
        assert!(output.contains("kind=\"panic\""));
        assert!(output.contains("reason=\"gated_off\""));
        assert!(output.contains("gather_pass_duration_seconds"));
    }

    #[test]
    fn counters_accumulate_per_plugin() {
        let metrics = GatherMetrics::new();
        metrics.record_invocation("a");
        metrics.record_invocation("a");
        metrics.record_invocation("b");

        assert_eq!(metrics.invocations.get_or_create(&plugin_labels("a")).get(), 2);
        assert_eq!(metrics.invocations.get_or_create(&plugin_labels("b")).get(), 1);
    }
}
