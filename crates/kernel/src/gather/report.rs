//! Outcome of a gathering pass.

use serde::Serialize;
use uuid::Uuid;

use super::invoker::ProviderFault;
use super::ledger::{Condition, ConditionLedger};
use crate::storage::StorageError;

/// Why a provider was left unresolved at the end of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The prerequisite was decided the other way.
    GatedOff,
    /// Nothing established the prerequisite: its provider failed, was
    /// itself skipped, or is not registered.
    DependencyFailed,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::GatedOff => "gated_off",
            SkipReason::DependencyFailed => "dependency_failed",
        }
    }
}

/// A provider whose prerequisite was never met.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedProvider {
    pub method: String,
    pub requires: Condition,
    pub reason: SkipReason,
}

/// A storage write that failed during a pass.
#[derive(Debug)]
pub struct StorageFailure {
    pub method: Option<String>,
    pub error: StorageError,
}

/// Everything one pass did for one plugin and subject.
#[derive(Debug)]
pub struct GatherReport {
    pub plugin: String,
    pub subject: Uuid,
    /// Conditions established by the pass, or the gating ledger for value passes.
    pub ledger: ConditionLedger,
    pub rounds: usize,
    /// Methods invoked, in invocation order.
    pub invoked: Vec<String>,
    /// Results written to storage.
    pub stored: usize,
    pub faults: Vec<ProviderFault>,
    pub skipped: Vec<SkippedProvider>,
    pub storage_errors: Vec<StorageFailure>,
    /// The pass stopped at a storage error.
    pub aborted: bool,
}

impl GatherReport {
    pub(crate) fn new(plugin: &str, subject: Uuid, ledger: ConditionLedger) -> Self {
        Self {
            plugin: plugin.to_string(),
            subject,
            ledger,
            rounds: 0,
            invoked: Vec::new(),
            stored: 0,
            faults: Vec::new(),
            skipped: Vec::new(),
            storage_errors: Vec::new(),
            aborted: false,
        }
    }

    /// Whether the pass ran without faults or storage errors.
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty() && self.storage_errors.is_empty() && !self.aborted
    }

    /// Whether `method` was invoked during the pass.
    pub fn was_invoked(&self, method: &str) -> bool {
        self.invoked.iter().any(|m| m == method)
    }

    /// The skip entry for `method`, if it was left unresolved.
    pub fn skip_of(&self, method: &str) -> Option<&SkippedProvider> {
        self.skipped.iter().find(|s| s.method == method)
    }
}
