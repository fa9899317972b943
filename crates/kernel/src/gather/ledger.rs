//! Condition ledger for one gathering pass.
//!
//! Boolean providers may declare a condition they provide. When such a
//! provider returns `true` the condition is satisfied; when it returns
//! `false` the negated condition (`not_<name>`) is satisfied instead.
//! Other providers gate on either form.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Prefix marking a negated condition in declared prerequisites.
pub const NEGATION_PREFIX: &str = "not_";

/// A condition outcome: the named condition held, or it was negated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "name", rename_all = "snake_case")]
pub enum Condition {
    Satisfied(String),
    Negated(String),
}

impl Condition {
    /// Parse a declared prerequisite: `"x"` or `"not_x"`.
    pub fn parse(declared: &str) -> Self {
        match declared.strip_prefix(NEGATION_PREFIX) {
            Some(name) => Condition::Negated(name.to_string()),
            None => Condition::Satisfied(declared.to_string()),
        }
    }

    /// The outcome a boolean provider's result establishes for `name`.
    pub fn from_result(name: &str, result: bool) -> Self {
        if result {
            Condition::Satisfied(name.to_string())
        } else {
            Condition::Negated(name.to_string())
        }
    }

    /// The underlying condition name, without any negation.
    pub fn name(&self) -> &str {
        match self {
            Condition::Satisfied(name) | Condition::Negated(name) => name,
        }
    }

    /// The recorded value that makes this condition hold.
    pub fn expects(&self) -> bool {
        matches!(self, Condition::Satisfied(_))
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::Satisfied(name) => f.write_str(name),
            Condition::Negated(name) => write!(f, "{NEGATION_PREFIX}{name}"),
        }
    }
}

/// Conditions established so far for one subject.
///
/// Satisfied and negated outcomes are tracked separately, so two providers
/// of the same name that disagree establish both `x` and `not_x`. Entries
/// are only ever added during a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionLedger {
    conditions: BTreeSet<Condition>,
}

impl ConditionLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a declared condition (`"x"` or `"not_x"`) holds.
    ///
    /// Unknown names are simply not satisfied.
    pub fn is_satisfied(&self, declared: &str) -> bool {
        self.is_met(&Condition::parse(declared))
    }

    /// Whether a parsed condition holds.
    pub fn is_met(&self, condition: &Condition) -> bool {
        self.conditions.contains(condition)
    }

    /// Mark a declared condition (`"x"` or `"not_x"`) satisfied.
    pub fn satisfy(&mut self, declared: &str) -> bool {
        self.record(Condition::parse(declared))
    }

    /// Record a condition outcome. Returns `true` if the ledger changed.
    pub fn record(&mut self, condition: Condition) -> bool {
        if self.conditions.contains(&condition) {
            return false;
        }
        trace!(condition = %condition, "condition recorded");
        self.conditions.insert(condition)
    }

    /// Whether any outcome, satisfied or negated, was recorded for `name`.
    pub fn has_outcome(&self, name: &str) -> bool {
        self.conditions.contains(&Condition::Satisfied(name.to_string()))
            || self.conditions.contains(&Condition::Negated(name.to_string()))
    }

    /// Fold another ledger's conditions into this one.
    pub fn merge(&mut self, other: &ConditionLedger) {
        self.conditions.extend(other.conditions.iter().cloned());
    }

    /// Recorded conditions, ordered by kind and then name.
    pub fn iter(&self) -> impl Iterator<Item = &Condition> + '_ {
        self.conditions.iter()
    }

    /// Number of recorded conditions.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}
