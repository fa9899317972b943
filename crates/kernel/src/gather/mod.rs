//! Gathering of provider values for a subject.
//!
//! This module provides:
//! - ConditionLedger: conditions established during a pass
//! - CallbackInvoker: isolated execution of provider callbacks
//! - BooleanGatherer: fixed-point pass resolving provider prerequisites
//! - ValueGatherer: single pass over value providers, gated on conditions
//! - ExtensionService / GatherPool: passes over every plugin and many subjects

mod boolean;
mod invoker;
mod ledger;
mod options;
mod pass;
mod pool;
mod report;
mod service;
mod values;

pub use boolean::BooleanGatherer;
pub use invoker::{CallbackInvoker, ProviderFault, Subject};
pub use ledger::{Condition, ConditionLedger, NEGATION_PREFIX};
pub use options::{GatherOptions, PrerequisitePolicy, StorageErrorPolicy};
pub use pool::{GatherPool, SubjectReport};
pub use report::{GatherReport, SkipReason, SkippedProvider, StorageFailure};
pub use service::{ExtensionService, PluginReport};
pub use values::ValueGatherer;
