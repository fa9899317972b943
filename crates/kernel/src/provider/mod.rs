//! Provider definitions and the provider registry.
//!
//! This module handles:
//! - Provider and plugin metadata with validation
//! - Typed provider callbacks
//! - The copy-on-write registry gathering passes snapshot from

mod definition;
mod error;
mod registry;

pub use definition::{
    DEFAULT_TAB, DESCRIPTION_MAX, NAME_MAX, PluginDefinition, ProviderDefinition, ProviderScope,
    TEXT_MAX, ValueKind,
};
pub use error::RegistrationError;
pub use registry::{ProviderCallback, ProviderRegistry, ProviderSet, RegisteredProvider};
