//! Tally Provider SDK
//!
//! Capability traits and metadata types for Tally data providers.
//! Registrars depend on this crate and hand the kernel `Evaluable`
//! implementations; the kernel never sees concrete provider types.

pub mod provider;
pub mod types;

pub use provider::{API_VERSION, Evaluable, Fault, FnProvider, from_fn, from_optional_fn};
pub use types::{Color, Family, Icon};

pub mod prelude {
    pub use crate::provider::*;
    pub use crate::types::*;
}
