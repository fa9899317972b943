//! Tally kernel library.
//!
//! Collects plugin-supplied values about players, resolves the conditions
//! providers gate on, and stores provider metadata and latest results.
//! Embedders register providers in a [`provider::ProviderRegistry`], then
//! run passes through [`gather::ExtensionService`] or [`gather::GatherPool`].

pub mod config;
pub mod db;
pub mod gather;
pub mod metrics;
pub mod provider;
pub mod storage;
pub mod telemetry;
