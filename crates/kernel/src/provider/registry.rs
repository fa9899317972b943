//! Provider registry - indexes which plugins supply which providers.
//!
//! The registry is read on every gathering pass and written only when a
//! registrar (re)registers providers. Each plugin's providers live in an
//! immutable [`ProviderSet`]; mutation swaps in a new set, so a pass that
//! took a snapshot keeps a stable view until it finishes.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tally_sdk::Evaluable;
use tracing::{debug, info};

use super::definition::{PluginDefinition, ProviderDefinition, ProviderScope, ValueKind};
use super::error::RegistrationError;

/// A provider callback, typed by the value it produces.
#[derive(Clone)]
pub enum ProviderCallback {
    Boolean(Arc<dyn Evaluable<bool>>),
    Number(Arc<dyn Evaluable<i64>>),
    Double(Arc<dyn Evaluable<f64>>),
    Percentage(Arc<dyn Evaluable<f64>>),
    String(Arc<dyn Evaluable<String>>),
}

impl ProviderCallback {
    /// Value kind this callback produces.
    pub fn kind(&self) -> ValueKind {
        match self {
            ProviderCallback::Boolean(_) => ValueKind::Boolean,
            ProviderCallback::Number(_) => ValueKind::Number,
            ProviderCallback::Double(_) => ValueKind::Double,
            ProviderCallback::Percentage(_) => ValueKind::Percentage,
            ProviderCallback::String(_) => ValueKind::String,
        }
    }
}

impl std::fmt::Debug for ProviderCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ProviderCallback").field(&self.kind()).finish()
    }
}

/// A provider definition paired with its callback.
#[derive(Debug, Clone)]
pub struct RegisteredProvider {
    pub definition: Arc<ProviderDefinition>,
    pub callback: ProviderCallback,
}

/// Point-in-time view of one plugin's providers, in registration order.
#[derive(Debug, Clone)]
pub struct ProviderSet {
    plugin: PluginDefinition,
    providers: Vec<RegisteredProvider>,
}

impl ProviderSet {
    fn empty(plugin: PluginDefinition) -> Self {
        Self {
            plugin,
            providers: Vec::new(),
        }
    }

    /// The owning plugin.
    pub fn plugin(&self) -> &PluginDefinition {
        &self.plugin
    }

    /// All providers, in registration order.
    pub fn providers(&self) -> &[RegisteredProvider] {
        &self.providers
    }

    /// Providers of one kind and scope, in registration order.
    pub fn of(
        &self,
        kind: ValueKind,
        scope: ProviderScope,
    ) -> impl Iterator<Item = &RegisteredProvider> {
        self.providers
            .iter()
            .filter(move |p| p.definition.kind == kind && p.definition.scope == scope)
    }

    /// Boolean providers of a scope with their typed callbacks.
    pub fn booleans(
        &self,
        scope: ProviderScope,
    ) -> Vec<(Arc<ProviderDefinition>, Arc<dyn Evaluable<bool>>)> {
        self.providers
            .iter()
            .filter(|p| p.definition.scope == scope)
            .filter_map(|p| match &p.callback {
                ProviderCallback::Boolean(cb) => Some((Arc::clone(&p.definition), Arc::clone(cb))),
                _ => None,
            })
            .collect()
    }

    /// Look up a provider by method name.
    pub fn get(&self, method_name: &str) -> Option<&RegisteredProvider> {
        self.providers
            .iter()
            .find(|p| p.definition.method_name == method_name)
    }

    /// Number of providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the plugin has no providers.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Registry mapping plugin names to their provider sets.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    plugins: RwLock<HashMap<String, Arc<ProviderSet>>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin, or update its metadata if already registered.
    ///
    /// Providers registered earlier for the plugin are kept.
    pub fn register_plugin(&self, plugin: PluginDefinition) -> Result<(), RegistrationError> {
        plugin.validate()?;

        let mut plugins = self.plugins.write();
        let set = match plugins.get(&plugin.name) {
            Some(existing) => ProviderSet {
                plugin: plugin.clone(),
                providers: existing.providers.clone(),
            },
            None => {
                info!(plugin = %plugin.name, "registered plugin");
                ProviderSet::empty(plugin.clone())
            }
        };
        plugins.insert(plugin.name, Arc::new(set));
        Ok(())
    }

    /// Register a provider for an already registered plugin.
    ///
    /// Registering the same `(plugin, method)` again replaces the previous
    /// entry in place, keeping its position in registration order.
    pub fn register(
        &self,
        mut definition: ProviderDefinition,
        callback: ProviderCallback,
    ) -> Result<Arc<ProviderDefinition>, RegistrationError> {
        definition.validate()?;

        if definition.kind != callback.kind() {
            return Err(RegistrationError::KindMismatch {
                plugin: definition.plugin_name.clone(),
                method: definition.method_name.clone(),
                declared: definition.kind.to_string(),
                actual: callback.kind().to_string(),
            });
        }

        let definition = Arc::new(definition);
        let entry = RegisteredProvider {
            definition: Arc::clone(&definition),
            callback,
        };

        let mut plugins = self.plugins.write();
        let current = plugins
            .get(&definition.plugin_name)
            .ok_or_else(|| RegistrationError::unknown_plugin(&definition.plugin_name))?;

        let mut set = ProviderSet::clone(current);
        match set
            .providers
            .iter()
            .position(|p| p.definition.method_name == definition.method_name)
        {
            Some(index) => {
                debug!(
                    plugin = %definition.plugin_name,
                    method = %definition.method_name,
                    "re-registered provider"
                );
                set.providers[index] = entry;
            }
            None => {
                debug!(
                    plugin = %definition.plugin_name,
                    method = %definition.method_name,
                    kind = %definition.kind,
                    "registered provider"
                );
                set.providers.push(entry);
            }
        }
        plugins.insert(definition.plugin_name.clone(), Arc::new(set));

        Ok(definition)
    }

    /// Remove one provider. Returns whether it was registered.
    pub fn unregister(&self, plugin: &str, method_name: &str) -> bool {
        let mut plugins = self.plugins.write();
        let Some(current) = plugins.get(plugin) else {
            return false;
        };
        if current.get(method_name).is_none() {
            return false;
        }

        let mut set = ProviderSet::clone(current);
        set.providers
            .retain(|p| p.definition.method_name != method_name);
        plugins.insert(plugin.to_string(), Arc::new(set));
        true
    }

    /// Remove a plugin and all its providers. Returns whether it was registered.
    pub fn unregister_plugin(&self, plugin: &str) -> bool {
        let removed = self.plugins.write().remove(plugin).is_some();
        if removed {
            info!(plugin = %plugin, "unregistered plugin");
        }
        removed
    }

    /// Snapshot a plugin's providers.
    ///
    /// The returned set is immutable; later registrations are not visible
    /// through it.
    pub fn snapshot(&self, plugin: &str) -> Option<Arc<ProviderSet>> {
        self.plugins.read().get(plugin).cloned()
    }

    /// Names of all registered plugins, sorted.
    pub fn plugin_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.plugins.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Total number of registered providers across plugins.
    pub fn provider_count(&self) -> usize {
        self.plugins.read().values().map(|set| set.len()).sum()
    }
}
