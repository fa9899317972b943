//! Provider and plugin definitions.
//!
//! A definition is the metadata a registrar declares for one provider
//! method: display text, ordering, the condition it waits on and the
//! condition it provides. Identity is `(plugin_name, method_name)`.

use serde::{Deserialize, Serialize};
use tally_sdk::Icon;
use tracing::warn;

use super::error::RegistrationError;
use crate::gather::{Condition, NEGATION_PREFIX};

/// Longest plugin, provider and condition name accepted by storage.
pub const NAME_MAX: usize = 50;

/// Longest display text accepted by storage.
pub const TEXT_MAX: usize = 50;

/// Longest description accepted by storage.
pub const DESCRIPTION_MAX: usize = 150;

/// Tab used when a provider does not declare one.
pub const DEFAULT_TAB: &str = "No Tab";

/// Declared type of the value a provider produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Boolean,
    Number,
    Double,
    Percentage,
    String,
}

impl ValueKind {
    /// Stored name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::Double => "double",
            ValueKind::Percentage => "percentage",
            ValueKind::String => "string",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a provider describes players or the server itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderScope {
    #[default]
    Player,
    Server,
}

/// A plugin contributing providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDefinition {
    /// Plugin name, unique per server.
    pub name: String,
    /// Icon shown next to the plugin's data.
    #[serde(default)]
    pub icon: Icon,
}

impl PluginDefinition {
    /// Create a plugin definition with the default icon.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: Icon::default(),
        }
    }

    /// Set the icon.
    pub fn with_icon(mut self, icon: Icon) -> Self {
        self.icon = icon;
        self
    }

    /// Check the plugin name is storable.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        if self.name.trim().is_empty() {
            return Err(RegistrationError::InvalidPlugin {
                plugin: self.name.clone(),
                details: "name must not be empty".to_string(),
            });
        }
        if self.name.chars().count() > NAME_MAX {
            return Err(RegistrationError::InvalidPlugin {
                plugin: self.name.clone(),
                details: format!("name must be at most {NAME_MAX} characters"),
            });
        }
        Ok(())
    }
}

/// Metadata for one provider method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDefinition {
    /// Owning plugin.
    pub plugin_name: String,

    /// Provider method name, unique within the plugin.
    pub method_name: String,

    /// Display text.
    pub text: String,

    /// Optional longer description.
    pub description: Option<String>,

    /// Display priority (lower sorts first).
    pub priority: i32,

    /// Condition that must hold before this provider runs.
    pub condition: Option<Condition>,

    /// Condition this provider establishes (boolean providers only).
    pub provided_condition: Option<String>,

    /// Whether the value is hidden from display.
    pub hidden: bool,

    /// Owning tab name; `None` means [`DEFAULT_TAB`].
    pub tab: Option<String>,

    /// Icon shown next to the value.
    pub icon: Icon,

    /// Player or server scope.
    pub scope: ProviderScope,

    /// Declared value kind.
    pub kind: ValueKind,
}

impl ProviderDefinition {
    /// Create a definition with display text equal to the method name.
    pub fn new(plugin_name: impl Into<String>, method_name: impl Into<String>, kind: ValueKind) -> Self {
        let method_name = method_name.into();
        Self {
            plugin_name: plugin_name.into(),
            text: method_name.clone(),
            method_name,
            description: None,
            priority: 0,
            condition: None,
            provided_condition: None,
            hidden: false,
            tab: None,
            icon: Icon::default(),
            scope: ProviderScope::Player,
            kind,
        }
    }

    /// Boolean player provider.
    pub fn boolean(plugin_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self::new(plugin_name, method_name, ValueKind::Boolean)
    }

    /// Set the display text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Require a condition, written as `"name"` or `"not_name"`.
    pub fn requires(mut self, condition: &str) -> Self {
        self.condition = Some(Condition::parse(condition));
        self
    }

    /// Declare the condition this provider establishes.
    pub fn provides(mut self, condition: impl Into<String>) -> Self {
        self.provided_condition = Some(condition.into());
        self
    }

    /// Hide the value from display.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Place the value on a tab.
    pub fn with_tab(mut self, tab: impl Into<String>) -> Self {
        self.tab = Some(tab.into());
        self
    }

    /// Set the icon.
    pub fn with_icon(mut self, icon: Icon) -> Self {
        self.icon = icon;
        self
    }

    /// Set the scope.
    pub fn with_scope(mut self, scope: ProviderScope) -> Self {
        self.scope = scope;
        self
    }

    /// Tab name used for storage.
    pub fn tab_name(&self) -> &str {
        self.tab.as_deref().unwrap_or(DEFAULT_TAB)
    }

    /// Validate the definition, truncating over-long display fields.
    pub fn validate(&mut self) -> Result<(), RegistrationError> {
        let invalid = |details: &str| {
            RegistrationError::invalid(&self.plugin_name, &self.method_name, details)
        };

        if self.plugin_name.trim().is_empty() {
            return Err(invalid("plugin name must not be empty"));
        }
        if self.method_name.trim().is_empty() {
            return Err(invalid("method name must not be empty"));
        }
        if self.method_name.chars().count() > NAME_MAX {
            return Err(invalid("method name is longer than 50 characters"));
        }
        if let Some(condition) = &self.condition {
            if condition.name().is_empty() {
                return Err(invalid("required condition has an empty name"));
            }
        }
        if let Some(provided) = &self.provided_condition {
            if provided.is_empty() {
                return Err(invalid("provided condition has an empty name"));
            }
            if provided.starts_with(NEGATION_PREFIX) {
                return Err(invalid(
                    "provided condition must not start with 'not_', negation is recorded automatically",
                ));
            }
            if self.kind != ValueKind::Boolean {
                return Err(invalid("only boolean providers can provide conditions"));
            }
        }

        if self.text.trim().is_empty() {
            self.text = self.method_name.clone();
        }
        self.text = truncate(&self.plugin_name, &self.method_name, "text", &self.text, TEXT_MAX);
        if let Some(description) = &self.description {
            self.description = Some(truncate(
                &self.plugin_name,
                &self.method_name,
                "description",
                description,
                DESCRIPTION_MAX,
            ));
        }
        if let Some(condition) = &self.condition {
            let name = truncate(
                &self.plugin_name,
                &self.method_name,
                "required condition",
                condition.name(),
                NAME_MAX,
            );
            self.condition = Some(match condition {
                Condition::Satisfied(_) => Condition::Satisfied(name),
                Condition::Negated(_) => Condition::Negated(name),
            });
        }
        if let Some(provided) = &self.provided_condition {
            self.provided_condition = Some(truncate(
                &self.plugin_name,
                &self.method_name,
                "provided condition",
                provided,
                NAME_MAX,
            ));
        }
        if let Some(tab) = &self.tab {
            self.tab = Some(truncate(&self.plugin_name, &self.method_name, "tab", tab, NAME_MAX));
        }

        Ok(())
    }
}

fn truncate(plugin: &str, method: &str, field: &str, value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    warn!(
        plugin = %plugin,
        method = %method,
        field = %field,
        max,
        "value too long, truncating"
    );
    value.chars().take(max).collect()
}
