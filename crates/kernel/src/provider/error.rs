//! Provider registration error types with clear, actionable messages.
//!
//! All errors include the plugin name and, where there is one, the
//! provider method, so a misconfigured registrar is easy to find.

use thiserror::Error;

/// Errors that can occur while registering providers.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Provider registered for a plugin that was never registered itself.
    #[error("plugin '{plugin}': not registered, call register_plugin first")]
    UnknownPlugin { plugin: String },

    /// The plugin name is unusable.
    #[error("plugin name '{plugin}' is invalid: {details}")]
    InvalidPlugin { plugin: String, details: String },

    /// The provider definition failed validation.
    #[error("plugin '{plugin}': provider '{method}' is invalid: {details}")]
    InvalidDefinition {
        plugin: String,
        method: String,
        details: String,
    },

    /// The declared value kind does not match the supplied callback.
    #[error("plugin '{plugin}': provider '{method}' declares {declared} but callback produces {actual}")]
    KindMismatch {
        plugin: String,
        method: String,
        declared: String,
        actual: String,
    },
}

impl RegistrationError {
    /// Create an invalid definition error.
    pub fn invalid(
        plugin: impl Into<String>,
        method: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self::InvalidDefinition {
            plugin: plugin.into(),
            method: method.into(),
            details: details.into(),
        }
    }

    /// Create an unknown plugin error.
    pub fn unknown_plugin(plugin: impl Into<String>) -> Self {
        Self::UnknownPlugin {
            plugin: plugin.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_actionable() {
        let err = RegistrationError::unknown_plugin("essentials");
        let msg = err.to_string();
        assert!(msg.contains("essentials"));
        assert!(msg.contains("register_plugin"));
    }

    #[test]
    fn invalid_definition_names_method() {
        let err = RegistrationError::invalid("essentials", "isJailed", "empty text");
        let msg = err.to_string();
        assert!(msg.contains("isJailed"));
        assert!(msg.contains("empty text"));
    }
}
