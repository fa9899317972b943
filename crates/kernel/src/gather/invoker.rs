//! Isolated execution of provider callbacks.
//!
//! Callbacks are third-party code. Each one runs on tokio's blocking pool so
//! a panic unwinds inside its own task and a slow callback never stalls the
//! async workers. Every failure is turned into a [`ProviderFault`].

use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tally_sdk::{API_VERSION, Evaluable, Fault};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::warn;
use uuid::Uuid;

use crate::provider::ProviderDefinition;

/// The entity a pass computes values about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    pub uuid: Uuid,
    pub name: String,
}

impl Subject {
    pub fn new(uuid: Uuid, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
        }
    }
}

/// A callback failure attributed to the provider that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{plugin} has invalid implementation, method {method} could not be evaluated: {fault}")]
pub struct ProviderFault {
    pub plugin: String,
    pub method: String,
    pub fault: Fault,
}

impl ProviderFault {
    pub fn new(definition: &ProviderDefinition, fault: Fault) -> Self {
        Self {
            plugin: definition.plugin_name.clone(),
            method: definition.method_name.clone(),
            fault,
        }
    }
}

/// Runs provider callbacks without letting their failures escape.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallbackInvoker;

impl CallbackInvoker {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate `callback` for `subject`.
    ///
    /// The interface version is checked inside the isolated task, so a stale
    /// implementation that misbehaves while reporting it fails the same way.
    pub async fn invoke<T>(
        &self,
        definition: &ProviderDefinition,
        callback: &Arc<dyn Evaluable<T>>,
        subject: &Subject,
    ) -> Result<T, ProviderFault>
    where
        T: Send + 'static,
    {
        let callback = Arc::clone(callback);
        let subject_id = subject.uuid;
        let subject_name = subject.name.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            let version = callback.api_version();
            if version != API_VERSION {
                return Err(Fault::LinkageMismatch {
                    detail: format!(
                        "built against interface version {version}, host provides {API_VERSION}"
                    ),
                });
            }
            callback.evaluate(subject_id, &subject_name)
        })
        .await;

        let result = match outcome {
            Ok(result) => result,
            Err(e) => Err(join_fault(e)),
        };

        result.map_err(|fault| {
            warn!(
                plugin = %definition.plugin_name,
                method = %definition.method_name,
                player = %subject.uuid,
                error = %fault,
                "provider callback failed"
            );
            ProviderFault::new(definition, fault)
        })
    }
}

fn join_fault(error: JoinError) -> Fault {
    if error.is_panic() {
        Fault::CallbackPanic {
            message: panic_message(error.into_panic()),
        }
    } else {
        Fault::error("callback task was cancelled")
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use tally_test_utils::{Misbehavior, faulty, returns};

    use super::*;

    fn subject() -> Subject {
        Subject::new(Uuid::from_u128(1), "Notch")
    }

    fn definition() -> ProviderDefinition {
        ProviderDefinition::boolean("essentials", "isJailed")
    }

    #[tokio::test]
    async fn returns_callback_value() {
        let callback: Arc<dyn Evaluable<bool>> = returns(true);
        let value = CallbackInvoker::new()
            .invoke(&definition(), &callback, &subject())
            .await
            .unwrap();
        assert!(value);
    }

    #[tokio::test]
    async fn panic_becomes_fault() {
        let callback: Arc<dyn Evaluable<bool>> = faulty(Misbehavior::Panics);
        let err = CallbackInvoker::new()
            .invoke(&definition(), &callback, &subject())
            .await
            .unwrap_err();

        assert_eq!(err.plugin, "essentials");
        assert_eq!(err.method, "isJailed");
        assert_eq!(err.fault.kind(), "panic");
        assert!(err.to_string().contains("essentials has invalid implementation"));
    }

    #[tokio::test]
    async fn every_misbehavior_is_contained() {
        let cases = [
            (Misbehavior::Errors, "error"),
            (Misbehavior::ReturnsNothing, "null"),
            (Misbehavior::StaleInterface, "linkage"),
        ];
        for (misbehavior, kind) in cases {
            let callback: Arc<dyn Evaluable<i64>> = faulty(misbehavior);
            let err = CallbackInvoker::new()
                .invoke(&definition(), &callback, &subject())
                .await
                .unwrap_err();
            assert_eq!(err.fault.kind(), kind);
        }
    }

    #[tokio::test]
    async fn stale_interface_is_not_evaluated() {
        let provider = faulty(Misbehavior::StaleInterface);
        let callback: Arc<dyn Evaluable<bool>> = provider.clone();
        let err = CallbackInvoker::new()
            .invoke(&definition(), &callback, &subject())
            .await
            .unwrap_err();

        assert!(err.fault.is_linkage());
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn panic_message_extraction() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(7_u8)), "non-string panic payload");
    }
}
