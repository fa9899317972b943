//! The provider capability interface.
//!
//! A provider is a callback producing one typed value for a subject
//! (a player or a server). The kernel treats every callback as untrusted:
//! it may panic, return an error, return nothing, or have been built
//! against an older version of this crate.

use std::marker::PhantomData;

use thiserror::Error;
use uuid::Uuid;

/// Interface version of this SDK.
///
/// Bumped whenever the contract of [`Evaluable`] changes. The kernel refuses
/// to evaluate callbacks that report a different version.
pub const API_VERSION: u32 = 1;

/// Ways a provider callback can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// The callback panicked.
    #[error("callback panicked: {message}")]
    CallbackPanic { message: String },

    /// The callback returned an error of its own.
    #[error("callback failed: {message}")]
    CallbackError { message: String },

    /// The callback was built against a different interface version.
    #[error("incompatible provider interface: {detail}")]
    LinkageMismatch { detail: String },

    /// The callback produced no value.
    #[error("callback returned no value")]
    NullResult,
}

impl Fault {
    /// Create a callback error.
    pub fn error(message: impl Into<String>) -> Self {
        Self::CallbackError {
            message: message.into(),
        }
    }

    /// Short machine-readable kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Fault::CallbackPanic { .. } => "panic",
            Fault::CallbackError { .. } => "error",
            Fault::LinkageMismatch { .. } => "linkage",
            Fault::NullResult => "null",
        }
    }

    /// Whether this fault comes from version skew rather than the callback body.
    pub fn is_linkage(&self) -> bool {
        matches!(self, Fault::LinkageMismatch { .. })
    }
}

/// A callback producing a value of type `T` for one subject.
pub trait Evaluable<T>: Send + Sync {
    /// Compute the value for the subject identified by `subject_id` / `subject_name`.
    fn evaluate(&self, subject_id: Uuid, subject_name: &str) -> Result<T, Fault>;

    /// Interface version this implementation was built against.
    fn api_version(&self) -> u32 {
        API_VERSION
    }
}

/// [`Evaluable`] backed by a closure.
pub struct FnProvider<T, F> {
    f: F,
    _value: PhantomData<fn() -> T>,
}

impl<T, F> Evaluable<T> for FnProvider<T, F>
where
    F: Fn(Uuid, &str) -> Result<T, Fault> + Send + Sync,
{
    fn evaluate(&self, subject_id: Uuid, subject_name: &str) -> Result<T, Fault> {
        (self.f)(subject_id, subject_name)
    }
}

/// Wrap a fallible closure as a provider.
pub fn from_fn<T, F>(f: F) -> FnProvider<T, F>
where
    F: Fn(Uuid, &str) -> Result<T, Fault> + Send + Sync,
{
    FnProvider {
        f,
        _value: PhantomData,
    }
}

/// Wrap a closure that may produce nothing; `None` becomes [`Fault::NullResult`].
pub fn from_optional_fn<T, F>(
    f: F,
) -> FnProvider<T, impl Fn(Uuid, &str) -> Result<T, Fault> + Send + Sync>
where
    F: Fn(Uuid, &str) -> Option<T> + Send + Sync,
{
    from_fn(move |id, name| f(id, name).ok_or(Fault::NullResult))
}
