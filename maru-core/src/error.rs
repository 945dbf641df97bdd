//! Error types for mutating operations.
//!
//! Mutating functions return `Result<T, Error>`. Passive accessors never
//! fail; they degrade to zeroed or empty values when queried outside of a
//! valid state. Precondition violations are not errors at all: under
//! validation they panic, otherwise the operation reports a diagnostic and
//! returns `Error::Failure`.

use thiserror::Error;

use crate::diagnostic::Diagnostic;
use crate::platform::BackendKind;

/// The status of a failed mutating operation.
#[derive(Clone, Copy, Debug, Eq, Error, Hash, PartialEq)]
pub enum Error {
    /// The operation did not complete, but the context and its resources
    /// remain usable. Callers may retry or fall back.
    #[error("operation failed")]
    Failure,
    /// The backend connection is gone. Every subsequent mutating call against
    /// the context fails the same way until the context is dropped.
    #[error("context lost")]
    ContextLost,
}

pub type Result<T = ()> = std::result::Result<T, Error>;

/// A failure reported by a backend.
///
/// Backends never panic and never terminate the process. They report
/// failures upward with a diagnostic code and an out-of-band message, and
/// mark failures that invalidate the whole connection as fatal.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("{backend:?} backend: {message}")]
pub struct BackendError {
    pub backend: BackendKind,
    pub diagnostic: Diagnostic,
    pub message: String,
    /// Fatal errors transition the owning context into the lost state.
    pub fatal: bool,
}

impl BackendError {
    pub fn new<T>(backend: BackendKind, diagnostic: Diagnostic, message: T) -> Self
    where
        T: Into<String>,
    {
        BackendError {
            backend,
            diagnostic,
            message: message.into(),
            fatal: false,
        }
    }

    pub fn fatal<T>(backend: BackendKind, diagnostic: Diagnostic, message: T) -> Self
    where
        T: Into<String>,
    {
        BackendError {
            backend,
            diagnostic,
            message: message.into(),
            fatal: true,
        }
    }
}

impl From<BackendError> for Error {
    fn from(error: BackendError) -> Self {
        if error.fatal {
            Error::ContextLost
        }
        else {
            Error::Failure
        }
    }
}
