//! Advisory diagnostics.
//!
//! Diagnostics explain _why_ an operation returned a non-success status.
//! They are delivered on a side channel (a per-context handler) and mirrored
//! to `tracing`. They never affect control flow and correct application
//! logic never branches on them.

use std::fmt::{self, Debug, Formatter};

/// The reason behind a failed or degraded operation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Diagnostic {
    OutOfMemory,
    ResourceUnavailable,
    DynamicLibFailure,
    FeatureUnsupported,
    BackendFailure,
    BackendUnavailable,
    VulkanFailure,
    InvalidArgument,
    PreconditionFailure,
    Internal,
}

impl Diagnostic {
    pub fn as_str(self) -> &'static str {
        match self {
            Diagnostic::OutOfMemory => "out of memory",
            Diagnostic::ResourceUnavailable => "resource unavailable",
            Diagnostic::DynamicLibFailure => "dynamic library failure",
            Diagnostic::FeatureUnsupported => "feature unsupported",
            Diagnostic::BackendFailure => "backend failure",
            Diagnostic::BackendUnavailable => "backend unavailable",
            Diagnostic::VulkanFailure => "vulkan failure",
            Diagnostic::InvalidArgument => "invalid argument",
            Diagnostic::PreconditionFailure => "precondition failure",
            Diagnostic::Internal => "internal failure",
        }
    }
}

pub type DiagnosticHandler = Box<dyn Fn(Diagnostic, &str)>;

/// Fans a diagnostic out to the context handler and to `tracing`.
#[derive(Default)]
pub(crate) struct Reporter {
    handler: Option<DiagnosticHandler>,
}

impl Reporter {
    pub fn set_handler(&mut self, handler: Option<DiagnosticHandler>) {
        self.handler = handler;
    }

    pub fn report(&self, diagnostic: Diagnostic, message: &str) {
        tracing::debug!(diagnostic = diagnostic.as_str(), message);
        if let Some(handler) = self.handler.as_ref() {
            handler(diagnostic, message);
        }
    }
}

impl Debug for Reporter {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        formatter
            .debug_struct("Reporter")
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// `true` when precondition checks abort instead of degrade.
pub(crate) const fn validation_enabled() -> bool {
    cfg!(any(debug_assertions, feature = "validation"))
}
