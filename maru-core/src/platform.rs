//! The backend seam.
//!
//! A backend implements the dispatch contract for one platform (Wayland,
//! X11, Win32, Cocoa, or the headless test double). Its job is a
//! poll/translate step: block for OS input up to a timeout, then hand back a
//! normalized [`PlatformEvent`] list in observed order. The dispatch core
//! owns all fan-out, filtering, and state caching, which keeps it OS
//! agnostic and testable against a fake backend.
//!
//! Backends report failure solely through [`BackendError`] values plus
//! advisory diagnostics. They never panic and never terminate the process.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::attributes::{ContextUpdate, WindowAttributes, WindowUpdate};
use crate::controller::ControllerDescriptor;
use crate::cursor::CursorSource;
use crate::display::{LogicalUnit, PhysicalUnit, WindowGeometry};
use crate::error::BackendError;
use crate::event::{
    ElementState, ExchangeEvent, KeyCode, Modifiers, MouseButton, MouseWheelDelta, ScanCode,
    TextEvent,
};
use crate::monitor::{MonitorDescriptor, VideoMode};
use crate::window::WindowFlags;

/// Raw window identity at the backend seam.
pub type WindowId = u64;

/// Raw cursor identity at the backend seam.
pub type CursorId = u64;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BackendKind {
    /// Auto-select: walk the connector priority list.
    Unknown,
    Wayland,
    X11,
    Win32,
    Cocoa,
    Headless,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Unknown => "unknown",
            BackendKind::Wayland => "wayland",
            BackendKind::X11 => "x11",
            BackendKind::Win32 => "win32",
            BackendKind::Cocoa => "cocoa",
            BackendKind::Headless => "headless",
        }
    }
}

impl Default for BackendKind {
    fn default() -> Self {
        BackendKind::Unknown
    }
}

/// Input channel counts reported by a backend.
///
/// Per-window key and mouse button state arrays are sized to these counts.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct InputChannels {
    pub keys: usize,
    pub mouse_buttons: usize,
}

/// A backend-specific handle for interop (surface creation, embedding).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct NativeHandle {
    pub backend: BackendKind,
    pub value: u64,
}

/// A normalized event produced by a backend's poll/translate step.
///
/// One platform event may fan out into several delivered events; the
/// dispatch core owns that derivation and its ordering.
#[derive(Clone, Debug, PartialEq)]
pub enum PlatformEvent {
    /// The window finished its first configuration round trip.
    WindowReady { window: WindowId },
    /// Geometry and/or presentation flags changed in one OS notification.
    WindowConfigured {
        window: WindowId,
        geometry: Option<WindowGeometry>,
        presentation: Option<WindowFlags>,
    },
    WindowCloseRequested {
        window: WindowId,
    },
    Key {
        window: WindowId,
        scancode: ScanCode,
        keycode: Option<KeyCode>,
        state: ElementState,
        modifiers: Modifiers,
    },
    MouseButton {
        window: WindowId,
        button: MouseButton,
        state: ElementState,
        modifiers: Modifiers,
    },
    MouseMoved {
        window: WindowId,
        position: (LogicalUnit, LogicalUnit),
        relative: (PhysicalUnit, PhysicalUnit),
        modifiers: Modifiers,
    },
    MouseWheel {
        window: WindowId,
        delta: MouseWheelDelta,
        modifiers: Modifiers,
    },
    Text {
        window: WindowId,
        event: TextEvent,
    },
    Exchange {
        window: Option<WindowId>,
        event: ExchangeEvent,
    },
    MonitorConnected(MonitorDescriptor),
    MonitorDisconnected {
        monitor: u64,
    },
    MonitorModeChanged {
        monitor: u64,
        mode: VideoMode,
    },
    ControllerConnected(ControllerDescriptor),
    ControllerDisconnected {
        controller: u64,
    },
    ControllerButton {
        controller: u64,
        button: u8,
        state: ElementState,
    },
    ControllerAxis {
        controller: u64,
        axis: u8,
        value: f64,
    },
    /// The backend connection failed irrecoverably. The context transitions
    /// to lost.
    ConnectionLost,
}

/// An OS-level wake primitive for a blocked poll.
///
/// Implementations must interrupt the wait directly (an event fd, a posted
/// message, a condition variable), never poll.
pub trait Wake: Send + Sync {
    fn wake(&self);
}

/// The contract a platform implementation provides per context.
pub trait Backend {
    fn kind(&self) -> BackendKind;

    fn input_channels(&self) -> InputChannels;

    /// Blocks up to `timeout` for input, then returns the translated events
    /// in observed order. `None` polls without blocking. A pending wake
    /// unblocks the call promptly with whatever is already queued.
    fn poll(&mut self, timeout: Option<Duration>) -> Result<Vec<PlatformEvent>, BackendError>;

    /// Gets a wake primitive bound to this backend's poll.
    fn waker(&self) -> Arc<dyn Wake>;

    /// Realizes a window. On failure, no partial backend state may remain.
    ///
    /// A successful creation must surface a `WindowConfigured` and then a
    /// `WindowReady` event from a subsequent poll. Later attribute
    /// applications that change geometry or presentation state must surface
    /// matching `WindowConfigured` events.
    fn create_window(
        &mut self,
        window: WindowId,
        attributes: &WindowAttributes,
    ) -> Result<(), BackendError>;

    fn destroy_window(&mut self, window: WindowId);

    fn apply_window_update(
        &mut self,
        window: WindowId,
        update: &WindowUpdate,
    ) -> Result<(), BackendError>;

    fn apply_context_update(&mut self, update: &ContextUpdate) -> Result<(), BackendError>;

    fn request_focus(&mut self, window: WindowId) -> Result<(), BackendError>;

    fn request_frame(&mut self, window: WindowId) -> Result<(), BackendError>;

    fn request_attention(&mut self, window: WindowId) -> Result<(), BackendError>;

    fn create_cursor(
        &mut self,
        cursor: CursorId,
        source: &CursorSource,
    ) -> Result<(), BackendError>;

    fn destroy_cursor(&mut self, cursor: CursorId);

    /// Enumerates currently connected monitors. Used by the owner thread to
    /// rebuild the monitor cache on demand.
    fn monitors(&mut self) -> Vec<MonitorDescriptor>;

    /// Enumerates currently connected controllers.
    fn controllers(&mut self) -> Vec<ControllerDescriptor>;

    fn native_handle(&self, window: WindowId) -> Option<NativeHandle>;
}

/// A factory for one backend kind.
///
/// Connectors are walked in priority order at context creation. On Linux
/// this is Wayland before X11; the headless connector sits last as an
/// unconditional fallback.
pub trait Connector {
    fn kind(&self) -> BackendKind;

    /// Cheaply probes whether the backend could connect (a display server
    /// socket exists, a dynamic library loads).
    fn is_available(&self) -> bool;

    fn connect(&self) -> Result<Box<dyn Backend>, BackendError>;
}

/// Walks the connector list and connects the first suitable backend.
///
/// A requested kind restricts the walk to matching connectors; `Unknown`
/// tries every connector in order. Unavailable or failing connectors are
/// skipped with a diagnostic and the walk continues.
pub(crate) fn select(
    requested: BackendKind,
    connectors: &[Box<dyn Connector>],
    report: &mut dyn FnMut(&BackendError),
) -> Option<Box<dyn Backend>> {
    for connector in connectors
        .iter()
        .filter(|connector| requested == BackendKind::Unknown || connector.kind() == requested)
    {
        if !connector.is_available() {
            tracing::debug!(backend = connector.kind().as_str(), "backend unavailable");
            continue;
        }
        match connector.connect() {
            Ok(backend) => {
                tracing::info!(backend = backend.kind().as_str(), "backend connected");
                return Some(backend);
            }
            Err(error) => {
                report(&error);
                tracing::warn!(
                    backend = connector.kind().as_str(),
                    error = %error,
                    "backend connection failed",
                );
            }
        }
    }
    None
}

pub mod alias {
    //! Aliases for backend seam signatures.

    use super::*;

    pub type PollResult = Result<Vec<PlatformEvent>, BackendError>;
}
