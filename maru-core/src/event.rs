//! Events and event masks.
//!
//! Events are delivered synchronously inside a [`pump`] call, one callback
//! invocation per event, in the order the backend observed them. An event is
//! transient: it is borrowed for the duration of the callback and nothing in
//! it may be retained past return.
//!
//! [`pump`]: crate::context::Context::pump

use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use bitflags::bitflags;

use crate::controller::Controller;
use crate::display::{LogicalUnit, PhysicalUnit, WindowGeometry};
use crate::monitor::{Monitor, VideoMode};
use crate::window::{Window, WindowFlags};

bitflags! {
    /// Selects which event kinds are dispatched.
    ///
    /// A context-level and a window-level mask jointly gate dispatch.
    /// Masked-out events are dropped before the callback is invoked.
    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
    pub struct EventMask: u32 {
        const WINDOW_READY = 1 << 0;
        const WINDOW_RESIZED = 1 << 1;
        const WINDOW_PRESENTATION = 1 << 2;
        const WINDOW_CLOSE_REQUESTED = 1 << 3;
        const WINDOW_LOST = 1 << 4;
        const KEYBOARD_KEY = 1 << 5;
        const MOUSE_BUTTON = 1 << 6;
        const MOUSE_MOVED = 1 << 7;
        const MOUSE_WHEEL = 1 << 8;
        const MONITOR = 1 << 9;
        const CONTROLLER = 1 << 10;
        const TEXT = 1 << 11;
        const EXCHANGE = 1 << 12;
        const DRAG_DROP = 1 << 13;
        const USER = 1 << 14;
    }
}

impl Default for EventMask {
    fn default() -> Self {
        EventMask::all()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Window {
        window: Window,
        event: WindowEvent,
    },
    Input {
        window: Option<Window>,
        event: InputEvent,
    },
    Monitor {
        monitor: Monitor,
        event: MonitorEvent,
    },
    Controller {
        controller: Controller,
        event: ControllerEvent,
    },
    Text {
        window: Window,
        event: TextEvent,
    },
    Exchange {
        window: Option<Window>,
        event: ExchangeEvent,
    },
    User(UserEvent),
}

impl Event {
    /// Gets the mask bit gating this event.
    pub fn kind(&self) -> EventMask {
        match self {
            Event::Window { event, .. } => match event {
                WindowEvent::Ready => EventMask::WINDOW_READY,
                WindowEvent::Resized(..) => EventMask::WINDOW_RESIZED,
                WindowEvent::PresentationChanged { .. } => EventMask::WINDOW_PRESENTATION,
                WindowEvent::CloseRequested => EventMask::WINDOW_CLOSE_REQUESTED,
                WindowEvent::Lost => EventMask::WINDOW_LOST,
            },
            Event::Input { event, .. } => match event {
                InputEvent::KeyChanged { .. } => EventMask::KEYBOARD_KEY,
                InputEvent::MouseButtonChanged { .. } => EventMask::MOUSE_BUTTON,
                InputEvent::MouseMoved { .. } => EventMask::MOUSE_MOVED,
                InputEvent::MouseWheelRotated { .. } => EventMask::MOUSE_WHEEL,
            },
            Event::Monitor { .. } => EventMask::MONITOR,
            Event::Controller { .. } => EventMask::CONTROLLER,
            Event::Text { .. } => EventMask::TEXT,
            Event::Exchange { event, .. } => match event {
                ExchangeEvent::DragEntered { .. }
                | ExchangeEvent::DragMoved { .. }
                | ExchangeEvent::DragLeft
                | ExchangeEvent::DragDropped { .. } => EventMask::DRAG_DROP,
                _ => EventMask::EXCHANGE,
            },
            Event::User(..) => EventMask::USER,
        }
    }

    /// Gets the window targeted by this event, if any.
    pub fn window(&self) -> Option<Window> {
        match self {
            Event::Window { window, .. } | Event::Text { window, .. } => Some(*window),
            Event::Input { window, .. } | Event::Exchange { window, .. } => *window,
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum WindowEvent {
    /// The window became ready. Fires exactly once per window; geometry and
    /// input state accessors are valid from this point on.
    Ready,
    /// The window geometry changed.
    Resized(WindowGeometry),
    /// One or more presentation flags changed.
    ///
    /// All flag changes from a single backend notification are aggregated
    /// into one event. `changed` holds the flags that differ from the
    /// previous presentation state.
    PresentationChanged {
        flags: WindowFlags,
        changed: WindowFlags,
    },
    CloseRequested,
    /// The window is gone; its cached state is frozen.
    Lost,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    KeyChanged {
        scancode: ScanCode,
        keycode: Option<KeyCode>,
        state: ElementState,
        modifiers: Modifiers,
    },
    MouseButtonChanged {
        button: MouseButton,
        state: ElementState,
        modifiers: Modifiers,
    },
    MouseMoved {
        position: (LogicalUnit, LogicalUnit),
        relative: (PhysicalUnit, PhysicalUnit),
        modifiers: Modifiers,
    },
    MouseWheelRotated {
        delta: MouseWheelDelta,
        modifiers: Modifiers,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum MonitorEvent {
    Connected,
    Disconnected,
    ModeChanged(VideoMode),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ControllerEvent {
    Connected,
    Disconnected,
    ButtonChanged {
        button: u8,
        state: ElementState,
    },
    AxisChanged {
        axis: u8,
        value: f64,
    },
}

/// Composed text input.
///
/// Edit events describe in-progress composition and are only delivered while
/// a window has text input enabled. Committed text is final.
#[derive(Clone, Debug, PartialEq)]
pub enum TextEvent {
    EditStarted,
    EditUpdated { text: String, caret: usize },
    Committed { text: String },
    EditEnded,
}

/// Clipboard, primary-selection, and drag-and-drop traffic.
#[derive(Clone, Debug, PartialEq)]
pub enum ExchangeEvent {
    /// Another client requested data previously offered by this context.
    DataRequested { format: DataFormat },
    /// Requested data arrived.
    DataReceived { format: DataFormat, data: Vec<u8> },
    /// A previously offered selection was taken over by another client.
    DataConsumed,
    DragEntered {
        position: (LogicalUnit, LogicalUnit),
        formats: Vec<DataFormat>,
    },
    DragMoved {
        position: (LogicalUnit, LogicalUnit),
    },
    DragLeft,
    DragDropped {
        position: (LogicalUnit, LogicalUnit),
        paths: Vec<String>,
    },
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum DataFormat {
    Text,
    UriList,
    Other(String),
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ElementState {
    Pressed,
    Released,
}

impl Default for ElementState {
    fn default() -> Self {
        ElementState::Released
    }
}

pub type ScanCode = u32;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum KeyCode {
    Escape,
    Enter,
    Tab,
    Backspace,
    Space,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    Delete,
    Insert,
    Character(char),
    Function(u8),
    Other(u32),
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct Modifiers: u32 {
        const SHIFT = 1 << 0;
        const CONTROL = 1 << 1;
        const ALT = 1 << 2;
        const SUPER = 1 << 3;
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MouseButton {
    Left,
    Right,
    Center,
    Other(u8),
}

impl MouseButton {
    /// Index into a window's cached button-state array.
    pub(crate) fn channel(self) -> usize {
        match self {
            MouseButton::Left => 0,
            MouseButton::Right => 1,
            MouseButton::Center => 2,
            MouseButton::Other(index) => index as usize,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MouseWheelDelta {
    Rotational(f64, f64),
    Positional(LogicalUnit, LogicalUnit),
}

/// An application-defined event posted from any thread.
///
/// The payload is shared and immutable. Posting is one of the few globally
/// thread-safe operations; see [`EventProxy`].
///
/// [`EventProxy`]: crate::context::EventProxy
#[derive(Clone)]
pub struct UserEvent {
    payload: Arc<dyn Any + Send + Sync>,
}

impl UserEvent {
    pub fn new<T>(payload: T) -> Self
    where
        T: Any + Send + Sync,
    {
        UserEvent {
            payload: Arc::new(payload),
        }
    }

    pub fn downcast_ref<T>(&self) -> Option<&T>
    where
        T: Any + Send + Sync,
    {
        self.payload.downcast_ref()
    }
}

impl Debug for UserEvent {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        formatter.debug_struct("UserEvent").finish_non_exhaustive()
    }
}

impl PartialEq for UserEvent {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mask_admits_everything() {
        assert_eq!(EventMask::default(), EventMask::all());
    }

    #[test]
    fn drag_events_gate_on_drag_drop_bit() {
        let event = Event::Exchange {
            window: None,
            event: ExchangeEvent::DragLeft,
        };
        assert_eq!(event.kind(), EventMask::DRAG_DROP);
        let event = Event::Exchange {
            window: None,
            event: ExchangeEvent::DataConsumed,
        };
        assert_eq!(event.kind(), EventMask::EXCHANGE);
    }

    #[test]
    fn user_event_downcast() {
        let event = UserEvent::new(42u64);
        assert_eq!(event.downcast_ref::<u64>(), Some(&42));
        assert_eq!(event.downcast_ref::<u32>(), None);
    }
}
