//! Windows.
//!
//! A [`Window`] is an opaque handle to a window owned by its parent
//! [`Context`]; it cannot outlive it. Windows are created on the owner
//! thread with a [`WindowBuilder`] and destroyed through the context. State
//! queries go through the context's passive accessors, which degrade to
//! zeroed values before the window is ready or after it is lost.
//!
//! [`Context`]: crate::context::Context

use std::any::Any;

use bitflags::bitflags;

use crate::attributes::WindowAttributes;
use crate::context::Context;
use crate::display::{LogicalUnit, Rect, WindowGeometry};
use crate::error::Result;
use crate::event::{ElementState, EventMask};
use crate::attributes::TextInput;
use crate::cursor::CursorMode;

bitflags! {
    /// Cached window state flags.
    ///
    /// The presentation subset ([`WindowFlags::PRESENTATION`]) is also the
    /// vocabulary of the `changed` mask carried by presentation-change
    /// events.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct WindowFlags: u32 {
        const LOST = 1 << 0;
        const READY = 1 << 1;
        const FOCUSED = 1 << 2;
        const MAXIMIZED = 1 << 3;
        const FULLSCREEN = 1 << 4;
        const VISIBLE = 1 << 5;
        const MINIMIZED = 1 << 6;
    }
}

impl WindowFlags {
    pub const PRESENTATION: WindowFlags = WindowFlags::FOCUSED
        .union(WindowFlags::MAXIMIZED)
        .union(WindowFlags::FULLSCREEN)
        .union(WindowFlags::VISIBLE)
        .union(WindowFlags::MINIMIZED);
}

/// An opaque handle that identifies a window within its context.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Window {
    pub(crate) context: u64,
    pub(crate) id: u64,
}

impl Window {
    pub(crate) fn new(context: u64, id: u64) -> Self {
        Window { context, id }
    }
}

/// Configures and builds a `Window`.
///
/// Provides a default configuration that can be customized with a fluent
/// interface and realized against a context with [`build`].
///
/// [`build`]: WindowBuilder::build
#[derive(Clone, Debug, Default)]
pub struct WindowBuilder {
    attributes: WindowAttributes,
}

impl WindowBuilder {
    pub fn with_title<T>(mut self, title: T) -> Self
    where
        T: AsRef<str>,
    {
        self.attributes.title = title.as_ref().to_owned();
        self
    }

    pub fn with_logical_size<T>(mut self, size: (T, T)) -> Self
    where
        T: Into<LogicalUnit>,
    {
        let (width, height) = size;
        self.attributes.logical_size = (width.into(), height.into());
        self
    }

    pub fn with_origin(mut self, origin: (i32, i32)) -> Self {
        self.attributes.origin = origin;
        self
    }

    pub fn with_min_size<T>(mut self, size: (T, T)) -> Self
    where
        T: Into<LogicalUnit>,
    {
        let (width, height) = size;
        self.attributes.min_size = (width.into(), height.into());
        self
    }

    pub fn with_max_size<T>(mut self, size: (T, T)) -> Self
    where
        T: Into<LogicalUnit>,
    {
        let (width, height) = size;
        self.attributes.max_size = (width.into(), height.into());
        self
    }

    pub fn with_aspect_ratio(mut self, ratio: (u32, u32)) -> Self {
        self.attributes.aspect_ratio = ratio;
        self
    }

    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.attributes.resizable = resizable;
        self
    }

    pub fn with_decorated(mut self, decorated: bool) -> Self {
        self.attributes.decorated = decorated;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.attributes.visible = visible;
        self
    }

    pub fn with_maximized(mut self, maximized: bool) -> Self {
        self.attributes.maximized = maximized;
        self
    }

    pub fn with_fullscreen(mut self, fullscreen: bool) -> Self {
        self.attributes.fullscreen = fullscreen;
        self
    }

    pub fn with_event_mask(mut self, mask: EventMask) -> Self {
        self.attributes.event_mask = mask;
        self
    }

    pub fn with_accept_drop(mut self, accept: bool) -> Self {
        self.attributes.accept_drop = accept;
        self
    }

    pub fn with_primary_selection(mut self, enabled: bool) -> Self {
        self.attributes.primary_selection = enabled;
        self
    }

    pub fn with_cursor_mode(mut self, mode: CursorMode) -> Self {
        self.attributes.cursor_mode = mode;
        self
    }

    pub fn with_text_input(mut self, text_input: TextInput) -> Self {
        self.attributes.text_input = text_input;
        self
    }

    pub fn build(self, context: &mut Context) -> Result<Window> {
        context.create_window(self.attributes)
    }
}

/// Geometry and style saved on entering fullscreen so that leaving it
/// exactly reverses the transition.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SavedPlacement {
    pub origin: (i32, i32),
    pub logical_size: (LogicalUnit, LogicalUnit),
    pub decorated: bool,
    pub resizable: bool,
}

/// The per-window record owned by the context registry.
pub(crate) struct WindowState {
    pub id: u64,
    pub flags: WindowFlags,
    pub geometry: WindowGeometry,
    pub cursor_position: (LogicalUnit, LogicalUnit),
    /// What the application asked for, verbatim.
    pub requested: WindowAttributes,
    /// What is currently applied.
    pub effective: WindowAttributes,
    pub saved: Option<SavedPlacement>,
    pub keys: Box<[ElementState]>,
    pub mouse: Box<[ElementState]>,
    pub text_area: Rect,
    pub userdata: Option<Box<dyn Any>>,
}

impl WindowState {
    pub fn new(id: u64, attributes: WindowAttributes, keys: usize, mouse: usize) -> Self {
        WindowState {
            id,
            flags: WindowFlags::empty(),
            geometry: WindowGeometry::default(),
            cursor_position: Default::default(),
            requested: attributes.clone(),
            text_area: attributes.text_input.area,
            effective: attributes,
            saved: None,
            keys: vec![ElementState::Released; keys].into_boxed_slice(),
            mouse: vec![ElementState::Released; mouse].into_boxed_slice(),
            userdata: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.flags.contains(WindowFlags::READY) && !self.flags.contains(WindowFlags::LOST)
    }

    pub fn presentation(&self) -> WindowFlags {
        self.flags & WindowFlags::PRESENTATION
    }

    pub fn set_key(&mut self, scancode: u32, state: ElementState) {
        if let Some(channel) = self.keys.get_mut(scancode as usize) {
            *channel = state;
        }
    }

    pub fn set_mouse_button(&mut self, channel: usize, state: ElementState) {
        if let Some(channel) = self.mouse.get_mut(channel) {
            *channel = state;
        }
    }
}
