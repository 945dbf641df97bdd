//! Window and context attributes.
//!
//! Attribute updates are partial: a [`WindowUpdate`] carries only the fields
//! a caller selected, and unselected fields are never read. [`fields`]
//! derives the selected-field mask, which also names the bits reported by
//! presentation-change events.
//!
//! Every settable field has a legality predicate. Violating one is a
//! programming error: under validation the update panics, otherwise it
//! reports [`Diagnostic::InvalidArgument`] and fails recoverably.
//!
//! [`fields`]: WindowUpdate::fields
//! [`Diagnostic::InvalidArgument`]: crate::diagnostic::Diagnostic::InvalidArgument

use bitflags::bitflags;

use crate::cursor::{Cursor, CursorMode, Image};
use crate::display::{LogicalUnit, Rect};
use crate::event::EventMask;
use crate::monitor::Monitor;

bitflags! {
    /// Selects the fields touched by an attribute update.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct WindowField: u32 {
        const TITLE = 1 << 0;
        const CURSOR = 1 << 1;
        const CURSOR_MODE = 1 << 2;
        const MIN_SIZE = 1 << 3;
        const MAX_SIZE = 1 << 4;
        const ASPECT_RATIO = 1 << 5;
        const LOGICAL_SIZE = 1 << 6;
        const ORIGIN = 1 << 7;
        const RESIZABLE = 1 << 8;
        const DECORATED = 1 << 9;
        const MOUSE_PASSTHROUGH = 1 << 10;
        const ACCEPT_DROP = 1 << 11;
        const PRIMARY_SELECTION = 1 << 12;
        const TEXT_INPUT = 1 << 13;
        const EVENT_MASK = 1 << 14;
        const ICON = 1 << 15;
        const VISIBLE = 1 << 16;
        const MINIMIZED = 1 << 17;
        const MAXIMIZED = 1 << 18;
        const FULLSCREEN = 1 << 19;
        const FOCUSED = 1 << 20;
    }
}

impl WindowField {
    /// Fields that participate in the aggregated presentation state.
    pub const PRESENTATION: WindowField = WindowField::VISIBLE
        .union(WindowField::MINIMIZED)
        .union(WindowField::MAXIMIZED)
        .union(WindowField::FULLSCREEN)
        .union(WindowField::FOCUSED);
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TextInputKind {
    Disabled,
    Plain,
    Password,
    Number,
}

impl Default for TextInputKind {
    fn default() -> Self {
        TextInputKind::Disabled
    }
}

/// Text input configuration: the input type and the caret area used to
/// position editor popups.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextInput {
    pub kind: TextInputKind,
    pub area: Rect,
}

/// The complete attribute set of a window.
///
/// Used both as the requested configuration at creation and as the cached
/// effective snapshot afterwards. The zero value of `min_size` and
/// `max_size` components means unbounded; `(0, 0)` aspect ratio means free.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowAttributes {
    pub title: String,
    pub cursor: Option<Cursor>,
    pub cursor_mode: CursorMode,
    pub min_size: (LogicalUnit, LogicalUnit),
    pub max_size: (LogicalUnit, LogicalUnit),
    pub aspect_ratio: (u32, u32),
    pub logical_size: (LogicalUnit, LogicalUnit),
    pub origin: (i32, i32),
    pub resizable: bool,
    pub decorated: bool,
    pub mouse_passthrough: bool,
    pub accept_drop: bool,
    pub primary_selection: bool,
    pub text_input: TextInput,
    pub event_mask: EventMask,
    pub icon: Option<Image>,
    pub visible: bool,
    pub minimized: bool,
    pub maximized: bool,
    pub fullscreen: bool,
    pub focused: bool,
}

impl Default for WindowAttributes {
    fn default() -> Self {
        WindowAttributes {
            title: String::new(),
            cursor: None,
            cursor_mode: CursorMode::default(),
            min_size: (LogicalUnit::from(0), LogicalUnit::from(0)),
            max_size: (LogicalUnit::from(0), LogicalUnit::from(0)),
            aspect_ratio: (0, 0),
            logical_size: (LogicalUnit::from(640), LogicalUnit::from(480)),
            origin: (0, 0),
            resizable: true,
            decorated: true,
            mouse_passthrough: false,
            accept_drop: false,
            primary_selection: false,
            text_input: TextInput::default(),
            event_mask: EventMask::default(),
            icon: None,
            visible: true,
            minimized: false,
            maximized: false,
            fullscreen: false,
            focused: false,
        }
    }
}

impl WindowAttributes {
    pub(crate) fn legality_error(&self) -> Option<&'static str> {
        WindowUpdate::from_attributes(self).legality_error()
    }
}

/// A partial window update.
///
/// Only fields set through the `with_*` functions are applied; everything
/// else is left untouched. The single-field setters on
/// [`Context`](crate::context::Context) are sugar over one-field updates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WindowUpdate {
    pub(crate) title: Option<String>,
    pub(crate) cursor: Option<Option<Cursor>>,
    pub(crate) cursor_mode: Option<CursorMode>,
    pub(crate) min_size: Option<(LogicalUnit, LogicalUnit)>,
    pub(crate) max_size: Option<(LogicalUnit, LogicalUnit)>,
    pub(crate) aspect_ratio: Option<(u32, u32)>,
    pub(crate) logical_size: Option<(LogicalUnit, LogicalUnit)>,
    pub(crate) origin: Option<(i32, i32)>,
    pub(crate) resizable: Option<bool>,
    pub(crate) decorated: Option<bool>,
    pub(crate) mouse_passthrough: Option<bool>,
    pub(crate) accept_drop: Option<bool>,
    pub(crate) primary_selection: Option<bool>,
    pub(crate) text_input: Option<TextInput>,
    pub(crate) event_mask: Option<EventMask>,
    pub(crate) icon: Option<Option<Image>>,
    pub(crate) visible: Option<bool>,
    pub(crate) minimized: Option<bool>,
    pub(crate) maximized: Option<bool>,
    pub(crate) fullscreen: Option<bool>,
    pub(crate) fullscreen_monitor: Option<Monitor>,
    pub(crate) focused: Option<bool>,
}

impl WindowUpdate {
    pub fn new() -> Self {
        Default::default()
    }

    fn from_attributes(attributes: &WindowAttributes) -> Self {
        WindowUpdate::new()
            .with_min_size(attributes.min_size)
            .with_max_size(attributes.max_size)
            .with_aspect_ratio(attributes.aspect_ratio)
            .with_logical_size(attributes.logical_size)
    }

    pub fn with_title<T>(mut self, title: T) -> Self
    where
        T: AsRef<str>,
    {
        self.title = Some(title.as_ref().to_owned());
        self
    }

    pub fn with_cursor(mut self, cursor: Option<Cursor>) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn with_cursor_mode(mut self, mode: CursorMode) -> Self {
        self.cursor_mode = Some(mode);
        self
    }

    pub fn with_min_size<T>(mut self, size: (T, T)) -> Self
    where
        T: Into<LogicalUnit>,
    {
        let (width, height) = size;
        self.min_size = Some((width.into(), height.into()));
        self
    }

    pub fn with_max_size<T>(mut self, size: (T, T)) -> Self
    where
        T: Into<LogicalUnit>,
    {
        let (width, height) = size;
        self.max_size = Some((width.into(), height.into()));
        self
    }

    pub fn with_aspect_ratio(mut self, ratio: (u32, u32)) -> Self {
        self.aspect_ratio = Some(ratio);
        self
    }

    pub fn with_logical_size<T>(mut self, size: (T, T)) -> Self
    where
        T: Into<LogicalUnit>,
    {
        let (width, height) = size;
        self.logical_size = Some((width.into(), height.into()));
        self
    }

    pub fn with_origin(mut self, origin: (i32, i32)) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = Some(resizable);
        self
    }

    pub fn with_decorated(mut self, decorated: bool) -> Self {
        self.decorated = Some(decorated);
        self
    }

    pub fn with_mouse_passthrough(mut self, passthrough: bool) -> Self {
        self.mouse_passthrough = Some(passthrough);
        self
    }

    pub fn with_accept_drop(mut self, accept: bool) -> Self {
        self.accept_drop = Some(accept);
        self
    }

    pub fn with_primary_selection(mut self, enabled: bool) -> Self {
        self.primary_selection = Some(enabled);
        self
    }

    pub fn with_text_input(mut self, text_input: TextInput) -> Self {
        self.text_input = Some(text_input);
        self
    }

    pub fn with_event_mask(mut self, mask: EventMask) -> Self {
        self.event_mask = Some(mask);
        self
    }

    pub fn with_icon(mut self, icon: Option<Image>) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    pub fn with_minimized(mut self, minimized: bool) -> Self {
        self.minimized = Some(minimized);
        self
    }

    pub fn with_maximized(mut self, maximized: bool) -> Self {
        self.maximized = Some(maximized);
        self
    }

    pub fn with_fullscreen(mut self, fullscreen: bool) -> Self {
        self.fullscreen = Some(fullscreen);
        self
    }

    /// Targets a specific monitor when entering fullscreen. Without a
    /// target, the backend picks the monitor the window occupies.
    pub fn with_fullscreen_on(mut self, monitor: Monitor) -> Self {
        self.fullscreen = Some(true);
        self.fullscreen_monitor = Some(monitor);
        self
    }

    pub fn with_focused(mut self, focused: bool) -> Self {
        self.focused = Some(focused);
        self
    }

    /// Derives the selected-field mask.
    pub fn fields(&self) -> WindowField {
        let mut fields = WindowField::empty();
        let mut select = |selected: bool, field| {
            if selected {
                fields |= field;
            }
        };
        select(self.title.is_some(), WindowField::TITLE);
        select(self.cursor.is_some(), WindowField::CURSOR);
        select(self.cursor_mode.is_some(), WindowField::CURSOR_MODE);
        select(self.min_size.is_some(), WindowField::MIN_SIZE);
        select(self.max_size.is_some(), WindowField::MAX_SIZE);
        select(self.aspect_ratio.is_some(), WindowField::ASPECT_RATIO);
        select(self.logical_size.is_some(), WindowField::LOGICAL_SIZE);
        select(self.origin.is_some(), WindowField::ORIGIN);
        select(self.resizable.is_some(), WindowField::RESIZABLE);
        select(self.decorated.is_some(), WindowField::DECORATED);
        select(
            self.mouse_passthrough.is_some(),
            WindowField::MOUSE_PASSTHROUGH,
        );
        select(self.accept_drop.is_some(), WindowField::ACCEPT_DROP);
        select(
            self.primary_selection.is_some(),
            WindowField::PRIMARY_SELECTION,
        );
        select(self.text_input.is_some(), WindowField::TEXT_INPUT);
        select(self.event_mask.is_some(), WindowField::EVENT_MASK);
        select(self.icon.is_some(), WindowField::ICON);
        select(self.visible.is_some(), WindowField::VISIBLE);
        select(self.minimized.is_some(), WindowField::MINIMIZED);
        select(self.maximized.is_some(), WindowField::MAXIMIZED);
        select(self.fullscreen.is_some(), WindowField::FULLSCREEN);
        select(self.focused.is_some(), WindowField::FOCUSED);
        fields
    }

    /// Checks every selected field against its legality predicate and
    /// reports the first violation.
    pub(crate) fn legality_error(&self) -> Option<&'static str> {
        fn non_negative(size: &(LogicalUnit, LogicalUnit)) -> bool {
            size.0.is_non_negative() && size.1.is_non_negative()
        }
        if let Some(size) = self.min_size.as_ref() {
            if !non_negative(size) {
                return Some("minimum size must be non-negative");
            }
        }
        if let Some(size) = self.max_size.as_ref() {
            if !non_negative(size) {
                return Some("maximum size must be non-negative");
            }
        }
        if let Some(size) = self.logical_size.as_ref() {
            if !non_negative(size) {
                return Some("logical size must be non-negative");
            }
        }
        if let Some((numerator, denominator)) = self.aspect_ratio {
            if (numerator == 0) != (denominator == 0) {
                return Some("aspect ratio terms must both be zero or both be positive");
            }
        }
        // Cross-field check only when both bounds appear in the same update.
        if let (Some(min), Some(max)) = (self.min_size.as_ref(), self.max_size.as_ref()) {
            let bounded = |min: LogicalUnit, max: LogicalUnit| *max == 0.0 || max >= min;
            if !(bounded(min.0, max.0) && bounded(min.1, max.1)) {
                return Some("maximum size must not be less than minimum size");
            }
        }
        None
    }

    /// Gets the monitor targeted by a fullscreen transition, if any.
    pub fn fullscreen_monitor(&self) -> Option<&Monitor> {
        self.fullscreen_monitor.as_ref()
    }

    /// Folds the selected fields into an attribute snapshot. Backends use
    /// this to maintain their own effective snapshot per window.
    pub fn apply_to(&self, attributes: &mut WindowAttributes) {
        if let Some(title) = self.title.as_ref() {
            attributes.title = title.clone();
        }
        if let Some(cursor) = self.cursor {
            attributes.cursor = cursor;
        }
        if let Some(mode) = self.cursor_mode {
            attributes.cursor_mode = mode;
        }
        if let Some(size) = self.min_size {
            attributes.min_size = size;
        }
        if let Some(size) = self.max_size {
            attributes.max_size = size;
        }
        if let Some(ratio) = self.aspect_ratio {
            attributes.aspect_ratio = ratio;
        }
        if let Some(size) = self.logical_size {
            attributes.logical_size = size;
        }
        if let Some(origin) = self.origin {
            attributes.origin = origin;
        }
        if let Some(resizable) = self.resizable {
            attributes.resizable = resizable;
        }
        if let Some(decorated) = self.decorated {
            attributes.decorated = decorated;
        }
        if let Some(passthrough) = self.mouse_passthrough {
            attributes.mouse_passthrough = passthrough;
        }
        if let Some(accept) = self.accept_drop {
            attributes.accept_drop = accept;
        }
        if let Some(enabled) = self.primary_selection {
            attributes.primary_selection = enabled;
        }
        if let Some(text_input) = self.text_input {
            attributes.text_input = text_input;
        }
        if let Some(mask) = self.event_mask {
            attributes.event_mask = mask;
        }
        if let Some(icon) = self.icon.as_ref() {
            attributes.icon = icon.clone();
        }
        if let Some(visible) = self.visible {
            attributes.visible = visible;
        }
        if let Some(minimized) = self.minimized {
            attributes.minimized = minimized;
        }
        if let Some(maximized) = self.maximized {
            attributes.maximized = maximized;
        }
        if let Some(fullscreen) = self.fullscreen {
            attributes.fullscreen = fullscreen;
        }
        if let Some(focused) = self.focused {
            attributes.focused = focused;
        }
    }
}

/// A partial context update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContextUpdate {
    pub(crate) event_mask: Option<EventMask>,
}

impl ContextUpdate {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_event_mask(mut self, mask: EventMask) -> Self {
        self.event_mask = Some(mask);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_track_selected_options() {
        let update = WindowUpdate::new()
            .with_title("maru")
            .with_maximized(true);
        assert_eq!(update.fields(), WindowField::TITLE | WindowField::MAXIMIZED);
        assert_eq!(WindowUpdate::new().fields(), WindowField::empty());
    }

    #[test]
    fn aspect_ratio_must_be_consistent() {
        assert!(WindowUpdate::new()
            .with_aspect_ratio((16, 9))
            .legality_error()
            .is_none());
        assert!(WindowUpdate::new()
            .with_aspect_ratio((0, 0))
            .legality_error()
            .is_none());
        assert!(WindowUpdate::new()
            .with_aspect_ratio((16, 0))
            .legality_error()
            .is_some());
    }

    #[test]
    fn bounds_cross_check_only_within_one_update() {
        assert!(WindowUpdate::new()
            .with_min_size((800, 600))
            .with_max_size((640, 480))
            .legality_error()
            .is_some());
        // The zero sentinel leaves a component unbounded.
        assert!(WindowUpdate::new()
            .with_min_size((800, 600))
            .with_max_size((0, 0))
            .legality_error()
            .is_none());
        // A lone bound is never checked against cached state.
        assert!(WindowUpdate::new()
            .with_max_size((1, 1))
            .legality_error()
            .is_none());
    }

    #[test]
    fn negative_sizes_are_illegal() {
        assert!(WindowUpdate::new()
            .with_logical_size((-1.0, 100.0))
            .legality_error()
            .is_some());
    }

    #[test]
    fn apply_folds_only_selected_fields() {
        let mut attributes = WindowAttributes::default();
        WindowUpdate::new()
            .with_title("maru")
            .with_visible(false)
            .apply_to(&mut attributes);
        assert_eq!(attributes.title, "maru");
        assert!(!attributes.visible);
        assert!(attributes.resizable); // Untouched.
    }

    #[test]
    fn presentation_fields_are_grouped() {
        assert!(WindowField::PRESENTATION.contains(WindowField::MAXIMIZED));
        assert!(!WindowField::PRESENTATION.contains(WindowField::TITLE));
    }
}
