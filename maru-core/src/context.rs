//! Contexts.
//!
//! A [`Context`] owns one backend connection and everything created against
//! it: the window registry, the monitor cache, the controller list, cursors,
//! and pluggable extension state. It is owner-thread affine: the thread that
//! creates a context is the only thread that may pump events or call any
//! mutating function on it. `Context` does not implement `Send` or `Sync`,
//! so this discipline is enforced statically; the escape hatches are the
//! explicitly thread-safe [`Waker`] and [`EventProxy`] handles and the
//! clone/drop operations on monitors and controllers.
//!
//! A context that loses its backend connection transitions to a sticky lost
//! state: every subsequent mutating call fails with
//! [`Error::ContextLost`] until the context is dropped. Dropping is always
//! legal and releases all per-context resources.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bitflags::bitflags;
use parking_lot::Mutex;

use crate::attributes::{ContextUpdate, TextInput, WindowAttributes, WindowUpdate};
use crate::controller::Controller;
use crate::cursor::{Cursor, CursorMode, CursorSource, Image};
use crate::diagnostic::{validation_enabled, Diagnostic, DiagnosticHandler, Reporter};
use crate::dispatch;
use crate::display::{LogicalUnit, WindowGeometry};
use crate::error::{BackendError, Error, Result};
use crate::event::{ElementState, Event, EventMask, MouseButton, UserEvent};
use crate::monitor::Monitor;
use crate::platform::{self, Backend, BackendKind, Connector, NativeHandle, Wake};
use crate::window::{SavedPlacement, Window, WindowFlags, WindowState};

/// `PhantomData` that prevents auto-implementation of `Send` and `Sync`.
type ThreadStatic = PhantomData<*mut isize>;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct ContextFlags: u32 {
        const READY = 1 << 0;
        const LOST = 1 << 1;
    }
}

/// Unblocks a pending [`pump`] call. Callable from any thread.
///
/// [`pump`]: Context::pump
#[derive(Clone)]
pub struct Waker {
    wake: Arc<dyn Wake>,
}

impl Waker {
    /// Forces a blocked pump call to return promptly, even with zero events
    /// ready, rather than waiting out the remainder of its timeout.
    pub fn wake(&self) {
        self.wake.wake();
    }
}

struct ProxyShared {
    posted: Mutex<VecDeque<UserEvent>>,
    lost: AtomicBool,
}

/// Posts user events into a context's event stream. Callable from any
/// thread; posting wakes a blocked pump.
#[derive(Clone)]
pub struct EventProxy {
    shared: Arc<ProxyShared>,
    waker: Waker,
}

impl EventProxy {
    pub fn post(&self, event: UserEvent) -> Result {
        if self.shared.lost.load(Ordering::Acquire) {
            return Err(Error::ContextLost);
        }
        self.shared.posted.lock().push_back(event);
        self.waker.wake();
        Ok(())
    }
}

/// Configures and builds a [`Context`].
pub struct ContextBuilder {
    backend: BackendKind,
    connectors: Vec<Box<dyn Connector>>,
    event_mask: EventMask,
    diagnostic_handler: Option<DiagnosticHandler>,
}

impl ContextBuilder {
    /// Requests a specific backend. The default, [`BackendKind::Unknown`],
    /// auto-selects by walking the connector priority list.
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Appends a connector to the priority list.
    pub fn with_connector(mut self, connector: Box<dyn Connector>) -> Self {
        self.connectors.push(connector);
        self
    }

    pub fn with_connectors<I>(mut self, connectors: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn Connector>>,
    {
        self.connectors.extend(connectors);
        self
    }

    pub fn with_event_mask(mut self, mask: EventMask) -> Self {
        self.event_mask = mask;
        self
    }

    pub fn with_diagnostic_handler<F>(mut self, handler: F) -> Self
    where
        F: 'static + Fn(Diagnostic, &str),
    {
        self.diagnostic_handler = Some(Box::new(handler));
        self
    }

    pub fn build(self) -> Result<Context> {
        let ContextBuilder {
            backend,
            connectors,
            event_mask,
            diagnostic_handler,
        } = self;
        let mut reporter = Reporter::default();
        reporter.set_handler(diagnostic_handler);
        let selected = platform::select(backend, &connectors, &mut |error| {
            reporter.report(error.diagnostic, &error.message);
        });
        let backend = match selected {
            Some(backend) => backend,
            None => {
                reporter.report(
                    Diagnostic::BackendUnavailable,
                    "no suitable backend connected",
                );
                return Err(Error::Failure);
            }
        };
        let waker = Waker {
            wake: backend.waker(),
        };
        let mut context = Context {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            flags: ContextFlags::READY,
            backend,
            reporter,
            event_mask,
            windows: BTreeMap::new(),
            monitors: Vec::new(),
            monitors_seeded: false,
            controllers: Vec::new(),
            controllers_seeded: false,
            cursors: HashSet::new(),
            extensions: HashMap::new(),
            userdata: None,
            shared: Arc::new(ProxyShared {
                posted: Mutex::new(VecDeque::new()),
                lost: AtomicBool::new(false),
            }),
            waker,
            next_handle: 1,
            pumping: false,
            phantom: PhantomData,
        };
        tracing::info!(
            context = context.id,
            backend = context.backend.kind().as_str(),
            "context created",
        );
        context.refresh_monitors();
        context.refresh_controllers();
        Ok(context)
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        ContextBuilder {
            backend: BackendKind::Unknown,
            connectors: Vec::new(),
            event_mask: EventMask::default(),
            diagnostic_handler: None,
        }
    }
}

/// A connection to a display server and the root of all resources created
/// against it.
pub struct Context {
    pub(crate) id: u64,
    pub(crate) flags: ContextFlags,
    pub(crate) backend: Box<dyn Backend>,
    pub(crate) reporter: Reporter,
    pub(crate) event_mask: EventMask,
    pub(crate) windows: BTreeMap<u64, WindowState>,
    pub(crate) monitors: Vec<Monitor>,
    monitors_seeded: bool,
    pub(crate) controllers: Vec<Controller>,
    controllers_seeded: bool,
    cursors: HashSet<u64>,
    extensions: HashMap<TypeId, Box<dyn Any>>,
    userdata: Option<Box<dyn Any>>,
    shared: Arc<ProxyShared>,
    waker: Waker,
    next_handle: u64,
    pumping: bool,
    phantom: ThreadStatic,
}

impl Context {
    pub fn builder() -> ContextBuilder {
        Default::default()
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn flags(&self) -> ContextFlags {
        self.flags
    }

    pub fn is_ready(&self) -> bool {
        self.flags.contains(ContextFlags::READY) && !self.is_lost()
    }

    pub fn is_lost(&self) -> bool {
        self.flags.contains(ContextFlags::LOST)
    }

    pub fn event_mask(&self) -> EventMask {
        self.event_mask
    }

    /// Gets a thread-safe handle that unblocks a pending pump call.
    pub fn waker(&self) -> Waker {
        self.waker.clone()
    }

    /// Gets a thread-safe handle that posts user events.
    pub fn proxy(&self) -> EventProxy {
        EventProxy {
            shared: Arc::clone(&self.shared),
            waker: self.waker.clone(),
        }
    }

    /// Waits up to `timeout` for events and dispatches them.
    ///
    /// The callback is invoked synchronously, once per event, in the order
    /// the backend observed them. Cached state is always updated before the
    /// event describing the change is delivered, so passive accessors are
    /// consistent inside the callback. Events masked out by the joint
    /// context and window event masks are dropped before the callback is
    /// invoked. A `None` timeout polls without blocking.
    ///
    /// Returns [`Error::ContextLost`] once the backend connection is gone;
    /// lost-window events for the final transition are still delivered by
    /// the discovering call.
    pub fn pump<F>(&mut self, timeout: Option<Duration>, mut callback: F) -> Result
    where
        F: FnMut(&mut Context, &Event),
    {
        if self.pumping {
            return Err(self.violation("pump is not reentrant"));
        }
        self.ensure_live()?;
        self.pumping = true;
        let result = self.pump_inner(timeout, &mut callback);
        self.pumping = false;
        result
    }

    fn pump_inner<F>(&mut self, timeout: Option<Duration>, callback: &mut F) -> Result
    where
        F: FnMut(&mut Context, &Event),
    {
        self.drain_posted(callback);
        let polled = match self.backend.poll(timeout) {
            Ok(events) => events,
            Err(error) => return Err(self.backend_failure(error)),
        };
        for platform_event in polled {
            if self.is_lost() {
                break;
            }
            for event in dispatch::apply(self, platform_event) {
                if dispatch::deliverable(self, &event) {
                    callback(self, &event);
                }
            }
        }
        self.drain_posted(callback);
        if self.is_lost() {
            Err(Error::ContextLost)
        }
        else {
            Ok(())
        }
    }

    fn drain_posted<F>(&mut self, callback: &mut F)
    where
        F: FnMut(&mut Context, &Event),
    {
        // One at a time: the queue lock is never held across a callback.
        loop {
            let user = self.shared.posted.lock().pop_front();
            match user {
                Some(user) => {
                    let event = Event::User(user);
                    if dispatch::deliverable(self, &event) {
                        callback(self, &event);
                    }
                }
                None => break,
            }
        }
    }

    /// Applies the selected context attributes.
    pub fn update(&mut self, update: &ContextUpdate) -> Result {
        self.ensure_live()?;
        self.backend
            .apply_context_update(update)
            .map_err(|error| self.backend_failure(error))?;
        if let Some(mask) = update.event_mask {
            self.event_mask = mask;
        }
        Ok(())
    }

    pub fn set_event_mask(&mut self, mask: EventMask) -> Result {
        self.update(&ContextUpdate::new().with_event_mask(mask))
    }

    /// Replaces the diagnostic handler. Diagnostics are advisory telemetry;
    /// they never affect control flow.
    pub fn set_diagnostic_handler(&mut self, handler: Option<DiagnosticHandler>) {
        self.reporter.set_handler(handler);
    }

    pub(crate) fn create_window(&mut self, attributes: WindowAttributes) -> Result<Window> {
        self.ensure_live()?;
        if let Some(message) = attributes.legality_error() {
            return Err(self.invalid(message));
        }
        let id = self.allocate_handle();
        self.backend
            .create_window(id, &attributes)
            .map_err(|error| self.backend_failure(error))?;
        let channels = self.backend.input_channels();
        self.windows.insert(
            id,
            WindowState::new(id, attributes, channels.keys, channels.mouse_buttons),
        );
        tracing::debug!(context = self.id, window = id, "window created");
        Ok(Window::new(self.id, id))
    }

    /// Destroys a window. Always legal, even on a lost context; never
    /// affects the context itself.
    pub fn destroy_window(&mut self, window: Window) -> Result {
        if window.context != self.id {
            return Err(self.violation("window does not belong to this context"));
        }
        if self.windows.remove(&window.id).is_none() {
            return Err(self.violation("window already destroyed or unknown"));
        }
        self.backend.destroy_window(window.id);
        tracing::debug!(context = self.id, window = window.id, "window destroyed");
        Ok(())
    }

    /// Applies the selected window attributes.
    ///
    /// Only the fields selected on `update` are read and applied. Each field
    /// is validated first; an illegal value is a programming error. Setting
    /// the logical size surfaces a resize event on a later pump, and setting
    /// a presentation field surfaces one aggregated presentation-change
    /// event. Entering fullscreen saves the window's placement and style;
    /// leaving it restores them exactly.
    pub fn update_window(&mut self, window: Window, update: &WindowUpdate) -> Result {
        self.ensure_live()?;
        if window.context != self.id || !self.windows.contains_key(&window.id) {
            return Err(self.violation("unknown window"));
        }
        if let Some(message) = update.legality_error() {
            return Err(self.invalid(message));
        }
        if let Some(Some(cursor)) = update.cursor {
            if cursor.context != self.id || !self.cursors.contains(&cursor.id) {
                return Err(self.violation("cursor does not belong to this context"));
            }
        }
        if let Some(monitor) = update.fullscreen_monitor.as_ref() {
            if monitor.record().context() != self.id {
                return Err(self.violation("monitor does not belong to this context"));
            }
            if !monitor.is_active() {
                self.reporter.report(
                    Diagnostic::ResourceUnavailable,
                    "fullscreen target monitor is disconnected",
                );
                return Err(Error::Failure);
            }
        }
        let restore = self.save_or_restore_placement(window.id, update);
        self.backend
            .apply_window_update(window.id, update)
            .map_err(|error| self.backend_failure(error))?;
        let state = self
            .windows
            .get_mut(&window.id)
            .expect("window registry changed during update");
        update.apply_to(&mut state.requested);
        update.apply_to(&mut state.effective);
        state.text_area = state.effective.text_input.area;
        if let Some(restore) = restore {
            self.backend
                .apply_window_update(window.id, &restore)
                .map_err(|error| self.backend_failure(error))?;
            let state = self
                .windows
                .get_mut(&window.id)
                .expect("window registry changed during update");
            restore.apply_to(&mut state.effective);
        }
        Ok(())
    }

    /// Records the placement to restore when leaving fullscreen, or takes it
    /// when the update leaves fullscreen.
    fn save_or_restore_placement(&mut self, window: u64, update: &WindowUpdate) -> Option<WindowUpdate> {
        let fullscreen = update.fullscreen?;
        let state = self.windows.get_mut(&window)?;
        let currently = state.effective.fullscreen;
        if fullscreen && !currently && state.saved.is_none() {
            state.saved = Some(SavedPlacement {
                origin: state.effective.origin,
                logical_size: state.effective.logical_size,
                decorated: state.effective.decorated,
                resizable: state.effective.resizable,
            });
            None
        }
        else if !fullscreen && currently {
            state.saved.take().map(|saved| {
                WindowUpdate::new()
                    .with_origin(saved.origin)
                    .with_logical_size(saved.logical_size)
                    .with_decorated(saved.decorated)
                    .with_resizable(saved.resizable)
            })
        }
        else {
            None
        }
    }

    pub fn set_title<T>(&mut self, window: Window, title: T) -> Result
    where
        T: AsRef<str>,
    {
        self.update_window(window, &WindowUpdate::new().with_title(title))
    }

    pub fn set_cursor(&mut self, window: Window, cursor: Option<Cursor>) -> Result {
        self.update_window(window, &WindowUpdate::new().with_cursor(cursor))
    }

    pub fn set_cursor_mode(&mut self, window: Window, mode: CursorMode) -> Result {
        self.update_window(window, &WindowUpdate::new().with_cursor_mode(mode))
    }

    pub fn set_min_size<T>(&mut self, window: Window, size: (T, T)) -> Result
    where
        T: Into<LogicalUnit>,
    {
        self.update_window(window, &WindowUpdate::new().with_min_size(size))
    }

    pub fn set_max_size<T>(&mut self, window: Window, size: (T, T)) -> Result
    where
        T: Into<LogicalUnit>,
    {
        self.update_window(window, &WindowUpdate::new().with_max_size(size))
    }

    pub fn set_aspect_ratio(&mut self, window: Window, ratio: (u32, u32)) -> Result {
        self.update_window(window, &WindowUpdate::new().with_aspect_ratio(ratio))
    }

    pub fn set_logical_size<T>(&mut self, window: Window, size: (T, T)) -> Result
    where
        T: Into<LogicalUnit>,
    {
        self.update_window(window, &WindowUpdate::new().with_logical_size(size))
    }

    pub fn set_origin(&mut self, window: Window, origin: (i32, i32)) -> Result {
        self.update_window(window, &WindowUpdate::new().with_origin(origin))
    }

    pub fn set_resizable(&mut self, window: Window, resizable: bool) -> Result {
        self.update_window(window, &WindowUpdate::new().with_resizable(resizable))
    }

    pub fn set_decorated(&mut self, window: Window, decorated: bool) -> Result {
        self.update_window(window, &WindowUpdate::new().with_decorated(decorated))
    }

    pub fn set_mouse_passthrough(&mut self, window: Window, passthrough: bool) -> Result {
        self.update_window(
            window,
            &WindowUpdate::new().with_mouse_passthrough(passthrough),
        )
    }

    pub fn set_accept_drop(&mut self, window: Window, accept: bool) -> Result {
        self.update_window(window, &WindowUpdate::new().with_accept_drop(accept))
    }

    pub fn set_primary_selection(&mut self, window: Window, enabled: bool) -> Result {
        self.update_window(
            window,
            &WindowUpdate::new().with_primary_selection(enabled),
        )
    }

    pub fn set_text_input(&mut self, window: Window, text_input: TextInput) -> Result {
        self.update_window(window, &WindowUpdate::new().with_text_input(text_input))
    }

    pub fn set_window_event_mask(&mut self, window: Window, mask: EventMask) -> Result {
        self.update_window(window, &WindowUpdate::new().with_event_mask(mask))
    }

    pub fn set_icon(&mut self, window: Window, icon: Option<Image>) -> Result {
        self.update_window(window, &WindowUpdate::new().with_icon(icon))
    }

    pub fn set_visible(&mut self, window: Window, visible: bool) -> Result {
        self.update_window(window, &WindowUpdate::new().with_visible(visible))
    }

    pub fn set_minimized(&mut self, window: Window, minimized: bool) -> Result {
        self.update_window(window, &WindowUpdate::new().with_minimized(minimized))
    }

    pub fn set_maximized(&mut self, window: Window, maximized: bool) -> Result {
        self.update_window(window, &WindowUpdate::new().with_maximized(maximized))
    }

    pub fn set_fullscreen(&mut self, window: Window, fullscreen: bool) -> Result {
        self.update_window(window, &WindowUpdate::new().with_fullscreen(fullscreen))
    }

    pub fn set_focused(&mut self, window: Window, focused: bool) -> Result {
        self.update_window(window, &WindowUpdate::new().with_focused(focused))
    }

    pub fn request_focus(&mut self, window: Window) -> Result {
        self.window_operation(window, |backend, window| backend.request_focus(window))
    }

    pub fn request_frame(&mut self, window: Window) -> Result {
        self.window_operation(window, |backend, window| backend.request_frame(window))
    }

    pub fn request_attention(&mut self, window: Window) -> Result {
        self.window_operation(window, |backend, window| backend.request_attention(window))
    }

    fn window_operation<F>(&mut self, window: Window, operation: F) -> Result
    where
        F: FnOnce(&mut dyn Backend, u64) -> std::result::Result<(), BackendError>,
    {
        self.ensure_live()?;
        if window.context != self.id || !self.windows.contains_key(&window.id) {
            return Err(self.violation("unknown window"));
        }
        operation(self.backend.as_mut(), window.id).map_err(|error| self.backend_failure(error))
    }

    pub fn create_cursor(&mut self, source: CursorSource) -> Result<Cursor> {
        self.ensure_live()?;
        let id = self.allocate_handle();
        self.backend
            .create_cursor(id, &source)
            .map_err(|error| self.backend_failure(error))?;
        self.cursors.insert(id);
        Ok(Cursor::new(self.id, id))
    }

    pub fn destroy_cursor(&mut self, cursor: Cursor) -> Result {
        if cursor.context != self.id {
            return Err(self.violation("cursor does not belong to this context"));
        }
        if !self.cursors.remove(&cursor.id) {
            return Err(self.violation("cursor already destroyed or unknown"));
        }
        // Windows fall back to the default cursor.
        for state in self.windows.values_mut() {
            if state.effective.cursor == Some(cursor) {
                state.effective.cursor = None;
            }
            if state.requested.cursor == Some(cursor) {
                state.requested.cursor = None;
            }
        }
        self.backend.destroy_cursor(cursor.id);
        Ok(())
    }

    /// Gets the connected monitors. The cache is built on first demand and
    /// maintained by hot-plug events afterwards.
    pub fn monitors(&mut self) -> Vec<Monitor> {
        if !self.monitors_seeded {
            self.refresh_monitors();
        }
        self.monitors.clone()
    }

    pub fn primary_monitor(&mut self) -> Option<Monitor> {
        let monitors = self.monitors();
        monitors
            .iter()
            .find(|monitor| monitor.is_primary())
            .or_else(|| monitors.first())
            .cloned()
    }

    /// Rebuilds the monitor cache from the backend. Cached records that
    /// disappeared are orphaned; records that persist keep their identity
    /// and any outside holders.
    pub fn refresh_monitors(&mut self) -> Vec<Monitor> {
        let descriptors = self.backend.monitors();
        let mut cache = std::mem::take(&mut self.monitors);
        cache.retain(|cached| {
            if descriptors
                .iter()
                .any(|descriptor| descriptor.id == cached.id())
            {
                true
            }
            else {
                cached.disconnect();
                false
            }
        });
        for descriptor in descriptors {
            match cache.iter().find(|cached| cached.id() == descriptor.id) {
                Some(cached) => cached.apply_descriptor(descriptor),
                None => cache.push(Monitor::from_descriptor(self.id, descriptor)),
            }
        }
        self.monitors = cache;
        self.monitors_seeded = true;
        self.monitors.clone()
    }

    /// Gets the connected controllers. The list is built on first demand and
    /// maintained by hot-plug events afterwards.
    pub fn controllers(&mut self) -> Vec<Controller> {
        if !self.controllers_seeded {
            self.refresh_controllers();
        }
        self.controllers.clone()
    }

    /// Rebuilds the controller list from the backend, mirroring
    /// [`refresh_monitors`](Context::refresh_monitors).
    pub fn refresh_controllers(&mut self) -> Vec<Controller> {
        let descriptors = self.backend.controllers();
        let mut cache = std::mem::take(&mut self.controllers);
        cache.retain(|cached| {
            if descriptors
                .iter()
                .any(|descriptor| descriptor.id == cached.id())
            {
                true
            }
            else {
                cached.disconnect();
                false
            }
        });
        for descriptor in descriptors {
            if !cache.iter().any(|cached| cached.id() == descriptor.id) {
                cache.push(Controller::from_descriptor(self.id, descriptor));
            }
        }
        self.controllers = cache;
        self.controllers_seeded = true;
        self.controllers.clone()
    }

    // Passive accessors. These never fail: queries against unknown windows,
    // windows that are not yet ready, or lost windows degrade to zeroed and
    // empty values.

    pub fn is_window_ready(&self, window: Window) -> bool {
        self.state_of(window)
            .map(|state| state.is_ready())
            .unwrap_or(false)
    }

    pub fn window_flags(&self, window: Window) -> WindowFlags {
        self.state_of(window)
            .map(|state| state.flags)
            .unwrap_or_default()
    }

    pub fn window_geometry(&self, window: Window) -> WindowGeometry {
        self.state_of(window)
            .filter(|state| state.is_ready())
            .map(|state| state.geometry)
            .unwrap_or_default()
    }

    /// Gets the effective attribute snapshot of a window.
    pub fn window_attributes(&self, window: Window) -> WindowAttributes {
        self.state_of(window)
            .map(|state| state.effective.clone())
            .unwrap_or_default()
    }

    /// Gets the attributes as last requested by the application, which may
    /// differ from the effective snapshot.
    pub fn requested_window_attributes(&self, window: Window) -> WindowAttributes {
        self.state_of(window)
            .map(|state| state.requested.clone())
            .unwrap_or_default()
    }

    pub fn window_title(&self, window: Window) -> String {
        self.state_of(window)
            .map(|state| state.effective.title.clone())
            .unwrap_or_default()
    }

    pub fn key_state(&self, window: Window, scancode: u32) -> ElementState {
        self.state_of(window)
            .filter(|state| state.is_ready())
            .and_then(|state| state.keys.get(scancode as usize).copied())
            .unwrap_or_default()
    }

    pub fn mouse_button_state(&self, window: Window, button: MouseButton) -> ElementState {
        self.state_of(window)
            .filter(|state| state.is_ready())
            .and_then(|state| state.mouse.get(button.channel()).copied())
            .unwrap_or_default()
    }

    pub fn cursor_position(&self, window: Window) -> (LogicalUnit, LogicalUnit) {
        self.state_of(window)
            .filter(|state| state.is_ready())
            .map(|state| state.cursor_position)
            .unwrap_or_default()
    }

    pub fn native_handle(&self, window: Window) -> Option<NativeHandle> {
        self.state_of(window)?;
        self.backend.native_handle(window.id)
    }

    // Userdata and extensions.

    pub fn set_userdata<T>(&mut self, userdata: T)
    where
        T: Any,
    {
        self.userdata = Some(Box::new(userdata));
    }

    pub fn userdata<T>(&self) -> Option<&T>
    where
        T: Any,
    {
        self.userdata.as_ref()?.downcast_ref()
    }

    pub fn set_window_userdata<T>(&mut self, window: Window, userdata: T) -> Result
    where
        T: Any,
    {
        if window.context != self.id {
            return Err(self.violation("window does not belong to this context"));
        }
        match self.windows.get_mut(&window.id) {
            Some(state) => {
                state.userdata = Some(Box::new(userdata));
                Ok(())
            }
            None => Err(self.violation("unknown window")),
        }
    }

    pub fn window_userdata<T>(&self, window: Window) -> Option<&T>
    where
        T: Any,
    {
        self.state_of(window)?.userdata.as_ref()?.downcast_ref()
    }

    /// Installs a pluggable subsystem state, keyed by its type. Extension
    /// state is dropped when the context is destroyed; cleanup hooks belong
    /// in `Drop` implementations.
    pub fn set_extension<T>(&mut self, extension: T)
    where
        T: Any,
    {
        self.extensions
            .insert(TypeId::of::<T>(), Box::new(extension));
    }

    pub fn extension<T>(&self) -> Option<&T>
    where
        T: Any,
    {
        self.extensions.get(&TypeId::of::<T>())?.downcast_ref()
    }

    pub fn extension_mut<T>(&mut self) -> Option<&mut T>
    where
        T: Any,
    {
        self.extensions.get_mut(&TypeId::of::<T>())?.downcast_mut()
    }

    pub fn remove_extension<T>(&mut self) -> Option<T>
    where
        T: Any,
    {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|extension| extension.downcast().ok())
            .map(|extension| *extension)
    }

    // Internal plumbing.

    fn state_of(&self, window: Window) -> Option<&WindowState> {
        if window.context == self.id {
            self.windows.get(&window.id)
        }
        else {
            None
        }
    }

    pub(crate) fn window_state(&self, window: u64) -> Option<&WindowState> {
        self.windows.get(&window)
    }

    pub(crate) fn window_state_mut(&mut self, window: u64) -> Option<&mut WindowState> {
        self.windows.get_mut(&window)
    }

    pub(crate) fn find_monitor(&self, monitor: u64) -> Option<Monitor> {
        self.monitors
            .iter()
            .find(|cached| cached.id() == monitor)
            .cloned()
    }

    pub(crate) fn find_controller(&self, controller: u64) -> Option<Controller> {
        self.controllers
            .iter()
            .find(|cached| cached.id() == controller)
            .cloned()
    }

    pub(crate) fn mark_lost(&mut self) {
        self.flags |= ContextFlags::LOST;
        self.shared.lost.store(true, Ordering::Release);
    }

    fn allocate_handle(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn ensure_live(&self) -> Result {
        if self.is_lost() {
            self.reporter
                .report(Diagnostic::BackendFailure, "context is lost");
            Err(Error::ContextLost)
        }
        else {
            Ok(())
        }
    }

    /// A violated precondition: panics under validation, degrades to a
    /// recoverable failure otherwise.
    fn violation(&self, message: &'static str) -> Error {
        self.reporter.report(Diagnostic::PreconditionFailure, message);
        if validation_enabled() {
            panic!("precondition violated: {}", message);
        }
        Error::Failure
    }

    /// An illegal attribute value: same failure class as `violation`.
    fn invalid(&self, message: &'static str) -> Error {
        self.reporter.report(Diagnostic::InvalidArgument, message);
        if validation_enabled() {
            panic!("illegal attribute value: {}", message);
        }
        Error::Failure
    }

    fn backend_failure(&mut self, error: BackendError) -> Error {
        self.reporter.report(error.diagnostic, &error.message);
        if error.fatal {
            self.mark_lost();
            Error::ContextLost
        }
        else {
            Error::Failure
        }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        // Posting and waking become no-ops for outside holders.
        self.shared.lost.store(true, Ordering::Release);
        let windows: Vec<u64> = self.windows.keys().copied().collect();
        for window in windows {
            self.backend.destroy_window(window);
        }
        self.windows.clear();
        let cursors: Vec<u64> = self.cursors.drain().collect();
        for cursor in cursors {
            self.backend.destroy_cursor(cursor);
        }
        // Orphan cached devices so outside holders observe the loss; the
        // records are freed with their last handle.
        for monitor in self.monitors.drain(..) {
            monitor.disconnect();
        }
        for controller in self.controllers.drain(..) {
            controller.disconnect();
        }
        self.extensions.clear();
        tracing::info!(context = self.id, "context destroyed");
    }
}

// Tests that drive the headless backend live in `tests/context.rs`; inside
// this crate's unit-test target the backend's `maru_core` types are a
// separate build and do not unify with `crate` paths.
