//! In-process backend for testing without a display server.
//!
//! The headless backend models windows, monitors, and input entirely in
//! memory. It honors the dispatch contract: window creation surfaces a
//! configure and then a ready event from a later poll, attribute updates
//! that change geometry or presentation state echo configure events, and a
//! blocked poll is interruptible by a waker from any thread.
//!
//! [`scripted`] additionally hands back a [`Script`] handle that injects
//! events, hot-plugs devices, and schedules failures, which is how the test
//! suites drive deterministic scenarios.

#![allow(unknown_lints)] // Allow clippy lints.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use maru_core::attributes::{ContextUpdate, WindowAttributes, WindowUpdate};
use maru_core::controller::ControllerDescriptor;
use maru_core::cursor::CursorSource;
use maru_core::diagnostic::Diagnostic;
use maru_core::display::WindowGeometry;
use maru_core::error::BackendError;
use maru_core::monitor::{MonitorDescriptor, VideoMode};
use maru_core::platform::{
    Backend, BackendKind, Connector, CursorId, InputChannels, NativeHandle, PlatformEvent, Wake,
    WindowId,
};
use maru_core::window::WindowFlags;

mod script;
mod window;

pub use crate::script::Script;

use crate::script::{Inner, Shared};
use crate::window::HeadlessWindow;

const KEY_CHANNELS: usize = 256;
const MOUSE_BUTTON_CHANNELS: usize = 8;

fn seed_monitor() -> MonitorDescriptor {
    MonitorDescriptor {
        id: 0,
        name: "Headless Display".to_owned(),
        primary: true,
        position: (0, 0),
        scale: 1.0,
        current_mode: VideoMode {
            width: 1920,
            height: 1080,
            refresh_rate: 60,
        },
        modes: vec![
            VideoMode {
                width: 1920,
                height: 1080,
                refresh_rate: 60,
            },
            VideoMode {
                width: 1280,
                height: 720,
                refresh_rate: 60,
            },
        ],
    }
}

/// Connects the headless backend. Always available; typically installed
/// last in a connector list as an unconditional fallback.
pub struct HeadlessConnector {
    shared: Arc<Shared>,
}

impl Default for HeadlessConnector {
    fn default() -> Self {
        HeadlessConnector {
            shared: Arc::new(Shared::default()),
        }
    }
}

/// Creates a connector paired with the [`Script`] that drives it.
pub fn scripted() -> (Box<dyn Connector>, Script) {
    let connector = HeadlessConnector::default();
    let script = Script::new(Arc::clone(&connector.shared));
    (Box::new(connector), script)
}

impl Connector for HeadlessConnector {
    fn kind(&self) -> BackendKind {
        BackendKind::Headless
    }

    fn is_available(&self) -> bool {
        true
    }

    fn connect(&self) -> Result<Box<dyn Backend>, BackendError> {
        {
            let mut inner = self.shared.inner.lock();
            if inner.fail_connects > 0 {
                inner.fail_connects -= 1;
                return Err(BackendError::new(
                    BackendKind::Headless,
                    Diagnostic::BackendFailure,
                    "scripted connection failure",
                ));
            }
            if inner.monitors.is_empty() {
                inner.monitors.push(seed_monitor());
            }
        }
        tracing::debug!("headless backend connected");
        Ok(Box::new(HeadlessBackend {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct HeadlessWaker {
    shared: Arc<Shared>,
}

impl Wake for HeadlessWaker {
    fn wake(&self) {
        let mut inner = self.shared.inner.lock();
        inner.woken = true;
        self.shared.condvar.notify_all();
    }
}

struct HeadlessBackend {
    shared: Arc<Shared>,
}

impl HeadlessBackend {
    fn push_configure(
        inner: &mut Inner,
        window: WindowId,
        configure: (Option<WindowGeometry>, Option<WindowFlags>),
    ) {
        let (geometry, presentation) = configure;
        if geometry.is_some() || presentation.is_some() {
            inner.queue.push_back(PlatformEvent::WindowConfigured {
                window,
                geometry,
                presentation,
            });
        }
    }
}

impl Backend for HeadlessBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Headless
    }

    fn input_channels(&self) -> InputChannels {
        InputChannels {
            keys: KEY_CHANNELS,
            mouse_buttons: MOUSE_BUTTON_CHANNELS,
        }
    }

    fn poll(&mut self, timeout: Option<Duration>) -> Result<Vec<PlatformEvent>, BackendError> {
        let mut inner = self.shared.inner.lock();
        if inner.queue.is_empty() && !inner.woken {
            if let Some(timeout) = timeout {
                let deadline = Instant::now() + timeout;
                while inner.queue.is_empty() && !inner.woken {
                    if self
                        .shared
                        .condvar
                        .wait_until(&mut inner, deadline)
                        .timed_out()
                    {
                        break;
                    }
                }
            }
        }
        inner.woken = false;
        Ok(inner.queue.drain(..).collect())
    }

    fn waker(&self) -> Arc<dyn Wake> {
        Arc::new(HeadlessWaker {
            shared: Arc::clone(&self.shared),
        })
    }

    fn create_window(
        &mut self,
        window: WindowId,
        attributes: &WindowAttributes,
    ) -> Result<(), BackendError> {
        let mut inner = self.shared.inner.lock();
        if inner.fail_window_creations > 0 {
            inner.fail_window_creations -= 1;
            // No partial state: nothing was inserted yet.
            return Err(BackendError::new(
                BackendKind::Headless,
                Diagnostic::ResourceUnavailable,
                "scripted window creation failure",
            ));
        }
        let modeled = HeadlessWindow::new(attributes.clone(), &inner.monitors);
        let configure = modeled.initial_configure();
        inner.windows.insert(window, modeled);
        Self::push_configure(&mut inner, window, configure);
        inner.queue.push_back(PlatformEvent::WindowReady { window });
        self.shared.condvar.notify_all();
        Ok(())
    }

    fn destroy_window(&mut self, window: WindowId) {
        self.shared.inner.lock().windows.remove(&window);
    }

    fn apply_window_update(
        &mut self,
        window: WindowId,
        update: &WindowUpdate,
    ) -> Result<(), BackendError> {
        let mut inner = self.shared.inner.lock();
        let monitors = inner.monitors.clone();
        let configure = match inner.windows.get_mut(&window) {
            Some(modeled) => modeled.apply(update, &monitors),
            None => {
                return Err(BackendError::new(
                    BackendKind::Headless,
                    Diagnostic::Internal,
                    "update against unknown window",
                ));
            }
        };
        Self::push_configure(&mut inner, window, configure);
        self.shared.condvar.notify_all();
        Ok(())
    }

    fn apply_context_update(&mut self, _: &ContextUpdate) -> Result<(), BackendError> {
        Ok(())
    }

    fn request_focus(&mut self, window: WindowId) -> Result<(), BackendError> {
        let mut inner = self.shared.inner.lock();
        let configure = match inner.windows.get_mut(&window) {
            Some(modeled) => modeled.focus(),
            None => return Ok(()),
        };
        Self::push_configure(&mut inner, window, configure);
        self.shared.condvar.notify_all();
        Ok(())
    }

    fn request_frame(&mut self, _: WindowId) -> Result<(), BackendError> {
        Ok(())
    }

    fn request_attention(&mut self, _: WindowId) -> Result<(), BackendError> {
        Ok(())
    }

    fn create_cursor(&mut self, cursor: CursorId, _: &CursorSource) -> Result<(), BackendError> {
        self.shared.inner.lock().cursors.insert(cursor);
        Ok(())
    }

    fn destroy_cursor(&mut self, cursor: CursorId) {
        self.shared.inner.lock().cursors.remove(&cursor);
    }

    fn monitors(&mut self) -> Vec<MonitorDescriptor> {
        self.shared.inner.lock().monitors.clone()
    }

    fn controllers(&mut self) -> Vec<ControllerDescriptor> {
        self.shared.inner.lock().controllers.clone()
    }

    fn native_handle(&self, window: WindowId) -> Option<NativeHandle> {
        let inner = self.shared.inner.lock();
        if inner.windows.contains_key(&window) {
            Some(NativeHandle {
                backend: BackendKind::Headless,
                value: window,
            })
        }
        else {
            None
        }
    }
}

impl Drop for HeadlessBackend {
    fn drop(&mut self) {
        let mut inner = self.shared.inner.lock();
        inner.windows = BTreeMap::new();
        inner.cursors = HashSet::new();
        tracing::debug!("headless backend disconnected");
    }
}
