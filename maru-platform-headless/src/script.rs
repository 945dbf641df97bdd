//! Scripted control of a headless backend.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use maru_core::controller::ControllerDescriptor;
use maru_core::monitor::MonitorDescriptor;
use maru_core::platform::{CursorId, PlatformEvent, WindowId};
use parking_lot::{Condvar, Mutex};

use crate::window::HeadlessWindow;

#[derive(Default)]
pub(crate) struct Inner {
    pub queue: VecDeque<PlatformEvent>,
    pub woken: bool,
    pub fail_connects: u32,
    pub fail_window_creations: u32,
    pub monitors: Vec<MonitorDescriptor>,
    pub controllers: Vec<ControllerDescriptor>,
    pub windows: BTreeMap<WindowId, HeadlessWindow>,
    pub cursors: HashSet<CursorId>,
}

#[derive(Default)]
pub(crate) struct Shared {
    pub inner: Mutex<Inner>,
    pub condvar: Condvar,
}

/// Drives a scripted headless backend from test code.
///
/// Cloneable and callable from any thread. Injected events surface from the
/// backend's next poll; injecting wakes a blocked poll.
#[derive(Clone)]
pub struct Script {
    shared: Arc<Shared>,
}

impl Script {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Script { shared }
    }

    fn notify(&self, inner: &mut Inner) {
        inner.woken = true;
        self.shared.condvar.notify_all();
    }

    /// Queues a raw platform event.
    pub fn inject(&self, event: PlatformEvent) {
        let mut inner = self.shared.inner.lock();
        inner.queue.push_back(event);
        self.notify(&mut inner);
    }

    /// Severs the connection. The owning context observes a lost transition
    /// on its next pump.
    pub fn disconnect(&self) {
        self.inject(PlatformEvent::ConnectionLost);
    }

    /// Unblocks a pending poll without queuing anything.
    pub fn wake(&self) {
        let mut inner = self.shared.inner.lock();
        self.notify(&mut inner);
    }

    /// Hot-plugs a monitor: the enumeration and the connected event stay in
    /// step.
    pub fn plug_monitor(&self, descriptor: MonitorDescriptor) {
        let mut inner = self.shared.inner.lock();
        inner.monitors.retain(|monitor| monitor.id != descriptor.id);
        inner.monitors.push(descriptor.clone());
        inner
            .queue
            .push_back(PlatformEvent::MonitorConnected(descriptor));
        self.notify(&mut inner);
    }

    pub fn unplug_monitor(&self, monitor: u64) {
        let mut inner = self.shared.inner.lock();
        inner.monitors.retain(|descriptor| descriptor.id != monitor);
        inner
            .queue
            .push_back(PlatformEvent::MonitorDisconnected { monitor });
        self.notify(&mut inner);
    }

    pub fn plug_controller(&self, descriptor: ControllerDescriptor) {
        let mut inner = self.shared.inner.lock();
        inner
            .controllers
            .retain(|controller| controller.id != descriptor.id);
        inner.controllers.push(descriptor.clone());
        inner
            .queue
            .push_back(PlatformEvent::ControllerConnected(descriptor));
        self.notify(&mut inner);
    }

    pub fn unplug_controller(&self, controller: u64) {
        let mut inner = self.shared.inner.lock();
        inner
            .controllers
            .retain(|descriptor| descriptor.id != controller);
        inner
            .queue
            .push_back(PlatformEvent::ControllerDisconnected { controller });
        self.notify(&mut inner);
    }

    /// Fails the next connection attempt.
    pub fn fail_next_connect(&self) {
        self.shared.inner.lock().fail_connects += 1;
    }

    /// Fails the next window creation with a recoverable error.
    pub fn fail_next_window_creation(&self) {
        self.shared.inner.lock().fail_window_creations += 1;
    }

    /// Counts the backend objects currently alive. Zero after every window
    /// and cursor is destroyed; used to assert leak-freedom.
    pub fn live_objects(&self) -> usize {
        let inner = self.shared.inner.lock();
        inner.windows.len() + inner.cursors.len()
    }
}
