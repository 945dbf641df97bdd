//! Monitors.
//!
//! A [`Monitor`] is a reference-counted handle to a display device. Handles
//! remain valid across hot-unplug: a disconnected monitor keeps its
//! last-known state, reports [`is_active`] as `false`, and is freed when the
//! last handle drops. Cloning and dropping handles is safe from any thread.
//!
//! [`is_active`]: Monitor::is_active

use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use crate::resource::{Record, ResourceFlags, ResourceMetrics};

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct VideoMode {
    pub width: u32,
    pub height: u32,
    /// Refresh rate in hertz.
    pub refresh_rate: u32,
}

/// A backend's description of a connected monitor.
#[derive(Clone, Debug, PartialEq)]
pub struct MonitorDescriptor {
    pub id: u64,
    pub name: String,
    pub primary: bool,
    /// Position in virtual display coordinates.
    pub position: (i32, i32),
    pub scale: f64,
    pub current_mode: VideoMode,
    pub modes: Vec<VideoMode>,
}

pub(crate) struct MonitorState {
    name: String,
    primary: bool,
    position: (i32, i32),
    scale: f64,
    current_mode: VideoMode,
    modes: Vec<VideoMode>,
}

impl From<MonitorDescriptor> for MonitorState {
    fn from(descriptor: MonitorDescriptor) -> Self {
        MonitorState {
            name: descriptor.name,
            primary: descriptor.primary,
            position: descriptor.position,
            scale: descriptor.scale,
            current_mode: descriptor.current_mode,
            modes: descriptor.modes,
        }
    }
}

#[derive(Clone)]
pub struct Monitor {
    record: Arc<Record<MonitorState>>,
}

impl Monitor {
    pub(crate) fn from_descriptor(context: u64, descriptor: MonitorDescriptor) -> Self {
        let id = descriptor.id;
        Monitor {
            record: Record::new(context, id, descriptor.into()),
        }
    }

    pub(crate) fn record(&self) -> &Arc<Record<MonitorState>> {
        &self.record
    }

    pub(crate) fn apply_descriptor(&self, descriptor: MonitorDescriptor) {
        self.record.with_mut(|state| *state = descriptor.into());
    }

    pub(crate) fn apply_mode(&self, mode: VideoMode) {
        self.record.with_mut(|state| state.current_mode = mode);
        self.record.note_state_change();
    }

    pub(crate) fn disconnect(&self) {
        self.record.disconnect();
    }

    pub fn id(&self) -> u64 {
        self.record.id()
    }

    pub fn name(&self) -> String {
        self.record.with(|state| state.name.clone())
    }

    /// `true` while the OS-level device is connected.
    pub fn is_active(&self) -> bool {
        self.record.is_active()
    }

    pub fn is_lost(&self) -> bool {
        self.record.flags().contains(ResourceFlags::LOST)
    }

    pub fn is_primary(&self) -> bool {
        self.record.with(|state| state.primary)
    }

    pub fn position(&self) -> (i32, i32) {
        self.record.with(|state| state.position)
    }

    pub fn scale(&self) -> f64 {
        self.record.with(|state| state.scale)
    }

    pub fn current_mode(&self) -> VideoMode {
        self.record.with(|state| state.current_mode)
    }

    pub fn modes(&self) -> Vec<VideoMode> {
        self.record.with(|state| state.modes.clone())
    }

    pub fn metrics(&self) -> ResourceMetrics {
        self.record.metrics()
    }

    pub fn reset_metrics(&self) {
        self.record.reset_metrics()
    }

    pub fn set_userdata<T>(&self, userdata: T)
    where
        T: Any + Send + Sync,
    {
        self.record.set_userdata(Some(Arc::new(userdata)));
    }

    pub fn userdata<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.record
            .userdata()
            .and_then(|userdata| userdata.downcast().ok())
    }
}

impl Debug for Monitor {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        formatter
            .debug_struct("Monitor")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("active", &self.is_active())
            .finish()
    }
}

impl Eq for Monitor {}

impl PartialEq for Monitor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.record, &other.record)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn descriptor(id: u64) -> MonitorDescriptor {
        MonitorDescriptor {
            id,
            name: format!("monitor-{}", id),
            primary: id == 0,
            position: (0, 0),
            scale: 1.0,
            current_mode: VideoMode {
                width: 1920,
                height: 1080,
                refresh_rate: 60,
            },
            modes: vec![VideoMode {
                width: 1920,
                height: 1080,
                refresh_rate: 60,
            }],
        }
    }

    #[test]
    fn retain_disconnect_release_frees_once() {
        // Cache reference plus one application handle.
        let cached = Monitor::from_descriptor(1, descriptor(0));
        let held = cached.clone();
        let probe = Arc::downgrade(cached.record());

        cached.disconnect();
        drop(cached); // Cache rebuild drops its reference.
        assert!(held.is_lost());
        assert!(!held.is_active());
        assert_eq!(held.name(), "monitor-0"); // Frozen last-known state.
        assert!(probe.upgrade().is_some());

        drop(held);
        assert!(probe.upgrade().is_none());
    }

    #[test]
    fn disconnect_without_holders_frees_immediately() {
        let cached = Monitor::from_descriptor(1, descriptor(0));
        let probe = Arc::downgrade(cached.record());
        cached.disconnect();
        drop(cached);
        assert!(probe.upgrade().is_none());
    }

    #[test]
    fn cross_thread_release_does_not_race_disconnect() {
        let cached = Monitor::from_descriptor(1, descriptor(0));
        let held = cached.clone();
        let probe = Arc::downgrade(cached.record());
        let release = thread::spawn(move || drop(held));
        cached.disconnect();
        drop(cached);
        release.join().unwrap();
        assert!(probe.upgrade().is_none());
    }

    #[test]
    fn mode_change_updates_metrics() {
        let monitor = Monitor::from_descriptor(1, descriptor(0));
        monitor.apply_mode(VideoMode {
            width: 1280,
            height: 720,
            refresh_rate: 120,
        });
        assert_eq!(monitor.current_mode().refresh_rate, 120);
        assert_eq!(monitor.metrics().state_changes, 1);
        monitor.reset_metrics();
        assert_eq!(monitor.metrics(), ResourceMetrics::default());
    }
}
