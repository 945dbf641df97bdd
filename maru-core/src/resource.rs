//! Shared base record for reference-counted resources.
//!
//! Monitors and controllers are hot-pluggable and not exclusively owned:
//! application code may hold live handles while the underlying device is
//! connected or even after it disconnects. Each handle wraps an atomically
//! reference-counted [`Record`]. Cloning a handle retains the record and
//! dropping one releases it; the context's cache holds one reference for as
//! long as the device is active.
//!
//! The lifecycle per record is `ACTIVE` (OS-visible, cache holds a
//! reference), then on disconnect `ORPHANED` (inactive, `LOST` flag set,
//! last-known state frozen, cache reference dropped), then on the last
//! release `FREED`. A disconnect with no outside holders frees immediately;
//! an orphaned record survives until the last handle drops, never longer.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bitflags::bitflags;
use parking_lot::Mutex;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct ResourceFlags: u32 {
        /// The OS-level counterpart disconnected. Sticky.
        const LOST = 1 << 0;
    }
}

/// Per-resource counters, accumulated since the last reset.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct ResourceMetrics {
    /// Events attributed to this resource.
    pub events: u64,
    /// Reconfigurations (mode changes, state array updates).
    pub state_changes: u64,
}

struct Stored<T> {
    flags: ResourceFlags,
    metrics: ResourceMetrics,
    userdata: Option<Arc<dyn Any + Send + Sync>>,
    state: T,
}

/// The base record embedded in every reference-counted handle.
///
/// `active` uses acquire/release ordering so that a non-owner thread may
/// safely drop its last reference to an orphaned record without racing the
/// owner thread's cache rebuild.
pub(crate) struct Record<T> {
    id: u64,
    context: u64,
    active: AtomicBool,
    state: Mutex<Stored<T>>,
}

impl<T> Record<T> {
    pub fn new(context: u64, id: u64, state: T) -> Arc<Self> {
        Arc::new(Record {
            id,
            context,
            active: AtomicBool::new(true),
            state: Mutex::new(Stored {
                flags: ResourceFlags::empty(),
                metrics: ResourceMetrics::default(),
                userdata: None,
                state,
            }),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn context(&self) -> u64 {
        self.context
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn flags(&self) -> ResourceFlags {
        self.state.lock().flags
    }

    /// Transitions an active record to the orphaned state, freezing its
    /// last-known state. Idempotent.
    pub fn disconnect(&self) {
        self.state.lock().flags |= ResourceFlags::LOST;
        self.active.store(false, Ordering::Release);
    }

    pub fn metrics(&self) -> ResourceMetrics {
        self.state.lock().metrics
    }

    /// Zeroes the counters block. Always succeeds; internally synchronized.
    pub fn reset_metrics(&self) {
        self.state.lock().metrics = ResourceMetrics::default();
    }

    pub fn note_event(&self) {
        self.state.lock().metrics.events += 1;
    }

    pub fn note_state_change(&self) {
        let mut stored = self.state.lock();
        stored.metrics.events += 1;
        stored.metrics.state_changes += 1;
    }

    pub fn set_userdata(&self, userdata: Option<Arc<dyn Any + Send + Sync>>) {
        self.state.lock().userdata = userdata;
    }

    pub fn userdata(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.state.lock().userdata.clone()
    }

    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.state.lock().state)
    }

    pub fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        f(&mut self.state.lock().state)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn disconnect_is_sticky_and_freezes_state() {
        let record = Record::new(1, 7, "frozen");
        assert!(record.is_active());
        record.disconnect();
        record.disconnect();
        assert!(!record.is_active());
        assert!(record.flags().contains(ResourceFlags::LOST));
        assert_eq!(record.with(|state| *state), "frozen");
    }

    #[test]
    fn orphaned_record_lives_until_last_release() {
        let cache = Record::new(1, 7, ());
        let held = Arc::clone(&cache);
        let probe = Arc::downgrade(&cache);
        cache.disconnect();
        drop(cache); // The cache drops its reference on disconnect.
        assert!(probe.upgrade().is_some());
        drop(held);
        assert!(probe.upgrade().is_none());
    }

    #[test]
    fn metrics_reset_zeroes_counters() {
        let record = Record::new(1, 7, ());
        record.note_event();
        record.note_state_change();
        assert_eq!(
            record.metrics(),
            ResourceMetrics {
                events: 2,
                state_changes: 1,
            },
        );
        record.reset_metrics();
        assert_eq!(record.metrics(), ResourceMetrics::default());
    }
}
