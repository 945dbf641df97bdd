//! Game controllers.
//!
//! Controllers follow the same reference-counted lifecycle as monitors:
//! handles survive hot-unplug with frozen state and are freed on the last
//! drop. Button and axis state arrays are sized to the channel counts the
//! backend reports, bounded by fixed capacities.

use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use arrayvec::ArrayVec;

use crate::event::ElementState;
use crate::resource::{Record, ResourceFlags, ResourceMetrics};

pub const MAX_CONTROLLER_BUTTONS: usize = 32;
pub const MAX_CONTROLLER_AXES: usize = 8;

/// A backend's description of a connected controller.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ControllerDescriptor {
    pub id: u64,
    pub name: String,
    /// Number of button channels, at most [`MAX_CONTROLLER_BUTTONS`].
    pub buttons: usize,
    /// Number of axis channels, at most [`MAX_CONTROLLER_AXES`].
    pub axes: usize,
}

pub(crate) struct ControllerState {
    name: String,
    buttons: ArrayVec<ElementState, MAX_CONTROLLER_BUTTONS>,
    axes: ArrayVec<f64, MAX_CONTROLLER_AXES>,
}

impl From<ControllerDescriptor> for ControllerState {
    fn from(descriptor: ControllerDescriptor) -> Self {
        let buttons = descriptor.buttons.min(MAX_CONTROLLER_BUTTONS);
        let axes = descriptor.axes.min(MAX_CONTROLLER_AXES);
        ControllerState {
            name: descriptor.name,
            buttons: (0..buttons).map(|_| ElementState::Released).collect(),
            axes: (0..axes).map(|_| 0.0).collect(),
        }
    }
}

#[derive(Clone)]
pub struct Controller {
    record: Arc<Record<ControllerState>>,
}

impl Controller {
    pub(crate) fn from_descriptor(context: u64, descriptor: ControllerDescriptor) -> Self {
        let id = descriptor.id;
        Controller {
            record: Record::new(context, id, descriptor.into()),
        }
    }

    pub(crate) fn record(&self) -> &Arc<Record<ControllerState>> {
        &self.record
    }

    pub(crate) fn apply_button(&self, button: u8, state: ElementState) {
        self.record.with_mut(|controller| {
            if let Some(channel) = controller.buttons.get_mut(button as usize) {
                *channel = state;
            }
        });
        self.record.note_state_change();
    }

    pub(crate) fn apply_axis(&self, axis: u8, value: f64) {
        self.record.with_mut(|controller| {
            if let Some(channel) = controller.axes.get_mut(axis as usize) {
                *channel = value;
            }
        });
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

    pub fn button_count(&self) -> usize {
        self.record.with(|state| state.buttons.len())
    }

    pub fn axis_count(&self) -> usize {
        self.record.with(|state| state.axes.len())
    }

    /// Gets the cached state of a button channel. Out-of-range channels read
    /// as released.
    pub fn button(&self, button: u8) -> ElementState {
        self.record.with(|state| {
            state
                .buttons
                .get(button as usize)
                .copied()
                .unwrap_or_default()
        })
    }

    /// Gets the cached position of an axis channel. Out-of-range channels
    /// read as zero.
    pub fn axis(&self, axis: u8) -> f64 {
        self.record
            .with(|state| state.axes.get(axis as usize).copied().unwrap_or(0.0))
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

impl Debug for Controller {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        formatter
            .debug_struct("Controller")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("active", &self.is_active())
            .finish()
    }
}

impl Eq for Controller {}

impl PartialEq for Controller {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.record, &other.record)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn descriptor() -> ControllerDescriptor {
        ControllerDescriptor {
            id: 3,
            name: "pad".to_owned(),
            buttons: 12,
            axes: 4,
        }
    }

    #[test]
    fn channel_counts_follow_descriptor() {
        let controller = Controller::from_descriptor(1, descriptor());
        assert_eq!(controller.button_count(), 12);
        assert_eq!(controller.axis_count(), 4);
        assert_eq!(controller.button(0), ElementState::Released);
        assert_eq!(controller.axis(3), 0.0);
    }

    #[test]
    fn out_of_range_channels_degrade() {
        let controller = Controller::from_descriptor(1, descriptor());
        controller.apply_button(200, ElementState::Pressed);
        assert_eq!(controller.button(200), ElementState::Released);
        assert_eq!(controller.axis(200), 0.0);
    }

    #[test]
    fn state_survives_disconnect() {
        let controller = Controller::from_descriptor(1, descriptor());
        controller.apply_button(2, ElementState::Pressed);
        controller.disconnect();
        assert!(controller.is_lost());
        assert_eq!(controller.button(2), ElementState::Pressed);
    }

    #[test]
    fn oversized_descriptor_is_clamped() {
        let controller = Controller::from_descriptor(
            1,
            ControllerDescriptor {
                id: 4,
                name: "dense".to_owned(),
                buttons: 1000,
                axes: 1000,
            },
        );
        assert_eq!(controller.button_count(), MAX_CONTROLLER_BUTTONS);
        assert_eq!(controller.axis_count(), MAX_CONTROLLER_AXES);
        let _ = Arc::downgrade(controller.record());
    }
}
