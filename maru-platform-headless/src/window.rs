//! The in-memory window model.

use maru_core::attributes::{WindowAttributes, WindowField, WindowUpdate};
use maru_core::display::{LogicalUnit, WindowGeometry};
use maru_core::monitor::{MonitorDescriptor, VideoMode};
use maru_core::window::WindowFlags;

type Configure = (Option<WindowGeometry>, Option<WindowFlags>);

/// One modeled window: an attribute snapshot plus derived geometry.
///
/// All geometry is computed at a display scale of `1.0`, so logical and
/// pixel sizes coincide.
pub(crate) struct HeadlessWindow {
    attributes: WindowAttributes,
    fullscreen_target: Option<(VideoMode, (i32, i32))>,
    geometry: WindowGeometry,
}

impl HeadlessWindow {
    pub fn new(attributes: WindowAttributes, monitors: &[MonitorDescriptor]) -> Self {
        let mut window = HeadlessWindow {
            attributes,
            fullscreen_target: None,
            geometry: WindowGeometry::default(),
        };
        window.geometry = window.compute_geometry(monitors);
        window
    }

    pub fn initial_configure(&self) -> Configure {
        (Some(self.geometry), Some(self.presentation()))
    }

    /// Applies an update and derives the configure notification it causes.
    /// A single notification may carry both a geometry and a presentation
    /// change.
    pub fn apply(&mut self, update: &WindowUpdate, monitors: &[MonitorDescriptor]) -> Configure {
        if let Some(monitor) = update.fullscreen_monitor() {
            self.fullscreen_target = Some((monitor.current_mode(), monitor.position()));
        }
        let fields = update.fields();
        update.apply_to(&mut self.attributes);
        if !self.attributes.fullscreen {
            self.fullscreen_target = None;
        }
        let geometry = self.compute_geometry(monitors);
        let resized = geometry != self.geometry;
        self.geometry = geometry;
        (
            if resized {
                Some(geometry)
            }
            else {
                None
            },
            if fields.intersects(WindowField::PRESENTATION) {
                Some(self.presentation())
            }
            else {
                None
            },
        )
    }

    pub fn focus(&mut self) -> Configure {
        self.attributes.focused = true;
        (None, Some(self.presentation()))
    }

    fn presentation(&self) -> WindowFlags {
        let mut flags = WindowFlags::empty();
        let mut set = |condition: bool, flag| {
            if condition {
                flags |= flag;
            }
        };
        set(self.attributes.visible, WindowFlags::VISIBLE);
        set(self.attributes.minimized, WindowFlags::MINIMIZED);
        set(self.attributes.maximized, WindowFlags::MAXIMIZED);
        set(self.attributes.fullscreen, WindowFlags::FULLSCREEN);
        set(self.attributes.focused, WindowFlags::FOCUSED);
        flags
    }

    fn compute_geometry(&self, monitors: &[MonitorDescriptor]) -> WindowGeometry {
        let primary = monitors
            .iter()
            .find(|monitor| monitor.primary)
            .or_else(|| monitors.first());
        if self.attributes.fullscreen {
            let (mode, position) = self
                .fullscreen_target
                .unwrap_or_else(|| match primary {
                    Some(monitor) => (monitor.current_mode, monitor.position),
                    None => (VideoMode::default(), (0, 0)),
                });
            display_filling(mode, position)
        }
        else if self.attributes.maximized {
            let mode = primary.map(|monitor| monitor.current_mode).unwrap_or_default();
            display_filling(mode, (0, 0))
        }
        else {
            let (width, height) = self.attributes.logical_size;
            let width = clamp(
                f64::from(width),
                f64::from(self.attributes.min_size.0),
                f64::from(self.attributes.max_size.0),
            );
            let mut height = clamp(
                f64::from(height),
                f64::from(self.attributes.min_size.1),
                f64::from(self.attributes.max_size.1),
            );
            // A fixed aspect ratio constrains the height.
            let (numerator, denominator) = self.attributes.aspect_ratio;
            if numerator > 0 && denominator > 0 {
                height = width * f64::from(denominator) / f64::from(numerator);
            }
            WindowGeometry {
                origin: self.attributes.origin,
                logical_size: (LogicalUnit::from(width), LogicalUnit::from(height)),
                pixel_size: (width.round() as u32, height.round() as u32),
            }
        }
    }
}

fn display_filling(mode: VideoMode, origin: (i32, i32)) -> WindowGeometry {
    WindowGeometry {
        origin,
        logical_size: (
            LogicalUnit::from(mode.width),
            LogicalUnit::from(mode.height),
        ),
        pixel_size: (mode.width, mode.height),
    }
}

// Zero bounds are the unbounded sentinel.
fn clamp(size: f64, min: f64, max: f64) -> f64 {
    let size = if min > 0.0 { size.max(min) } else { size };
    if max > 0.0 {
        size.min(max)
    }
    else {
        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> MonitorDescriptor {
        MonitorDescriptor {
            id: 0,
            name: "test".to_owned(),
            primary: true,
            position: (0, 0),
            scale: 1.0,
            current_mode: VideoMode {
                width: 1920,
                height: 1080,
                refresh_rate: 60,
            },
            modes: Vec::new(),
        }
    }

    fn attributes(width: u32, height: u32) -> WindowAttributes {
        let mut attributes = WindowAttributes::default();
        attributes.logical_size = (LogicalUnit::from(width), LogicalUnit::from(height));
        attributes
    }

    #[test]
    fn bounds_clamp_requested_size() {
        let mut attributes = attributes(100, 100);
        attributes.min_size = (LogicalUnit::from(200), LogicalUnit::from(0));
        attributes.max_size = (LogicalUnit::from(0), LogicalUnit::from(50));
        let window = HeadlessWindow::new(attributes, &[monitor()]);
        let (geometry, _) = window.initial_configure();
        assert_eq!(geometry.unwrap().pixel_size, (200, 50));
    }

    #[test]
    fn aspect_ratio_constrains_height() {
        let mut attributes = attributes(1600, 1000);
        attributes.aspect_ratio = (16, 9);
        let window = HeadlessWindow::new(attributes, &[monitor()]);
        let (geometry, _) = window.initial_configure();
        assert_eq!(geometry.unwrap().pixel_size, (1600, 900));
    }

    #[test]
    fn fullscreen_fills_the_monitor_and_back() {
        let monitors = [monitor()];
        let mut window = HeadlessWindow::new(attributes(800, 600), &monitors);
        let (geometry, presentation) =
            window.apply(&WindowUpdate::new().with_fullscreen(true), &monitors);
        assert_eq!(geometry.unwrap().pixel_size, (1920, 1080));
        assert!(presentation.unwrap().contains(WindowFlags::FULLSCREEN));
        let (geometry, presentation) =
            window.apply(&WindowUpdate::new().with_fullscreen(false), &monitors);
        assert_eq!(geometry.unwrap().pixel_size, (800, 600));
        assert!(!presentation.unwrap().contains(WindowFlags::FULLSCREEN));
    }

    #[test]
    fn title_change_surfaces_no_configure() {
        let monitors = [monitor()];
        let mut window = HeadlessWindow::new(attributes(800, 600), &monitors);
        let (geometry, presentation) =
            window.apply(&WindowUpdate::new().with_title("quiet"), &monitors);
        assert!(geometry.is_none());
        assert!(presentation.is_none());
    }
}
