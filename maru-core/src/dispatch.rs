//! The event dispatch core.
//!
//! Every state change becomes observable here and nowhere else. For each
//! normalized platform event the core first mutates the cached state, then
//! derives zero or more public events, so a callback observing an event
//! always sees already-consistent passive-accessor state. A single platform
//! notification may fan out into several events; a combined
//! geometry-and-presentation change always delivers the resize first.
//!
//! Events for windows that are not yet ready mutate state silently. The
//! ready event itself is the first event a window ever delivers.

use crate::context::Context;
use crate::diagnostic::Diagnostic;
use crate::event::{
    ControllerEvent, Event, ExchangeEvent, InputEvent, MonitorEvent, WindowEvent,
};
use crate::attributes::TextInputKind;
use crate::controller::Controller;
use crate::monitor::Monitor;
use crate::platform::PlatformEvent;
use crate::window::{Window, WindowFlags};

/// Applies one platform event to the context's cached state and derives the
/// public events describing it, in delivery order.
pub(crate) fn apply(context: &mut Context, event: PlatformEvent) -> Vec<Event> {
    match event {
        PlatformEvent::WindowReady { window } => window_ready(context, window),
        PlatformEvent::WindowConfigured {
            window,
            geometry,
            presentation,
        } => window_configured(context, window, geometry, presentation),
        PlatformEvent::WindowCloseRequested { window } => with_window(context, window, |window| {
            vec![Event::Window {
                window,
                event: WindowEvent::CloseRequested,
            }]
        }),
        PlatformEvent::Key {
            window,
            scancode,
            keycode,
            state,
            modifiers,
        } => {
            let Some(target) = context.window_state_mut(window) else {
                return Vec::new();
            };
            target.set_key(scancode, state);
            let window = Window::new(context.id, window);
            vec![Event::Input {
                window: Some(window),
                event: InputEvent::KeyChanged {
                    scancode,
                    keycode,
                    state,
                    modifiers,
                },
            }]
        }
        PlatformEvent::MouseButton {
            window,
            button,
            state,
            modifiers,
        } => {
            let Some(target) = context.window_state_mut(window) else {
                return Vec::new();
            };
            target.set_mouse_button(button.channel(), state);
            let window = Window::new(context.id, window);
            vec![Event::Input {
                window: Some(window),
                event: InputEvent::MouseButtonChanged {
                    button,
                    state,
                    modifiers,
                },
            }]
        }
        PlatformEvent::MouseMoved {
            window,
            position,
            relative,
            modifiers,
        } => {
            let Some(target) = context.window_state_mut(window) else {
                return Vec::new();
            };
            target.cursor_position = position;
            let window = Window::new(context.id, window);
            vec![Event::Input {
                window: Some(window),
                event: InputEvent::MouseMoved {
                    position,
                    relative,
                    modifiers,
                },
            }]
        }
        PlatformEvent::MouseWheel {
            window,
            delta,
            modifiers,
        } => with_window(context, window, |window| {
            vec![Event::Input {
                window: Some(window),
                event: InputEvent::MouseWheelRotated { delta, modifiers },
            }]
        }),
        PlatformEvent::Text { window, event } => {
            // Composition traffic is meaningless to windows that did not
            // enable text input.
            let enabled = context
                .window_state(window)
                .map(|state| state.effective.text_input.kind != TextInputKind::Disabled)
                .unwrap_or(false);
            if !enabled {
                return Vec::new();
            }
            let window = Window::new(context.id, window);
            vec![Event::Text { window, event }]
        }
        PlatformEvent::Exchange { window, event } => exchange(context, window, event),
        PlatformEvent::MonitorConnected(descriptor) => {
            let monitor = match context.find_monitor(descriptor.id) {
                Some(monitor) => {
                    monitor.apply_descriptor(descriptor);
                    monitor
                }
                None => {
                    let monitor = Monitor::from_descriptor(context.id, descriptor);
                    context.monitors.push(monitor.clone());
                    monitor
                }
            };
            monitor.record().note_event();
            vec![Event::Monitor {
                monitor,
                event: MonitorEvent::Connected,
            }]
        }
        PlatformEvent::MonitorDisconnected { monitor } => {
            let Some(index) = context.monitors.iter().position(|cached| cached.id() == monitor)
            else {
                return Vec::new();
            };
            // Orphan first, then drop the cache reference. Holders keep the
            // record alive; without holders it is freed right here.
            let monitor = context.monitors.remove(index);
            monitor.disconnect();
            vec![Event::Monitor {
                monitor,
                event: MonitorEvent::Disconnected,
            }]
        }
        PlatformEvent::MonitorModeChanged { monitor, mode } => {
            let Some(monitor) = context.find_monitor(monitor) else {
                return Vec::new();
            };
            monitor.apply_mode(mode);
            vec![Event::Monitor {
                monitor,
                event: MonitorEvent::ModeChanged(mode),
            }]
        }
        PlatformEvent::ControllerConnected(descriptor) => {
            let controller = match context.find_controller(descriptor.id) {
                Some(controller) => controller,
                None => {
                    let controller = Controller::from_descriptor(context.id, descriptor);
                    context.controllers.push(controller.clone());
                    controller
                }
            };
            controller.record().note_event();
            vec![Event::Controller {
                controller,
                event: ControllerEvent::Connected,
            }]
        }
        PlatformEvent::ControllerDisconnected { controller } => {
            let Some(index) = context
                .controllers
                .iter()
                .position(|cached| cached.id() == controller)
            else {
                return Vec::new();
            };
            let controller = context.controllers.remove(index);
            controller.disconnect();
            vec![Event::Controller {
                controller,
                event: ControllerEvent::Disconnected,
            }]
        }
        PlatformEvent::ControllerButton {
            controller,
            button,
            state,
        } => {
            let Some(controller) = context.find_controller(controller) else {
                return Vec::new();
            };
            controller.apply_button(button, state);
            vec![Event::Controller {
                controller,
                event: ControllerEvent::ButtonChanged { button, state },
            }]
        }
        PlatformEvent::ControllerAxis {
            controller,
            axis,
            value,
        } => {
            let Some(controller) = context.find_controller(controller) else {
                return Vec::new();
            };
            controller.apply_axis(axis, value);
            vec![Event::Controller {
                controller,
                event: ControllerEvent::AxisChanged { axis, value },
            }]
        }
        PlatformEvent::ConnectionLost => connection_lost(context),
    }
}

/// `true` when the event passes the joint context and window masks against
/// current state. Filtering happens immediately before the callback; events
/// are never queued and filtered later.
pub(crate) fn deliverable(context: &Context, event: &Event) -> bool {
    let kind = event.kind();
    if !context.event_mask.contains(kind) {
        return false;
    }
    match event.window() {
        Some(window) => context
            .window_state(window.id)
            .map(|state| state.effective.event_mask.contains(kind))
            .unwrap_or(false),
        None => true,
    }
}

fn with_window<F>(context: &Context, window: u64, f: F) -> Vec<Event>
where
    F: FnOnce(Window) -> Vec<Event>,
{
    if context.window_state(window).is_some() {
        f(Window::new(context.id, window))
    }
    else {
        Vec::new()
    }
}

fn window_ready(context: &mut Context, window: u64) -> Vec<Event> {
    let id = context.id;
    let Some(state) = context.window_state_mut(window) else {
        return Vec::new();
    };
    // The ready transition happens exactly once.
    if state.flags.contains(WindowFlags::READY) {
        return Vec::new();
    }
    state.flags |= WindowFlags::READY;
    tracing::debug!(window, "window ready");
    vec![Event::Window {
        window: Window::new(id, window),
        event: WindowEvent::Ready,
    }]
}

fn window_configured(
    context: &mut Context,
    window: u64,
    geometry: Option<crate::display::WindowGeometry>,
    presentation: Option<WindowFlags>,
) -> Vec<Event> {
    let id = context.id;
    let Some(state) = context.window_state_mut(window) else {
        return Vec::new();
    };
    let ready = state.is_ready();
    let handle = Window::new(id, window);
    let mut events = Vec::new();
    if let Some(geometry) = geometry {
        if geometry != state.geometry {
            state.geometry = geometry;
            state.effective.logical_size = geometry.logical_size;
            state.effective.origin = geometry.origin;
            if ready {
                events.push(Event::Window {
                    window: handle,
                    event: WindowEvent::Resized(geometry),
                });
            }
        }
    }
    if let Some(presentation) = presentation {
        let next = presentation & WindowFlags::PRESENTATION;
        let previous = state.presentation();
        let changed = next ^ previous;
        if !changed.is_empty() {
            state.flags = (state.flags - WindowFlags::PRESENTATION) | next;
            state.effective.visible = next.contains(WindowFlags::VISIBLE);
            state.effective.minimized = next.contains(WindowFlags::MINIMIZED);
            state.effective.maximized = next.contains(WindowFlags::MAXIMIZED);
            state.effective.fullscreen = next.contains(WindowFlags::FULLSCREEN);
            state.effective.focused = next.contains(WindowFlags::FOCUSED);
            if ready {
                events.push(Event::Window {
                    window: handle,
                    event: WindowEvent::PresentationChanged {
                        flags: next,
                        changed,
                    },
                });
            }
        }
    }
    events
}

fn exchange(context: &mut Context, window: Option<u64>, event: ExchangeEvent) -> Vec<Event> {
    let handle = match window {
        Some(window) => {
            let Some(state) = context.window_state(window) else {
                return Vec::new();
            };
            let drag = matches!(
                event,
                ExchangeEvent::DragEntered { .. }
                    | ExchangeEvent::DragMoved { .. }
                    | ExchangeEvent::DragLeft
                    | ExchangeEvent::DragDropped { .. },
            );
            // Drops are only routed to windows that opted in.
            if drag && !state.effective.accept_drop {
                return Vec::new();
            }
            Some(Window::new(context.id, window))
        }
        None => None,
    };
    vec![Event::Exchange {
        window: handle,
        event,
    }]
}

fn connection_lost(context: &mut Context) -> Vec<Event> {
    context.reporter.report(
        Diagnostic::BackendFailure,
        "backend connection lost",
    );
    context.mark_lost();
    let id = context.id;
    context
        .windows
        .iter_mut()
        .map(|(window, state)| {
            state.flags |= WindowFlags::LOST;
            Event::Window {
                window: Window::new(id, *window),
                event: WindowEvent::Lost,
            }
        })
        .collect()
}
