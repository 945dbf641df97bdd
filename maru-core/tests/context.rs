use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use maru_platform_headless::{scripted, Script};
use parking_lot::Mutex;

use maru_core::attributes::{TextInput, TextInputKind};
use maru_core::context::Context;
use maru_core::controller::ControllerDescriptor;
use maru_core::cursor::CursorSource;
use maru_core::diagnostic::Diagnostic;
use maru_core::display::{LogicalUnit, PhysicalUnit, Rect, WindowGeometry};
use maru_core::error::Error;
use maru_core::event::{
    ElementState, Event, EventMask, ExchangeEvent, Modifiers, MouseButton, TextEvent,
    UserEvent, WindowEvent,
};
use maru_core::monitor::{MonitorDescriptor, VideoMode};
use maru_core::platform::{BackendKind, PlatformEvent};
use maru_core::window::{Window, WindowBuilder, WindowFlags};

// `Window` ids are crate-private; the headless backend exposes the raw id
// as the native handle value.
fn window_id(context: &Context, window: Window) -> u64 {
    context.native_handle(window).unwrap().value
}

fn connect() -> (Context, Script) {
    let (connector, script) = scripted();
    let context = Context::builder()
        .with_connector(connector)
        .build()
        .unwrap();
    (context, script)
}

fn ready_window(context: &mut Context) -> Window {
    let window = WindowBuilder::default()
        .with_logical_size((800, 600))
        .build(context)
        .unwrap();
    pump_events(context);
    assert!(context.is_window_ready(window));
    window
}

fn pump_events(context: &mut Context) -> Vec<Event> {
    let mut events = Vec::new();
    context
        .pump(Some(Duration::from_millis(10)), |_, event| {
            events.push(event.clone())
        })
        .unwrap();
    events
}

#[test]
fn builder_auto_selects_headless() {
    let (context, _script) = connect();
    assert_eq!(context.backend_kind(), BackendKind::Headless);
    assert!(context.is_ready());
    assert!(!context.is_lost());
}

#[test]
fn window_becomes_ready_after_first_pump() {
    let (mut context, _script) = connect();
    let window = WindowBuilder::default()
        .with_logical_size((800, 600))
        .build(&mut context)
        .unwrap();
    assert!(!context.is_window_ready(window));
    assert_eq!(context.window_geometry(window), WindowGeometry::default());

    // The pre-ready configure mutates state silently; the ready event is
    // the first and only delivery.
    let events = pump_events(&mut context);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        Event::Window {
            event: WindowEvent::Ready,
            ..
        },
    ));
    assert!(context.is_window_ready(window));
    assert_eq!(context.window_geometry(window).pixel_size, (800, 600));
}

#[test]
fn maximize_delivers_resize_before_presentation() {
    let (mut context, _script) = connect();
    let window = ready_window(&mut context);
    context.set_maximized(window, true).unwrap();

    let events = pump_events(&mut context);
    assert_eq!(events.len(), 2);
    assert!(matches!(
        events[0],
        Event::Window {
            event: WindowEvent::Resized(geometry),
            ..
        } if geometry.pixel_size == (1920, 1080),
    ));
    match &events[1] {
        Event::Window {
            event: WindowEvent::PresentationChanged { flags, changed },
            ..
        } => {
            assert!(flags.contains(WindowFlags::MAXIMIZED));
            assert_eq!(*changed, WindowFlags::MAXIMIZED);
        }
        event => panic!("unexpected event: {:?}", event),
    }
    assert!(context
        .window_flags(window)
        .contains(WindowFlags::MAXIMIZED));
}

#[test]
fn fullscreen_round_trip_restores_geometry() {
    let (mut context, _script) = connect();
    let window = ready_window(&mut context);
    let before = context.window_geometry(window);

    context.set_fullscreen(window, true).unwrap();
    pump_events(&mut context);
    assert_eq!(context.window_geometry(window).pixel_size, (1920, 1080));
    assert!(context
        .window_flags(window)
        .contains(WindowFlags::FULLSCREEN));

    context.set_fullscreen(window, false).unwrap();
    pump_events(&mut context);
    assert_eq!(context.window_geometry(window), before);
    assert!(!context
        .window_flags(window)
        .contains(WindowFlags::FULLSCREEN));
}

#[test]
fn masked_events_update_state_but_do_not_deliver() {
    let (mut context, script) = connect();
    let window = ready_window(&mut context);
    context
        .set_window_event_mask(window, EventMask::all() & !EventMask::MOUSE_MOVED)
        .unwrap();
    script.inject(PlatformEvent::MouseMoved {
        window: window_id(&context, window),
        position: (LogicalUnit::from(10.0), LogicalUnit::from(20.0)),
        relative: (PhysicalUnit::from(1.0), PhysicalUnit::from(2.0)),
        modifiers: Modifiers::empty(),
    });
    script.inject(PlatformEvent::MouseButton {
        window: window_id(&context, window),
        button: MouseButton::Left,
        state: ElementState::Pressed,
        modifiers: Modifiers::empty(),
    });

    let events = pump_events(&mut context);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind(), EventMask::MOUSE_BUTTON);
    // Filtering drops delivery, never the state change.
    assert_eq!(
        context.cursor_position(window),
        (LogicalUnit::from(10.0), LogicalUnit::from(20.0)),
    );
    assert_eq!(
        context.mouse_button_state(window, MouseButton::Left),
        ElementState::Pressed,
    );
}

#[test]
fn context_mask_gates_jointly_with_window_mask() {
    let (mut context, script) = connect();
    let window = ready_window(&mut context);
    context
        .set_event_mask(EventMask::all() & !EventMask::KEYBOARD_KEY)
        .unwrap();
    script.inject(PlatformEvent::Key {
        window: window_id(&context, window),
        scancode: 30,
        keycode: None,
        state: ElementState::Pressed,
        modifiers: Modifiers::empty(),
    });
    assert!(pump_events(&mut context).is_empty());
    assert_eq!(context.key_state(window, 30), ElementState::Pressed);
}

#[test]
fn waker_unblocks_a_pending_pump() {
    let (mut context, _script) = connect();
    let waker = context.waker();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        waker.wake();
    });
    let start = Instant::now();
    context
        .pump(Some(Duration::from_secs(30)), |_, _| {})
        .unwrap();
    assert!(start.elapsed() < Duration::from_secs(5));
    handle.join().unwrap();
}

#[test]
fn proxy_posts_user_events_from_other_threads() {
    let (mut context, _script) = connect();
    let proxy = context.proxy();
    thread::spawn(move || {
        proxy.post(UserEvent::new(7u32)).unwrap();
    })
    .join()
    .unwrap();

    let events = pump_events(&mut context);
    assert_eq!(events.len(), 1);
    match &events[0] {
        Event::User(user) => assert_eq!(user.downcast_ref::<u32>(), Some(&7)),
        event => panic!("unexpected event: {:?}", event),
    }
}

#[test]
fn connection_loss_is_sticky_and_still_delivers_lost_windows() {
    let (mut context, script) = connect();
    let window = ready_window(&mut context);
    script.disconnect();

    let mut events = Vec::new();
    let result = context.pump(Some(Duration::from_millis(10)), |_, event| {
        events.push(event.clone())
    });
    assert_eq!(result, Err(Error::ContextLost));
    assert!(events.iter().any(|event| matches!(
        event,
        Event::Window {
            event: WindowEvent::Lost,
            ..
        },
    )));
    assert!(context.is_lost());
    assert!(context.window_flags(window).contains(WindowFlags::LOST));

    // Every mutating call now fails the same way. Destruction stays
    // legal.
    assert_eq!(context.set_title(window, "gone"), Err(Error::ContextLost));
    assert_eq!(
        context.proxy().post(UserEvent::new(())),
        Err(Error::ContextLost),
    );
    assert_eq!(context.destroy_window(window), Ok(()));
}

#[test]
fn failed_creation_leaves_no_partial_state() {
    let (mut context, script) = connect();
    script.fail_next_window_creation();
    assert_eq!(
        WindowBuilder::default().build(&mut context).err(),
        Some(Error::Failure),
    );
    assert_eq!(script.live_objects(), 0);

    // The context remains usable afterwards.
    let window = ready_window(&mut context);
    assert_eq!(script.live_objects(), 1);
    context.destroy_window(window).unwrap();
    assert_eq!(script.live_objects(), 0);
}

#[test]
fn destroy_before_ready_drops_stale_events() {
    let (mut context, script) = connect();
    let window = WindowBuilder::default().build(&mut context).unwrap();
    context.destroy_window(window).unwrap();
    assert!(pump_events(&mut context).is_empty());
    assert_eq!(script.live_objects(), 0);
}

#[test]
fn monitor_handles_survive_unplug() {
    let (mut context, script) = connect();
    let held = context.primary_monitor().unwrap();
    assert!(held.is_active());

    script.unplug_monitor(held.id());
    let events = pump_events(&mut context);
    assert!(events
        .iter()
        .any(|event| event.kind() == EventMask::MONITOR));
    assert!(context.monitors().is_empty());
    assert!(!held.is_active());
    assert!(held.is_lost());
    assert_eq!(held.name(), "Headless Display"); // Frozen.

    // Replugging creates a fresh record; the orphan stays orphaned.
    script.plug_monitor(MonitorDescriptor {
        id: held.id(),
        name: "Headless Display".to_owned(),
        primary: true,
        position: (0, 0),
        scale: 1.0,
        current_mode: VideoMode {
            width: 1920,
            height: 1080,
            refresh_rate: 60,
        },
        modes: Vec::new(),
    });
    pump_events(&mut context);
    let replugged = context.primary_monitor().unwrap();
    assert!(replugged.is_active());
    assert_ne!(replugged, held);
}

#[test]
fn controller_hot_plug_and_cached_state() {
    let (mut context, script) = connect();
    assert!(context.controllers().is_empty());
    script.plug_controller(ControllerDescriptor {
        id: 9,
        name: "pad".to_owned(),
        buttons: 12,
        axes: 4,
    });
    pump_events(&mut context);
    let controller = context.controllers().pop().unwrap();
    assert!(controller.is_active());

    script.inject(PlatformEvent::ControllerButton {
        controller: 9,
        button: 2,
        state: ElementState::Pressed,
    });
    script.inject(PlatformEvent::ControllerAxis {
        controller: 9,
        axis: 1,
        value: 0.5,
    });
    pump_events(&mut context);
    assert_eq!(controller.button(2), ElementState::Pressed);
    assert_eq!(controller.axis(1), 0.5);

    script.unplug_controller(9);
    pump_events(&mut context);
    assert!(context.controllers().is_empty());
    assert!(controller.is_lost());
    assert_eq!(controller.button(2), ElementState::Pressed); // Frozen.
}

#[test]
fn text_events_require_enabled_text_input() {
    let (mut context, script) = connect();
    let window = ready_window(&mut context);
    let committed = PlatformEvent::Text {
        window: window_id(&context, window),
        event: TextEvent::Committed {
            text: "hello".to_owned(),
        },
    };
    script.inject(committed.clone());
    assert!(pump_events(&mut context).is_empty());

    context
        .set_text_input(
            window,
            TextInput {
                kind: TextInputKind::Plain,
                area: Rect::default(),
            },
        )
        .unwrap();
    script.inject(committed);
    let events = pump_events(&mut context);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind(), EventMask::TEXT);
}

#[test]
fn drag_events_require_accept_drop() {
    let (mut context, script) = connect();
    let window = ready_window(&mut context);
    let dropped = PlatformEvent::Exchange {
        window: Some(window_id(&context, window)),
        event: ExchangeEvent::DragDropped {
            position: (LogicalUnit::from(1.0), LogicalUnit::from(1.0)),
            paths: vec!["/tmp/file".to_owned()],
        },
    };
    script.inject(dropped.clone());
    assert!(pump_events(&mut context).is_empty());

    context.set_accept_drop(window, true).unwrap();
    script.inject(dropped);
    let events = pump_events(&mut context);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind(), EventMask::DRAG_DROP);
}

#[test]
fn diagnostics_surface_through_the_handler() {
    let (connector, script) = scripted();
    script.fail_next_connect();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let result = Context::builder()
        .with_connector(connector)
        .with_diagnostic_handler(move |diagnostic, _| sink.lock().push(diagnostic))
        .build();
    assert!(result.is_err());
    let seen = seen.lock();
    assert!(seen.contains(&Diagnostic::BackendFailure));
    assert!(seen.contains(&Diagnostic::BackendUnavailable));
}

#[test]
fn cursor_lifecycle_and_window_fallback() {
    let (mut context, script) = connect();
    let window = ready_window(&mut context);
    let cursor = context
        .create_cursor(CursorSource::System(maru_core::cursor::SystemCursor::Hand))
        .unwrap();
    context.set_cursor(window, Some(cursor)).unwrap();
    assert_eq!(context.window_attributes(window).cursor, Some(cursor));

    context.destroy_cursor(cursor).unwrap();
    assert_eq!(context.window_attributes(window).cursor, None);
    assert_eq!(script.live_objects(), 1); // Only the window remains.
}

#[test]
#[should_panic]
fn update_after_destroy_violates_a_precondition() {
    let (mut context, _script) = connect();
    let window = ready_window(&mut context);
    context.destroy_window(window).unwrap();
    let _ = context.set_title(window, "dangling");
}

#[test]
#[should_panic]
fn illegal_aspect_ratio_is_rejected() {
    let (mut context, _script) = connect();
    let window = ready_window(&mut context);
    let _ = context.set_aspect_ratio(window, (16, 0));
}

#[test]
fn extensions_are_keyed_by_type() {
    struct Clipboard(Vec<u8>);
    let (mut context, _script) = connect();
    context.set_extension(Clipboard(vec![1, 2, 3]));
    assert_eq!(context.extension::<Clipboard>().unwrap().0, vec![1, 2, 3]);
    context.extension_mut::<Clipboard>().unwrap().0.push(4);
    let removed = context.remove_extension::<Clipboard>().unwrap();
    assert_eq!(removed.0, vec![1, 2, 3, 4]);
    assert!(context.extension::<Clipboard>().is_none());
}

#[test]
fn userdata_round_trips_for_context_and_window() {
    let (mut context, _script) = connect();
    let window = ready_window(&mut context);
    context.set_userdata("app");
    context.set_window_userdata(window, 42u64).unwrap();
    assert_eq!(context.userdata::<&str>(), Some(&"app"));
    assert_eq!(context.window_userdata::<u64>(window), Some(&42));
}

#[test]
fn native_handle_identifies_the_backend() {
    let (mut context, _script) = connect();
    let window = ready_window(&mut context);
    let handle = context.native_handle(window).unwrap();
    assert_eq!(handle.backend, BackendKind::Headless);
}
