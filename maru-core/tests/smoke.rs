use std::time::Duration;

use maru_core::context::Context;
use maru_core::window::WindowBuilder;

// For sanity.
#[test]
fn test() {
    let (connector, _script) = maru_platform_headless::scripted();
    let mut context = Context::builder()
        .with_connector(connector)
        .build()
        .unwrap();
    let window = WindowBuilder::default().build(&mut context).unwrap();
    context
        .pump(Some(Duration::from_millis(1)), |_, _| {})
        .unwrap();
    context.destroy_window(window).unwrap();
}
