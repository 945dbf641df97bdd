//! Cross-platform windowing and input abstraction.
//!
//! Provides a facade over the _core_ and _platform_ crates in the Maru
//! ecosystem. This crate assembles the connector priority list for the build
//! target and re-exports the core modules. On Linux the intended priority is
//! Wayland before X11; the headless backend sits last as an unconditional
//! fallback and is currently the only implemented backend.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use maru::prelude::*;
//! use maru::window::WindowBuilder;
//!
//! let mut context = maru::connect().unwrap();
//! let window = WindowBuilder::default()
//!     .with_title("Maru")
//!     .build(&mut context)
//!     .unwrap();
//! let mut open = true;
//! while open {
//!     context
//!         .pump(Some(Duration::from_millis(16)), |_, event| match event {
//!             Event::Window {
//!                 event: WindowEvent::CloseRequested,
//!                 ..
//!             } => open = false,
//!             _ => {}
//!         })
//!         .unwrap();
//! }
//! context.destroy_window(window).unwrap();
//! ```

#![allow(unknown_lints)] // Allow clippy lints.

pub use maru_core::attributes;
pub use maru_core::context;
pub use maru_core::controller;
pub use maru_core::cursor;
pub use maru_core::diagnostic;
pub use maru_core::display;
pub use maru_core::error;
pub use maru_core::event;
pub use maru_core::monitor;
pub use maru_core::resource;
pub use maru_core::window;

pub mod platform {
    #[cfg(all(
        not(any(target_os = "linux", target_os = "windows", target_os = "macos")),
        feature = "build-fail-unsupported"
    ))]
    compile_error!("Platform is not supported.");

    pub use maru_core::platform::{
        Backend, BackendKind, Connector, InputChannels, NativeHandle, PlatformEvent, Wake,
    };
    pub use maru_platform_headless::HeadlessConnector;

    /// Assembles the connector priority list for the build target.
    ///
    /// Backends appear in preference order. The headless connector is always
    /// last as an unconditional fallback.
    // TODO: Prepend the Wayland, X11, Win32, and Cocoa connectors for their
    //       targets when those implementations are available.
    pub fn default_connectors() -> Vec<Box<dyn Connector>> {
        vec![Box::new(HeadlessConnector::default()) as Box<dyn Connector>]
    }
}

pub mod prelude {
    pub use maru_core::prelude::*;
}

use crate::context::Context;
use crate::error::Result;

/// Connects a context with the default connector priority list.
pub fn connect() -> Result<Context> {
    Context::builder()
        .with_connectors(platform::default_connectors())
        .build()
}
