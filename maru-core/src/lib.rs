//! Cross-platform windowing and input abstraction.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use maru_core::context::Context;
//! use maru_core::prelude::*;
//! use maru_core::window::WindowBuilder;
//! use maru_platform_headless::HeadlessConnector;
//!
//! # fn main() {
//! let mut context = Context::builder()
//!     .with_connector(Box::new(HeadlessConnector::default()))
//!     .build()
//!     .unwrap();
//! let window = WindowBuilder::default()
//!     .with_title("Maru")
//!     .with_logical_size((800, 600))
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
//!             Event::Window {
//!                 event: WindowEvent::Resized(geometry),
//!                 ..
//!             } => println!("{:?}", geometry.pixel_size),
//!             _ => {}
//!         })
//!         .unwrap();
//! }
//! context.destroy_window(window).unwrap();
//! # }
//! ```

#![allow(unknown_lints)] // Allow clippy lints.

pub mod attributes;
pub mod context;
pub mod controller;
pub mod cursor;
pub mod diagnostic;
mod dispatch;
pub mod display;
pub mod error;
pub mod event;
pub mod monitor;
pub mod platform;
pub mod resource;
pub mod window;

pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::event::*;
}

// Tests that drive the headless backend live in `tests/`; inside this
// crate's unit-test target the backend's `maru_core` types are a separate
// build and do not unify with `crate` paths.
