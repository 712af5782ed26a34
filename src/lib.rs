// Copyright 2026 the Skylight Authors
// SPDX-License-Identifier: Apache-2.0

//! Platform shell for X11 applications.
//!
//! Skylight owns the boring-but-subtle part of putting a window on screen:
//! creating and mapping native windows, negotiating state with the window
//! manager (fullscreen, maximize, minimize, frame extents), and pumping the
//! event queue for every live window on a connection. Rendering is left to
//! the consumer, which receives a native window id and paint requests.

pub use kurbo;

#[macro_use]
mod util;

pub mod application;
pub mod error;
pub mod keyboard;
pub mod mouse;
pub mod scale;
pub mod window;

pub mod backend;

pub use application::{Application, LoopHandle};
pub use error::Error;
pub use keyboard::KeyEvent;
pub use mouse::{Cursor, MouseButton, MouseButtons, MouseEvent};
pub use scale::Scale;
pub use window::{WinHandler, WindowBuilder, WindowHandle};
