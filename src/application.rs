// Copyright 2026 the Skylight Authors
// SPDX-License-Identifier: Apache-2.0

//! The top-level application type.

use std::time::Duration;

use kurbo::Size;

use crate::backend::x11 as backend;
use crate::error::Error;

pub use crate::backend::x11::application::LoopHandle;

/// The top level application object.
///
/// This holds the connection to the display server and the event loop
/// serving every window created on it. One `Application` serves one
/// connection; it is not sendable across threads, but [`LoopHandle`] is.
#[derive(Clone)]
pub struct Application {
    pub(crate) backend_app: backend::application::Application,
}

impl Application {
    /// Connect to the display server and create the `Application`.
    ///
    /// Fails if the display server is unreachable.
    pub fn new() -> Result<Application, Error> {
        let backend_app = backend::application::Application::new()?;
        Ok(Application { backend_app })
    }

    /// Run the event loop until [`LoopHandle::exit`] (or
    /// [`Application::exit`]) is called.
    pub fn run(self) {
        self.backend_app.run();
    }

    /// Pump the event loop once, waiting at most `timeout` for activity.
    ///
    /// A `timeout` of `None` waits indefinitely. Returns `Ok(false)` when an
    /// exit was requested, `Ok(true)` when the timeout elapsed. Events queued
    /// on the connection are drained each time it becomes readable.
    pub fn process(&self, timeout: Option<Duration>) -> Result<bool, Error> {
        self.backend_app.process(timeout)
    }

    /// Request the event loop to exit.
    ///
    /// Safe to call from any thread via [`LoopHandle`]; this method is the
    /// same-thread convenience.
    pub fn exit(&self) {
        self.backend_app.exit();
    }

    /// A cloneable, sendable handle for waking the event loop from other
    /// threads: scheduling work onto the dispatch thread or requesting exit.
    pub fn handle(&self) -> LoopHandle {
        self.backend_app.loop_handle()
    }

    /// The size of the default screen, in pixels.
    pub fn screen_size(&self) -> Size {
        let screen = self.backend_app.screen();
        Size::new(screen.width_px as f64, screen.height_px as f64)
    }

    /// The physical size of the default screen, in millimetres, as
    /// advertised by the server. May be nonsense on virtual displays.
    pub fn screen_size_mm(&self) -> Size {
        let screen = self.backend_app.screen();
        Size::new(screen.width_mm as f64, screen.height_mm as f64)
    }
}
