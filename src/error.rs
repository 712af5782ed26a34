// Copyright 2026 the Skylight Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors at the application shell level.

use std::fmt;
use std::sync::Arc;

use crate::backend::x11::error as backend;

/// Shell errors.
///
/// Operations that require the window to be in a particular lifecycle state
/// report [`Error::WindowState`]; this always indicates a mistake in the
/// calling code and is never silently absorbed. Features a window manager
/// may legitimately lack (fullscreen, frame extents, ...) do not error at
/// all: they degrade to logged no-ops.
#[derive(Debug, Clone)]
pub enum Error {
    /// The operation requires a window state the window is not in.
    WindowState {
        /// The operation that was attempted.
        operation: &'static str,
        /// The state the window must be in, e.g. `"mapped"`.
        required: &'static str,
    },
    /// Creating the native window did not produce a usable handle.
    WindowCreation,
    /// Tried to use a window after it was destroyed or dropped.
    WindowDropped,
    /// Platform specific error.
    Platform(backend::Error),
    /// Other miscellaneous error.
    Other(Arc<anyhow::Error>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Error::WindowState {
                operation,
                required,
            } => {
                write!(f, "{operation} requires a {required} window")
            }
            Error::WindowCreation => write!(f, "The native window could not be created."),
            Error::WindowDropped => write!(f, "The window has already been destroyed."),
            Error::Platform(err) => fmt::Display::fmt(err, f),
            Error::Other(s) => write!(f, "{s}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<anyhow::Error> for Error {
    fn from(src: anyhow::Error) -> Error {
        Error::Other(Arc::new(src))
    }
}

impl From<backend::Error> for Error {
    fn from(src: backend::Error) -> Error {
        Error::Platform(src)
    }
}
