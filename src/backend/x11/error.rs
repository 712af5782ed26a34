// Copyright 2026 the Skylight Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors at the X11 backend level.

use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum Error {
    /// Connecting to the display server failed.
    Connect(Arc<x11rb::errors::ConnectError>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        let Error::Connect(e) = self;
        e.fmt(f)
    }
}

impl std::error::Error for Error {}

impl From<x11rb::errors::ConnectError> for Error {
    fn from(err: x11rb::errors::ConnectError) -> Error {
        Error::Connect(Arc::new(err))
    }
}
