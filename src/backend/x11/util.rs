// Copyright 2026 the Skylight Authors
// SPDX-License-Identifier: Apache-2.0

//! Miscellaneous utility functions for working with X11.

macro_rules! log_x11 {
    ($val:expr) => {
        if let Err(e) = $val {
            // No file/line numbers here: this logging is done in a context
            // where an X11 error almost always means the connection to the
            // server was lost.
            tracing::error!("X11 error: {}", e);
        }
    };
}
