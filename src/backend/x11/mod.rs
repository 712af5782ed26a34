// Copyright 2026 the Skylight Authors
// SPDX-License-Identifier: Apache-2.0

//! X11 implementation of the windowing shell.

// # Notes on error handling
//
// Errors on an X11 request mean the connection is broken; there is no point
// adding context to those, because the failure has nothing to do with what
// we were trying to do. Errors on a reply mean something was wrong with the
// request, and those get context. Requests whose failure the caller cannot
// meaningfully act on (cursor changes, state-change hints to the window
// manager) go through `log_x11!` instead of returning an error.
//
// # Notes on window manager interop
//
// Everything the window manager does for us is asynchronous and optional.
// State changes (fullscreen, maximize, ...) are submitted as client messages
// and only take effect if and when the WM cooperates; the authoritative
// window state is whatever later events report. Feature probes go through
// the `_NET_SUPPORTED` set cached in `atoms`.

#[macro_use]
pub(crate) mod util;

pub(crate) mod application;
pub(crate) mod atoms;
pub mod error;
#[cfg(test)]
pub(crate) mod fake;
pub(crate) mod transport;
pub(crate) mod window;
