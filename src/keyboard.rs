// Copyright 2026 the Skylight Authors
// SPDX-License-Identifier: Apache-2.0

//! Keyboard event types.
//!
//! Skylight reports raw hardware keycodes together with the modifier state;
//! mapping keycodes to symbols is the consumer's business (or that of a
//! dedicated keymap crate).

pub use keyboard_types::{KeyState, Modifiers};

/// A keyboard event, addressed to the focused window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// Whether the key is going down or up.
    pub state: KeyState,
    /// The platform keycode, as reported by the X server.
    pub keycode: u8,
    /// Modifiers active at the time of the event.
    pub mods: Modifiers,
    /// Whether this event was generated by key repeat.
    pub repeat: bool,
}
