// Copyright 2026 the Skylight Authors
// SPDX-License-Identifier: Apache-2.0

//! Common types for representing mouse events and state.

use kurbo::{Point, Vec2};

use crate::keyboard::Modifiers;

/// Information about the mouse event.
#[derive(Debug, Clone, PartialEq)]
pub struct MouseEvent {
    /// The location of the mouse in the current window, in display points.
    ///
    /// When mouse capture is active the location has been translated into
    /// the capturing window's coordinate space, and may lie outside it.
    pub pos: Point,
    /// Mouse buttons being held down during a move or after a click event.
    /// Thus it will contain the `button` that triggered a mouse-down event,
    /// and it will not contain the `button` that triggered a mouse-up event.
    pub buttons: MouseButtons,
    /// Keyboard modifiers at the time of the event.
    pub mods: Modifiers,
    /// The number of mouse clicks associated with this event. This will
    /// always be `0` for a mouse-up and mouse-move events.
    pub count: u8,
    /// The button that was pressed down in the case of mouse-down,
    /// or the button that was released in the case of mouse-up.
    /// This will always be `MouseButton::None` in the case of mouse-move.
    pub button: MouseButton,
    /// The wheel movement.
    ///
    /// The polarity is the amount to be added to the scroll position,
    /// in other words the opposite of the direction the content should
    /// move on scrolling. This polarity is consistent with the
    /// deltaX and deltaY values in a web WheelEvent.
    pub wheel_delta: Vec2,
}

/// An indicator of which mouse button was pressed.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
#[repr(u8)]
pub enum MouseButton {
    /// No mouse button.
    None,
    /// Left mouse button.
    Left,
    /// Middle mouse button.
    Middle,
    /// Right mouse button.
    Right,
    /// First X button.
    X1,
    /// Second X button.
    X2,
}

impl MouseButton {
    /// Returns `true` if this is [`MouseButton::Left`].
    #[inline]
    pub fn is_left(self) -> bool {
        self == MouseButton::Left
    }

    /// Returns `true` if this is [`MouseButton::Right`].
    #[inline]
    pub fn is_right(self) -> bool {
        self == MouseButton::Right
    }
}

/// A set of [`MouseButton`]s.
#[derive(PartialEq, Eq, Clone, Copy, Default)]
pub struct MouseButtons(u8);

impl MouseButtons {
    /// Create a new empty set.
    #[inline]
    pub fn new() -> MouseButtons {
        MouseButtons(0)
    }

    /// Add the `button` to the set.
    #[inline]
    pub fn insert(&mut self, button: MouseButton) {
        self.0 |= 1.min(button as u8) << button as u8;
    }

    /// Remove the `button` from the set.
    #[inline]
    pub fn remove(&mut self, button: MouseButton) {
        self.0 &= !(1.min(button as u8) << button as u8);
    }

    /// Builder-style method for adding the `button` to the set.
    #[inline]
    pub fn with(mut self, button: MouseButton) -> MouseButtons {
        self.insert(button);
        self
    }

    /// Builder-style method for removing the `button` from the set.
    #[inline]
    pub fn without(mut self, button: MouseButton) -> MouseButtons {
        self.remove(button);
        self
    }

    /// Returns `true` if the `button` is in the set.
    #[inline]
    pub fn contains(self, button: MouseButton) -> bool {
        (self.0 & (1.min(button as u8) << button as u8)) != 0
    }

    /// Returns `true` if the set is empty.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the number of buttons in the set.
    #[inline]
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }
}

impl std::fmt::Debug for MouseButtons {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "MouseButtons({:05b})", self.0 >> 1)
    }
}

/// Mouse cursors.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cursor {
    /// The default arrow cursor.
    Arrow,
    /// A vertical I-beam, for indicating insertion points in text.
    IBeam,
    /// A hand, for indicating clickable elements.
    Pointer,
    /// A crosshair.
    Crosshair,
    /// A "not allowed" indicator.
    NotAllowed,
    /// A horizontal resize arrow.
    ResizeLeftRight,
    /// A vertical resize arrow.
    ResizeUpDown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn mouse_buttons_set_semantics() {
        let mut buttons = MouseButtons::new();
        assert!(buttons.is_empty());

        buttons.insert(MouseButton::Left);
        buttons.insert(MouseButton::Right);
        assert!(buttons.contains(MouseButton::Left));
        assert!(buttons.contains(MouseButton::Right));
        assert!(!buttons.contains(MouseButton::Middle));
        assert_eq!(buttons.count(), 2);

        buttons.remove(MouseButton::Left);
        assert!(!buttons.contains(MouseButton::Left));

        // `None` is not a real button and must never enter the set.
        buttons.insert(MouseButton::None);
        assert!(!buttons.contains(MouseButton::None));
    }
}
