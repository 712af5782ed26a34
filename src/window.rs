// Copyright 2026 the Skylight Authors
// SPDX-License-Identifier: Apache-2.0

//! Platform independent window types.

use kurbo::{Insets, Point, Rect, Size};

use crate::application::Application;
use crate::backend::x11 as backend;
use crate::error::Error;
use crate::keyboard::KeyEvent;
use crate::mouse::{Cursor, MouseEvent};
use crate::scale::Scale;

/// App behavior, supplied by the app.
///
/// The window's protocol events map to calls on this trait. All methods
/// are called on the dispatch thread, each at most once per underlying
/// protocol event. Resize reporting is ordered: an internal resize
/// callback registered on the window (used by rendering adapters to
/// refresh their surfaces) runs before [`WinHandler::size`].
#[allow(unused_variables)]
pub trait WinHandler {
    /// Provide the handler with a handle to the window so that it can
    /// invalidate or make other requests.
    ///
    /// This method passes the `WindowHandle` directly, because the handler may
    /// wish to stash it.
    fn connect(&mut self, handle: &WindowHandle);

    /// Called when the [scale](crate::Scale) of the window has changed.
    ///
    /// This is always called before the accompanying [`size`](WinHandler::size).
    fn scale(&mut self, scale: Scale) {}

    /// Called when the size of the window's client area has changed.
    ///
    /// The `size` parameter is the new size in display points.
    fn size(&mut self, size: Size) {}

    /// Called when the window has moved to a new position.
    ///
    /// The `position` parameter is the new client-area origin in display
    /// points, relative to the screen.
    fn moved(&mut self, position: Point) {}

    /// Called when a region of the window was exposed and should be painted.
    fn paint_requested(&mut self, invalid: Rect) {}

    /// Called when the user has requested to close the window.
    ///
    /// The window is not closed automatically; the handler decides, usually
    /// by calling [`WindowHandle::close`].
    fn request_close(&mut self) {}

    /// Called when the window is being destroyed.
    fn destroyed(&mut self) {}

    /// Called when the window gained keyboard focus.
    fn got_focus(&mut self) {}

    /// Called when the window lost keyboard focus.
    fn lost_focus(&mut self) {}

    /// Called when the window manager minimized the window.
    fn minimized(&mut self) {}

    /// Called when the window came back from being minimized.
    fn restored(&mut self) {}

    /// Called on a key down event. Return `true` if the event is handled.
    fn key_down(&mut self, event: KeyEvent) -> bool {
        false
    }

    /// Called when a key is released.
    fn key_up(&mut self, event: KeyEvent) {}

    /// Called on a mouse button down event.
    fn mouse_down(&mut self, event: &MouseEvent) {}

    /// Called on a mouse button up event.
    fn mouse_up(&mut self, event: &MouseEvent) {}

    /// Called on a mouse move.
    fn mouse_move(&mut self, event: &MouseEvent) {}

    /// Called on a mouse wheel event.
    fn wheel(&mut self, event: &MouseEvent) {}

    /// Get a reference to the handler state. Used mostly by tests.
    fn as_any(&mut self) -> &mut dyn std::any::Any;
}

/// A builder type for creating new windows.
pub struct WindowBuilder(backend::window::WindowBuilder);

impl WindowBuilder {
    /// Create a new `WindowBuilder`.
    ///
    /// Takes the [`Application`] that this window is for.
    pub fn new(app: Application) -> WindowBuilder {
        WindowBuilder(backend::window::WindowBuilder::new(app.backend_app))
    }

    /// Set the window's initial title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.0.set_title(title);
    }

    /// Set the window's initial size, in display points.
    pub fn set_size(&mut self, size: Size) {
        self.0.set_size(size);
    }

    /// Set the window's minimum client size, in display points.
    pub fn set_min_size(&mut self, size: Size) {
        self.0.set_min_size(size);
    }

    /// Set whether the window should be resizable.
    ///
    /// A non-resizable window's minimum and maximum size are pinned to its
    /// initial size.
    pub fn resizable(&mut self, resizable: bool) {
        self.0.resizable(resizable);
    }

    /// Set the window's initial position, in display points.
    ///
    /// The position is interpreted as the top-left corner of the window
    /// frame. Because frame extents are only known once the window manager
    /// has mapped the window, the position is re-issued after the first map
    /// to compensate for the decorations.
    pub fn set_position(&mut self, position: Point) {
        self.0.set_position(position);
    }

    /// Override the automatically derived pixel ratio.
    pub fn set_pixel_ratio(&mut self, ratio: f64) {
        self.0.set_pixel_ratio(ratio);
    }

    /// Set the [`WinHandler`] for the window being built.
    pub fn set_handler(&mut self, handler: Box<dyn WinHandler>) {
        self.0.set_handler(handler);
    }

    /// Attempt to construct the platform window.
    ///
    /// The window starts out unmapped; call [`WindowHandle::show`] to map it.
    pub fn build(self) -> Result<WindowHandle, Error> {
        self.0.build().map(WindowHandle)
    }
}

/// A handle to a platform window object.
#[derive(Clone, Default)]
pub struct WindowHandle(backend::window::WindowHandle);

impl WindowHandle {
    /// Map the window, making it visible.
    ///
    /// Mapping is asynchronous: the window manager decides when the window
    /// actually appears, and the final geometry is only known once the
    /// corresponding notifications arrive on the event loop.
    pub fn show(&self) -> Result<(), Error> {
        self.0.show()
    }

    /// Unmap the window, hiding it.
    pub fn hide(&self) -> Result<(), Error> {
        self.0.hide()
    }

    /// Close the window, releasing its native resources.
    pub fn close(&self) {
        self.0.close();
    }

    /// Move the window frame to `position`, in display points.
    ///
    /// Fails with [`Error::WindowState`] if the window is unmapped; the
    /// protocol silently ignores moves of unmapped windows, which would
    /// desynchronize the cached geometry from reality.
    pub fn set_position(&self, position: Point) -> Result<(), Error> {
        self.0.set_position(position)
    }

    /// The client area origin in display points, relative to the screen.
    pub fn get_position(&self) -> Point {
        self.0.get_position()
    }

    /// Resize the client area to `size`, in display points.
    ///
    /// Fails with [`Error::WindowState`] if the window is unmapped.
    pub fn set_size(&self, size: Size) -> Result<(), Error> {
        self.0.set_size(size)
    }

    /// The client area size in display points.
    pub fn get_size(&self) -> Size {
        self.0.get_size()
    }

    /// Change the minimum client size, in display points.
    pub fn set_min_size(&self, size: Size) {
        self.0.set_min_size(size);
    }

    /// Change the maximum client size, in display points.
    pub fn set_max_size(&self, size: Size) {
        self.0.set_max_size(size);
    }

    /// The window decoration thickness, in display points.
    ///
    /// This is best-effort: window managers that do not advertise frame
    /// extents yield zero insets.
    pub fn content_insets(&self) -> Insets {
        self.0.content_insets()
    }

    /// Set the window title.
    pub fn set_title(&self, title: &str) {
        self.0.set_title(title);
    }

    /// The current window title.
    pub fn title(&self) -> String {
        self.0.title()
    }

    /// Ask the window manager to make the window fullscreen (or not).
    ///
    /// Best-effort: the request is submitted and the window manager is free
    /// to ignore it. No request is sent when the reported state already
    /// matches `fullscreen`.
    pub fn set_fullscreen(&self, fullscreen: bool) {
        self.0.set_fullscreen(fullscreen);
    }

    /// Whether the window manager reports the window as fullscreen.
    pub fn is_fullscreen(&self) -> bool {
        self.0.is_fullscreen()
    }

    /// Ask the window manager to maximize the window. Best-effort.
    pub fn maximize(&self) {
        self.0.maximize();
    }

    /// Whether the window manager reports the window as maximized.
    pub fn is_maximized(&self) -> bool {
        self.0.is_maximized()
    }

    /// Ask the window manager to minimize the window. Best-effort.
    pub fn minimize(&self) {
        self.0.minimize();
    }

    /// Whether the window manager reports the window as minimized.
    pub fn is_minimized(&self) -> bool {
        self.0.is_minimized()
    }

    /// Undo fullscreen, maximized and minimized states. Best-effort.
    pub fn restore(&self) {
        self.0.restore();
    }

    /// Bring this window to the front of the window stack and give it focus.
    pub fn bring_to_front_and_focus(&self) {
        self.0.bring_to_front_and_focus();
    }

    /// Whether this window currently holds keyboard focus.
    pub fn has_focus(&self) -> bool {
        self.0.has_focus()
    }

    /// Whether the window is currently mapped.
    pub fn is_mapped(&self) -> bool {
        self.0.is_mapped()
    }

    /// Schedule a repaint of the whole window.
    ///
    /// The paint request is delivered through the event loop like any other,
    /// so [`WinHandler::paint_requested`] runs on the dispatch thread, never
    /// re-entrantly.
    pub fn request_repaint(&self) {
        self.0.request_repaint();
    }

    /// Set the mouse cursor shown over this window.
    pub fn set_cursor(&self, cursor: Cursor) {
        self.0.set_cursor(cursor);
    }

    /// Show or hide the mouse cursor over this window.
    pub fn show_cursor(&self, show: bool) {
        self.0.show_cursor(show);
    }

    /// Redirect all pointer events on this connection into this window.
    ///
    /// While captured, pointer events addressed to other windows are
    /// delivered to this window with their coordinates translated into this
    /// window's client space.
    pub fn capture_mouse(&self, capture: bool) {
        self.0.capture_mouse(capture);
    }

    /// Store text on the window's clipboard slot.
    pub fn set_clipboard_text(&self, text: impl Into<String>) {
        self.0.set_clipboard_text(text.into());
    }

    /// The text currently held by the window's clipboard slot.
    pub fn clipboard_text(&self) -> Option<String> {
        self.0.clipboard_text()
    }

    /// Ask the window manager for the frame extents of this window.
    ///
    /// Blocks the calling thread for a bounded amount of time while waiting
    /// for the reply. Returns `false` when the window manager does not
    /// support the request or did not answer within the budget; callers
    /// should then treat the extents as zero.
    pub fn request_frame_extents(&self) -> bool {
        self.0.request_frame_extents()
    }

    /// Register the internal resize callback.
    ///
    /// This runs with the new pixel dimensions before
    /// [`WinHandler::size`] is called, so rendering adapters can refresh
    /// their surfaces before observers are told about the new size.
    pub fn set_resize_callback(&self, callback: impl FnMut(u32, u32) + 'static) {
        self.0.set_resize_callback(Box::new(callback));
    }

    /// The native X11 window id, for handing to rendering backends.
    ///
    /// Zero when the window has been dropped.
    pub fn native_id(&self) -> u32 {
        self.0.native_id()
    }

    /// The window's scale factor.
    pub fn get_scale(&self) -> Result<Scale, Error> {
        self.0.get_scale()
    }

    /// The pixel density of the screen the window was created on.
    pub fn ppi(&self) -> f64 {
        self.0.ppi()
    }

    /// Whether an expose arrived since the last repaint request.
    pub fn is_exposed(&self) -> bool {
        self.0.is_exposed()
    }

    /// Translate a client-area point into screen coordinates, in display
    /// points.
    pub fn client_to_screen(&self, client: Point) -> Point {
        self.0.client_to_screen(client)
    }

    /// Translate a screen point into client-area coordinates, in display
    /// points.
    pub fn screen_to_client(&self, screen: Point) -> Point {
        self.0.screen_to_client(screen)
    }
}

impl From<backend::window::WindowHandle> for WindowHandle {
    fn from(src: backend::window::WindowHandle) -> WindowHandle {
        WindowHandle(src)
    }
}
