// Copyright 2026 the Skylight Authors
// SPDX-License-Identifier: Apache-2.0

//! X11 window creation and window management.
//!
//! A [`Window`] owns one native window and everything hanging off it:
//! cached geometry, window manager state, cursors, the clipboard text slot
//! and the consumer's [`WinHandler`]. Mutating calls submit a protocol
//! request and return; the authoritative state is whatever the event stream
//! later reports, reconciled in [`Window::process_event`].

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::panic::Location;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use kurbo::{Insets, Point, Rect, Size, Vec2};
use tracing::{debug, error, warn};
use x11rb::protocol::xproto::{
    self, ChangeWindowAttributesAux, ConfigureWindowAux, CreateWindowAux, EventMask, Gravity,
    KeyButMask, StackMode,
};
use x11rb::protocol::Event;

use crate::error::Error as ShellError;
use crate::keyboard::{KeyEvent, KeyState, Modifiers};
use crate::mouse::{Cursor, MouseButton, MouseButtons, MouseEvent};
use crate::scale::{pixel_ratio_from_ppi, ppi_from_screen, Scalable, Scale};
use crate::window::WinHandler;

use super::application::Application;
use super::atoms::{AtomTable, StateAction};
use super::transport::{Atom, ScreenInfo, Transport, XWindow};

/// Windows never get created or resized below this, to keep degenerate
/// sizes away from the server.
const RESIZE_MINIMUM_SIZE: u32 = 8;

/// Background painted by the server before the first expose.
const BACKGROUND_PIXEL: u32 = 0xFF0E_0E0E;

/// How long `request_frame_extents` waits for the WM to answer.
const FRAME_EXTENTS_WAIT: Duration = Duration::from_millis(100);

/// ICCCM WM_CHANGE_STATE argument for iconification.
const ICCCM_ICONIC_STATE: u32 = 3;

// WM_NORMAL_HINTS flag bits (ICCCM §4.1.2.3).
const P_MIN_SIZE: u32 = 1 << 4;
const P_MAX_SIZE: u32 = 1 << 5;
const P_RESIZE_INC: u32 = 1 << 6;
const P_BASE_SIZE: u32 = 1 << 8;
const P_WIN_GRAVITY: u32 = 1 << 9;
const NORTH_WEST_GRAVITY: u32 = 1;

/// Decoration thickness added by the window manager, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FrameExtents {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

/// The window's cached geometry, in pixels.
///
/// `last_position`/`last_size` mirror the most recent request or
/// notification; `client_position`/`client_size` are the client area as
/// last reported by the server. Frame extents are advisory and zero until
/// the window manager reports otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Geometry {
    pub last_position: (i32, i32),
    pub last_size: (u32, u32),
    pub min_size: (u32, u32),
    pub max_size: Option<(u32, u32)>,
    pub frame_extents: FrameExtents,
    pub client_position: (i32, i32),
    pub client_size: (u32, u32),
}

/// The most recently observed geometry-change notification, used to tell
/// moves from resizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ConfigureSnapshot {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

pub(crate) struct WindowBuilder {
    app: Application,
    handler: Option<Box<dyn WinHandler>>,
    title: String,
    size: Size,
    min_size: Size,
    resizable: bool,
    position: Option<Point>,
    pixel_ratio: Option<f64>,
}

impl WindowBuilder {
    pub fn new(app: Application) -> WindowBuilder {
        WindowBuilder {
            app,
            handler: None,
            title: String::new(),
            size: Size::new(500.0, 400.0),
            min_size: Size::new(0.0, 0.0),
            resizable: true,
            position: None,
            pixel_ratio: None,
        }
    }

    pub fn set_handler(&mut self, handler: Box<dyn WinHandler>) {
        self.handler = Some(handler);
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    pub fn set_min_size(&mut self, size: Size) {
        self.min_size = size;
    }

    pub fn resizable(&mut self, resizable: bool) {
        self.resizable = resizable;
    }

    pub fn set_position(&mut self, position: Point) {
        self.position = Some(position);
    }

    pub fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = Some(ratio);
    }

    pub fn build(self) -> Result<WindowHandle, ShellError> {
        let transport = self.app.transport();
        let screen = self.app.screen();

        let ppi = ppi_from_screen(screen.width_px, screen.width_mm);
        let ratio = self.pixel_ratio.unwrap_or_else(|| pixel_ratio_from_ppi(ppi));
        let scale = Scale::new(ratio, ratio);

        let id = transport.generate_id()?;
        if id == x11rb::NONE {
            return Err(ShellError::WindowCreation);
        }

        let atoms = AtomTable::populate(Rc::clone(&transport), screen.root)?;

        // Size the native window in pixels, clamped away from degenerate
        // dimensions.
        let size_px = self.size.to_px(scale);
        let width = (size_px.width.round() as u32).max(RESIZE_MINIMUM_SIZE);
        let height = (size_px.height.round() as u32).max(RESIZE_MINIMUM_SIZE);

        let pos_px = self
            .position
            .map(|p| {
                let p = p.to_px(scale);
                (p.x.round() as i32, p.y.round() as i32)
            })
            .unwrap_or((0, 0));

        let colormap = transport.generate_id()?;
        transport.create_colormap(colormap, screen.root, screen.root_visual)?;

        let cw_values = CreateWindowAux::new()
            .background_pixel(BACKGROUND_PIXEL)
            // Retain the top-left corner on resizes.
            .bit_gravity(Gravity::NORTH_WEST)
            .win_gravity(Gravity::NORTH_WEST)
            .event_mask(
                EventMask::EXPOSURE
                    | EventMask::STRUCTURE_NOTIFY
                    | EventMask::FOCUS_CHANGE
                    | EventMask::PROPERTY_CHANGE
                    | EventMask::KEY_PRESS
                    | EventMask::KEY_RELEASE
                    | EventMask::BUTTON_PRESS
                    | EventMask::BUTTON_RELEASE
                    | EventMask::POINTER_MOTION,
            )
            .colormap(colormap);

        transport.create_window(
            screen.root_depth,
            id,
            screen.root,
            pos_px.0 as i16,
            pos_px.1 as i16,
            width as u16,
            height as u16,
            screen.root_visual,
            &cw_values,
        )?;

        // Min/max sizes clamp to the current size when resizing is off.
        let min_size_px = self.min_size.to_px(scale);
        let min_size = if self.resizable {
            (
                (min_size_px.width.round() as u32).max(RESIZE_MINIMUM_SIZE),
                (min_size_px.height.round() as u32).max(RESIZE_MINIMUM_SIZE),
            )
        } else {
            (width, height)
        };
        let max_size = if self.resizable {
            None
        } else {
            Some((width, height))
        };
        set_normal_hints(&*transport, id, min_size, max_size, (width, height))?;

        // Window manager interop metadata: who we are and which protocols
        // we speak.
        if atoms.exists("_NET_WM_PID") {
            let pid = std::process::id();
            transport.change_property32(
                id,
                atoms.lookup("_NET_WM_PID")?,
                u32::from(xproto::AtomEnum::CARDINAL),
                &[pid],
            )?;
        }

        let mut hostname_buf = [0u8; 256];
        if let Ok(hostname) = nix::unistd::gethostname(&mut hostname_buf) {
            if atoms.exists("WM_CLIENT_MACHINE") {
                transport.change_property8(
                    id,
                    atoms.lookup("WM_CLIENT_MACHINE")?,
                    u32::from(xproto::AtomEnum::STRING),
                    hostname.to_bytes(),
                )?;
            }
        }

        if let Some(name) = std::env::args_os().next() {
            // ICCCM § 4.1.2.5: two consecutive null-terminated strings, the
            // instance and the class name.
            let path: &std::path::Path = name.as_ref();
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("");
            let mut wm_class = Vec::with_capacity(2 * (name.len() + 1));
            wm_class.extend(name.as_bytes());
            wm_class.push(0);
            if let Some(&first) = wm_class.first() {
                wm_class.push(first.to_ascii_uppercase());
                wm_class.extend(&name.as_bytes()[1..]);
            }
            wm_class.push(0);
            transport.change_property8(
                id,
                u32::from(xproto::AtomEnum::WM_CLASS),
                u32::from(xproto::AtomEnum::STRING),
                &wm_class,
            )?;
        }

        let protocols: Vec<Atom> = ["WM_DELETE_WINDOW", "_NET_WM_PING"]
            .iter()
            .filter_map(|name| atoms.lookup(name).ok())
            .filter(|&atom| atom != x11rb::NONE)
            .collect();
        if atoms.exists("WM_PROTOCOLS") && !protocols.is_empty() {
            transport.change_property32(
                id,
                atoms.lookup("WM_PROTOCOLS")?,
                u32::from(xproto::AtomEnum::ATOM),
                &protocols,
            )?;
        }

        if atoms.exists("_NET_WM_WINDOW_TYPE") && atoms.exists("_NET_WM_WINDOW_TYPE_NORMAL") {
            transport.change_property32(
                id,
                atoms.lookup("_NET_WM_WINDOW_TYPE")?,
                u32::from(xproto::AtomEnum::ATOM),
                &[atoms.lookup("_NET_WM_WINDOW_TYPE_NORMAL")?],
            )?;
        }

        let handler = self
            .handler
            .ok_or_else(|| anyhow::anyhow!("a window requires a WinHandler"))?;

        let window = Rc::new(Window {
            id,
            app: self.app.clone(),
            transport,
            screen,
            handler: RefCell::new(handler),
            atoms: RefCell::new(atoms),
            colormap,
            system_cursor: Cell::new(None),
            invisible_cursor: Cell::new(None),
            scale: Cell::new(scale),
            ppi,
            resizable: self.resizable,
            geometry: RefCell::new(Geometry {
                last_position: pos_px,
                last_size: (width, height),
                min_size,
                max_size,
                frame_extents: FrameExtents::default(),
                client_position: pos_px,
                client_size: (width, height),
            }),
            last_configure: Cell::new(None),
            mapped: Cell::new(false),
            exposed: Cell::new(false),
            focused: Cell::new(false),
            external_minimize: Cell::new(false),
            // Until the WM maps the window we cannot know the decoration
            // thickness, so a requested position is corrected after the
            // first MapNotify.
            compensate_frame_extents: Cell::new(self.position.is_some()),
            requested_fullscreen: Cell::new(None),
            unmap_requested: Cell::new(false),
            destroyed: Cell::new(false),
            title: RefCell::new(String::new()),
            clipboard_text: RefCell::new(None),
            resize_callback: RefCell::new(None),
            pending_events: self.app.pending_events(),
        });

        window.set_title(&self.title);

        let handle = WindowHandle::new(id, Rc::downgrade(&window));
        window.connect(handle.clone());

        self.app.add_window(Rc::clone(&window));

        Ok(handle)
    }
}

/// An X11 window.
//
// Lots of RefCells; the rule that keeps them panic-free is that we never
// call into the `WinHandler` while holding any other borrow. That is
// enforced by the `with_handler` method.
pub(crate) struct Window {
    id: XWindow,
    app: Application,
    transport: Rc<dyn Transport>,
    screen: ScreenInfo,
    handler: RefCell<Box<dyn WinHandler>>,
    atoms: RefCell<AtomTable>,
    colormap: u32,
    /// The currently applied standard cursor, if any.
    system_cursor: Cell<Option<u32>>,
    /// The transparent cursor used while the pointer is hidden.
    invisible_cursor: Cell<Option<u32>>,
    scale: Cell<Scale>,
    ppi: f64,
    resizable: bool,
    geometry: RefCell<Geometry>,
    last_configure: Cell<Option<ConfigureSnapshot>>,
    /// Mapped state as reconciled from Map/UnmapNotify.
    mapped: Cell<bool>,
    /// Set when an Expose arrives, reset when a repaint is requested.
    exposed: Cell<bool>,
    focused: Cell<bool>,
    /// Set when the WM unmapped us without being asked (the user minimized
    /// the window), cleared on the paired remap.
    external_minimize: Cell<bool>,
    /// When set, the first MapNotify resolves real frame extents and
    /// re-issues the requested position to correct for them.
    compensate_frame_extents: Cell<bool>,
    /// A submitted-but-unconfirmed fullscreen request, so repeated calls
    /// don't spam the window manager.
    requested_fullscreen: Cell<Option<bool>>,
    /// Distinguishes our own unmap requests from WM-driven unmaps.
    unmap_requested: Cell<bool>,
    destroyed: Cell<bool>,
    title: RefCell<String>,
    clipboard_text: RefCell<Option<String>>,
    /// Runs with the new pixel size before the handler's size signal, so
    /// rendering surfaces refresh before observers are told.
    resize_callback: RefCell<Option<Box<dyn FnMut(u32, u32)>>>,
    /// The dispatcher's queue of not-yet-processed events; used to requeue
    /// events consumed while waiting for frame extents, and to schedule
    /// synthetic repaints.
    pending_events: Rc<RefCell<VecDeque<Event>>>,
}

impl Window {
    #[track_caller]
    fn with_handler<T, F: FnOnce(&mut dyn WinHandler) -> T>(&self, f: F) -> Option<T> {
        if self.geometry.try_borrow_mut().is_err() || self.atoms.try_borrow_mut().is_err() {
            error!("other RefCells were borrowed when calling into the handler");
            return None;
        }
        match self.handler.try_borrow_mut() {
            Ok(mut h) => Some(f(&mut **h)),
            Err(_) => {
                error!("failed to borrow WinHandler at {}", Location::caller());
                None
            }
        }
    }

    fn connect(&self, handle: WindowHandle) {
        let size = self.get_size();
        let scale = self.scale.get();
        self.with_handler(|h| {
            h.connect(&handle.into());
            h.scale(scale);
            h.size(size);
        });
    }

    pub(crate) fn id(&self) -> XWindow {
        self.id
    }

    fn destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// Release every native resource and deregister from the dispatcher.
    ///
    /// Idempotent; also runs on drop.
    pub fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        if let Some(cursor) = self.system_cursor.take() {
            log_x11!(self.transport.free_cursor(cursor));
        }
        if let Some(cursor) = self.invisible_cursor.take() {
            log_x11!(self.transport.free_cursor(cursor));
        }
        log_x11!(self.transport.free_colormap(self.colormap));
        log_x11!(self.transport.destroy_window(self.id));
        if let Ok(mut atoms) = self.atoms.try_borrow_mut() {
            atoms.clear();
        }
        self.app.remove_window(self.id);
    }

    // ---- lifecycle ----

    /// Ask the server to map the window.
    ///
    /// The window only becomes usable once MapNotify arrives; callers that
    /// depend on final geometry must wait for the corresponding events.
    pub fn map_window(&self) -> Result<(), ShellError> {
        if self.destroyed() {
            return Err(ShellError::WindowDropped);
        }
        if self.mapped.get() {
            return Err(ShellError::WindowState {
                operation: "map_window",
                required: "unmapped",
            });
        }
        self.transport.map_window(self.id)?;
        log_x11!(self.transport.flush());
        Ok(())
    }

    /// Ask the server to unmap the window.
    pub fn unmap_window(&self) -> Result<(), ShellError> {
        if self.destroyed() {
            return Err(ShellError::WindowDropped);
        }
        if !self.mapped.get() {
            return Err(ShellError::WindowState {
                operation: "unmap_window",
                required: "mapped",
            });
        }
        self.unmap_requested.set(true);
        self.transport.unmap_window(self.id)?;
        log_x11!(self.transport.flush());
        Ok(())
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped.get()
    }

    // ---- geometry ----

    /// Move the window.
    ///
    /// The move request is refused while unmapped: the protocol silently
    /// no-ops on unmapped windows, which would leave the cached geometry
    /// lying about reality. The new position is cached optimistically and
    /// reconciled when the configure notification arrives.
    pub fn set_position(&self, position: Point) -> Result<(), ShellError> {
        if self.destroyed() {
            return Err(ShellError::WindowDropped);
        }
        if !self.mapped.get() {
            return Err(ShellError::WindowState {
                operation: "set_position",
                required: "mapped",
            });
        }
        let px = position.to_px(self.scale.get());
        let (x, y) = (px.x.round() as i32, px.y.round() as i32);
        self.transport
            .configure_window(self.id, &ConfigureWindowAux::new().x(x).y(y))?;
        let mut geometry = self.geometry.borrow_mut();
        geometry.last_position = (x, y);
        geometry.client_position = (x, y);
        Ok(())
    }

    /// Resize the client area. Same contract as [`Window::set_position`].
    pub fn set_size(&self, size: Size) -> Result<(), ShellError> {
        if self.destroyed() {
            return Err(ShellError::WindowDropped);
        }
        if !self.mapped.get() {
            return Err(ShellError::WindowState {
                operation: "set_size",
                required: "mapped",
            });
        }
        let px = size.to_px(self.scale.get());
        let width = (px.width.round() as u32).max(RESIZE_MINIMUM_SIZE);
        let height = (px.height.round() as u32).max(RESIZE_MINIMUM_SIZE);
        self.transport.configure_window(
            self.id,
            &ConfigureWindowAux::new().width(width).height(height),
        )?;
        let mut geometry = self.geometry.borrow_mut();
        geometry.last_size = (width, height);
        geometry.client_size = (width, height);
        Ok(())
    }

    /// The client area origin, in display points relative to the screen.
    pub fn get_position(&self) -> Point {
        let (x, y) = self.geometry.borrow().client_position;
        Point::new(x as f64, y as f64).to_dp(self.scale.get())
    }

    /// The client area size, in display points.
    pub fn get_size(&self) -> Size {
        let (width, height) = self.geometry.borrow().client_size;
        Size::new(width as f64, height as f64).to_dp(self.scale.get())
    }

    pub fn set_min_size(&self, size: Size) {
        if !self.resizable {
            warn!("ignoring minimum size change on a non-resizable window");
            return;
        }
        let px = size.to_px(self.scale.get());
        let min = (
            (px.width.round() as u32).max(RESIZE_MINIMUM_SIZE),
            (px.height.round() as u32).max(RESIZE_MINIMUM_SIZE),
        );
        let (max, base) = {
            let mut geometry = self.geometry.borrow_mut();
            geometry.min_size = min;
            (geometry.max_size, geometry.last_size)
        };
        log_x11!(set_normal_hints(&*self.transport, self.id, min, max, base));
    }

    pub fn set_max_size(&self, size: Size) {
        if !self.resizable {
            warn!("ignoring maximum size change on a non-resizable window");
            return;
        }
        let px = size.to_px(self.scale.get());
        let max = Some((px.width.round() as u32, px.height.round() as u32));
        let (min, base) = {
            let mut geometry = self.geometry.borrow_mut();
            geometry.max_size = max;
            (geometry.min_size, geometry.last_size)
        };
        log_x11!(set_normal_hints(&*self.transport, self.id, min, max, base));
    }

    /// The WM decoration thickness, in display points. Zero until known.
    pub fn content_insets(&self) -> Insets {
        let extents = self.geometry.borrow().frame_extents;
        Insets::new(
            extents.left as f64,
            extents.top as f64,
            extents.right as f64,
            extents.bottom as f64,
        )
        .to_dp(self.scale.get())
    }

    pub fn client_to_screen(&self, client: Point) -> Point {
        let (x, y) = self.geometry.borrow().client_position;
        let origin = Point::new(x as f64, y as f64).to_dp(self.scale.get());
        client + origin.to_vec2()
    }

    pub fn screen_to_client(&self, screen: Point) -> Point {
        let (x, y) = self.geometry.borrow().client_position;
        let origin = Point::new(x as f64, y as f64).to_dp(self.scale.get());
        screen - origin.to_vec2()
    }

    pub fn get_scale(&self) -> Scale {
        self.scale.get()
    }

    pub fn ppi(&self) -> f64 {
        self.ppi
    }

    // ---- window manager state ----

    pub fn is_fullscreen(&self) -> bool {
        self.net_wm_state(&["_NET_WM_STATE_FULLSCREEN"])
            .map_or(false, |s| s[0])
    }

    pub fn is_maximized(&self) -> bool {
        self.net_wm_state(&[
            "_NET_WM_STATE_MAXIMIZED_HORZ",
            "_NET_WM_STATE_MAXIMIZED_VERT",
        ])
        .map_or(false, |s| s.iter().all(|&b| b))
    }

    pub fn is_minimized(&self) -> bool {
        self.net_wm_state(&["_NET_WM_STATE_HIDDEN"])
            .map_or(false, |s| s[0])
    }

    fn net_wm_state(&self, names: &[&str]) -> Option<Vec<bool>> {
        self.atoms.borrow().check_net_wm_state(self.id, names)
    }

    /// Ask the WM for fullscreen on or off.
    ///
    /// No-ops when the reported state already matches, or when an identical
    /// request is still in flight; degrades to a logged no-op when the WM
    /// does not support fullscreen at all.
    pub fn set_fullscreen(&self, fullscreen: bool) {
        if self.destroyed() {
            return;
        }
        if !self.atoms.borrow().is_supported("_NET_WM_STATE_FULLSCREEN") {
            warn!("window manager does not support fullscreen windows");
            return;
        }
        if self.requested_fullscreen.get() == Some(fullscreen) {
            debug!("fullscreen request already in flight");
            return;
        }
        if self.is_fullscreen() == fullscreen {
            debug!("window already {} fullscreen", if fullscreen { "in" } else { "out of" });
            return;
        }
        let action = if fullscreen {
            StateAction::Add
        } else {
            StateAction::Remove
        };
        let sent = self.atoms.borrow().modify_net_wm_state(
            self.id,
            action,
            "_NET_WM_STATE_FULLSCREEN",
            None,
        );
        if sent {
            self.requested_fullscreen.set(Some(fullscreen));
        }
    }

    /// Ask the WM to maximize the window. Best-effort.
    pub fn maximize(&self) {
        if self.destroyed() || self.is_maximized() {
            return;
        }
        self.atoms.borrow().modify_net_wm_state(
            self.id,
            StateAction::Add,
            "_NET_WM_STATE_MAXIMIZED_HORZ",
            Some("_NET_WM_STATE_MAXIMIZED_VERT"),
        );
    }

    /// Ask the WM to iconify the window. Best-effort.
    pub fn minimize(&self) {
        if self.destroyed() || self.is_minimized() {
            return;
        }
        let atoms = self.atoms.borrow();
        match atoms.lookup("WM_CHANGE_STATE") {
            Ok(atom) if atom != x11rb::NONE => {
                log_x11!(self.transport.send_to_wm(
                    self.id,
                    atom,
                    [ICCCM_ICONIC_STATE, 0, 0, 0, 0]
                ));
            }
            _ => debug!("WM_CHANGE_STATE not available, cannot minimize"),
        }
    }

    /// Undo fullscreen, maximized and minimized states. Best-effort.
    pub fn restore(&self) {
        if self.destroyed() {
            return;
        }
        if self.is_minimized() {
            log_x11!(self.transport.map_window(self.id));
        }
        if self.is_fullscreen() {
            self.atoms.borrow().modify_net_wm_state(
                self.id,
                StateAction::Remove,
                "_NET_WM_STATE_FULLSCREEN",
                None,
            );
        }
        if self.is_maximized() {
            self.atoms.borrow().modify_net_wm_state(
                self.id,
                StateAction::Remove,
                "_NET_WM_STATE_MAXIMIZED_HORZ",
                Some("_NET_WM_STATE_MAXIMIZED_VERT"),
            );
        }
    }

    /// Bring this window to the front of the window stack and focus it.
    pub fn bring_to_front_and_focus(&self) {
        if self.destroyed() {
            return;
        }
        log_x11!(self.transport.configure_window(
            self.id,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE)
        ));
        log_x11!(self.transport.set_input_focus(self.id));
    }

    /// Whether this window holds the input focus right now.
    ///
    /// Queries the server rather than trusting cached focus events, which
    /// can be stale.
    pub fn has_focus(&self) -> bool {
        match self.transport.input_focus() {
            Ok(focus) => focus == self.id,
            Err(err) => {
                debug!("input focus query failed: {}", err);
                false
            }
        }
    }

    // ---- frame extents ----

    /// Ask the WM to compute this window's frame extents, waiting briefly
    /// for the answer.
    ///
    /// Built on an asynchronous protocol: sends `_NET_REQUEST_FRAME_EXTENTS`
    /// and polls the event stream, with a deadline, for the matching
    /// property notification. Events that are not the answer are requeued
    /// for the dispatcher. Returns `false`, not an error, when the WM never
    /// answers; many window managers do not implement this.
    pub fn request_frame_extents(&self) -> bool {
        let (request_atom, frame_atom) = {
            let atoms = self.atoms.borrow();
            if !atoms.is_supported("_NET_REQUEST_FRAME_EXTENTS")
                || !atoms.exists("_NET_FRAME_EXTENTS")
            {
                debug!("window manager does not support frame extent requests");
                return false;
            }
            (
                atoms.lookup("_NET_REQUEST_FRAME_EXTENTS").unwrap_or(x11rb::NONE),
                atoms.lookup("_NET_FRAME_EXTENTS").unwrap_or(x11rb::NONE),
            )
        };
        if self
            .transport
            .send_to_wm(self.id, request_atom, [0; 5])
            .is_err()
        {
            return false;
        }
        log_x11!(self.transport.flush());

        let deadline = Instant::now() + FRAME_EXTENTS_WAIT;
        let answered = loop {
            match self.transport.poll_for_event() {
                Ok(Some(Event::PropertyNotify(notify)))
                    if notify.window == self.id && notify.atom == frame_atom =>
                {
                    break true;
                }
                Ok(Some(event)) => self.pending_events.borrow_mut().push_back(event),
                Ok(None) => {
                    if !wait_for_readable(self.transport.readiness_fd(), deadline) {
                        break false;
                    }
                }
                Err(err) => {
                    debug!("connection failure while waiting for frame extents: {}", err);
                    break false;
                }
            }
        };
        if answered {
            self.refresh_frame_extents();
        }
        answered
    }

    /// Update the cached frame extents from `_NET_FRAME_EXTENTS`.
    fn refresh_frame_extents(&self) {
        let extents = {
            let atoms = self.atoms.borrow();
            atoms.get_property(self.id, "_NET_FRAME_EXTENTS").map(|v| {
                let items: Vec<u32> = v.value32().collect();
                FrameExtents {
                    left: items.first().copied().unwrap_or(0) as i32,
                    right: items.get(1).copied().unwrap_or(0) as i32,
                    top: items.get(2).copied().unwrap_or(0) as i32,
                    bottom: items.get(3).copied().unwrap_or(0) as i32,
                }
            })
        };
        if let Some(extents) = extents {
            self.geometry.borrow_mut().frame_extents = extents;
        }
    }

    // ---- painting, cursors, clipboard ----

    pub fn is_exposed(&self) -> bool {
        self.exposed.get()
    }

    /// Schedule a repaint of the whole client area.
    ///
    /// The request travels through the event queue as a synthetic expose,
    /// so the paint signal always runs on the dispatch thread and never
    /// re-entrantly.
    pub fn request_repaint(&self) {
        if self.destroyed() {
            return;
        }
        self.exposed.set(false);
        let (width, height) = self.geometry.borrow().client_size;
        let event = xproto::ExposeEvent {
            response_type: xproto::EXPOSE_EVENT,
            sequence: 0,
            window: self.id,
            x: 0,
            y: 0,
            width: width.min(u16::MAX as u32) as u16,
            height: height.min(u16::MAX as u32) as u16,
            count: 0,
        };
        self.pending_events
            .borrow_mut()
            .push_back(Event::Expose(event));
        self.app.post_wake();
    }

    pub fn set_cursor(&self, cursor: Cursor) {
        if self.destroyed() {
            return;
        }
        let glyph = cursor_font_glyph(cursor);
        let id = match self.transport.generate_id() {
            Ok(id) => id,
            Err(err) => {
                error!("failed to allocate cursor id: {}", err);
                return;
            }
        };
        log_x11!(self.transport.create_standard_cursor(id, glyph));
        log_x11!(self
            .transport
            .change_window_attributes(self.id, &ChangeWindowAttributesAux::new().cursor(id)));
        if let Some(old) = self.system_cursor.replace(Some(id)) {
            log_x11!(self.transport.free_cursor(old));
        }
    }

    /// Show or hide the pointer over this window.
    ///
    /// Hiding swaps in a fully transparent cursor; showing restores the
    /// standard cursor (or the inherited one when none was set).
    pub fn show_cursor(&self, show: bool) {
        if self.destroyed() {
            return;
        }
        let cursor = if show {
            self.system_cursor.get().unwrap_or(x11rb::NONE)
        } else {
            match self.invisible_cursor.get() {
                Some(id) => id,
                None => {
                    let id = match self.transport.generate_id() {
                        Ok(id) => id,
                        Err(err) => {
                            error!("failed to allocate cursor id: {}", err);
                            return;
                        }
                    };
                    log_x11!(self.transport.create_empty_cursor(id));
                    self.invisible_cursor.set(Some(id));
                    id
                }
            }
        };
        log_x11!(self
            .transport
            .change_window_attributes(self.id, &ChangeWindowAttributesAux::new().cursor(cursor)));
    }

    /// Redirect pointer events on this connection into this window.
    pub fn capture_mouse(&self, capture: bool) {
        self.app.set_mouse_capture(self.id, capture);
    }

    pub fn set_clipboard_text(&self, text: String) {
        *self.clipboard_text.borrow_mut() = Some(text);
    }

    pub fn clipboard_text(&self) -> Option<String> {
        self.clipboard_text.borrow().clone()
    }

    pub fn set_title(&self, title: &str) {
        if self.destroyed() {
            return;
        }
        *self.title.borrow_mut() = title.to_string();
        // STRING is not UTF-8, but nothing seems to care as long as
        // _NET_WM_NAME (which is) gets set too.
        log_x11!(self.transport.change_property8(
            self.id,
            u32::from(xproto::AtomEnum::WM_NAME),
            u32::from(xproto::AtomEnum::STRING),
            title.as_bytes(),
        ));
        let atoms = self.atoms.borrow();
        if let (Ok(net_wm_name), Ok(utf8)) =
            (atoms.lookup("_NET_WM_NAME"), atoms.lookup("UTF8_STRING"))
        {
            if net_wm_name != x11rb::NONE && utf8 != x11rb::NONE {
                log_x11!(self.transport.change_property8(
                    self.id,
                    net_wm_name,
                    utf8,
                    title.as_bytes(),
                ));
            }
        }
    }

    pub fn title(&self) -> String {
        self.title.borrow().clone()
    }

    pub fn set_resize_callback(&self, callback: Box<dyn FnMut(u32, u32)>) {
        *self.resize_callback.borrow_mut() = Some(callback);
    }

    // ---- event processing ----

    /// The single dispatch point for protocol events targeting this window.
    ///
    /// `capture` is the window currently holding pointer capture, if any;
    /// pointer events are delivered there with coordinates translated into
    /// its client space.
    pub(crate) fn process_event(&self, event: &Event, capture: Option<&Rc<Window>>) {
        if self.destroyed() {
            return;
        }
        match event {
            Event::Expose(ev) => self.handle_expose(ev),
            Event::KeyPress(ev) => self.deliver_key(KeyState::Down, ev.detail, ev.state),
            Event::KeyRelease(ev) => self.deliver_key(KeyState::Up, ev.detail, ev.state),
            Event::ButtonPress(ev) => {
                let (target, pos) = self.pointer_target(capture, ev.event_x, ev.event_y);
                // X has no dedicated scroll events: buttons 4 through 7 are
                // the wheel.
                if (4..=7).contains(&ev.detail) {
                    target.deliver_wheel(pos, ev.detail, ev.state);
                } else {
                    target.deliver_button(pos, ev.detail, ev.state, true);
                }
            }
            Event::ButtonRelease(ev) => {
                if (4..=7).contains(&ev.detail) {
                    // The release half of a wheel tick; the press was enough.
                    return;
                }
                let (target, pos) = self.pointer_target(capture, ev.event_x, ev.event_y);
                target.deliver_button(pos, ev.detail, ev.state, false);
            }
            Event::MotionNotify(ev) => {
                let (target, pos) = self.pointer_target(capture, ev.event_x, ev.event_y);
                target.deliver_motion(pos, ev.state);
            }
            Event::ClientMessage(ev) => self.handle_client_message(ev),
            Event::ConfigureNotify(ev) => self.handle_configure_notify(ev),
            Event::MapNotify(_) => self.handle_map_notify(),
            Event::UnmapNotify(_) => self.handle_unmap_notify(),
            Event::PropertyNotify(ev) => self.handle_property_notify(ev),
            Event::FocusIn(_) => {
                // Cross-check against a live query; focus notifications can
                // arrive stale or duplicated.
                if self.has_focus() && !self.focused.replace(true) {
                    self.with_handler(|h| h.got_focus());
                } else if !self.has_focus() {
                    debug!("ignoring stale FocusIn");
                }
            }
            Event::FocusOut(_) => {
                if !self.has_focus() && self.focused.replace(false) {
                    self.with_handler(|h| h.lost_focus());
                } else if self.has_focus() {
                    debug!("ignoring stale FocusOut");
                }
            }
            Event::DestroyNotify(_) => {
                self.with_handler(|h| h.destroyed());
            }
            _ => {
                tracing::trace!("unhandled event on window {}", self.id);
            }
        }
    }

    fn handle_expose(&self, ev: &xproto::ExposeEvent) {
        self.exposed.set(true);
        let rect = Rect::from_origin_size(
            (ev.x as f64, ev.y as f64),
            (ev.width as f64, ev.height as f64),
        )
        .to_dp(self.scale.get());
        self.with_handler(|h| h.paint_requested(rect));
    }

    /// Resolve where a pointer event should be delivered, translating the
    /// coordinates into the capture window's client space when capture is
    /// held elsewhere.
    fn pointer_target<'a>(
        &'a self,
        capture: Option<&'a Rc<Window>>,
        x: i16,
        y: i16,
    ) -> (&'a Window, Point) {
        match capture {
            Some(target) if target.id != self.id => {
                let own = self.geometry.borrow().client_position;
                let theirs = target.geometry.borrow().client_position;
                let px = Point::new(
                    (x as i32 + own.0 - theirs.0) as f64,
                    (y as i32 + own.1 - theirs.1) as f64,
                );
                (&**target, px)
            }
            _ => (self, Point::new(x as f64, y as f64)),
        }
    }

    fn deliver_key(&self, state: KeyState, keycode: u8, mods: KeyButMask) {
        let event = KeyEvent {
            state,
            keycode,
            mods: key_mods(mods),
            repeat: false,
        };
        self.with_handler(|h| match state {
            KeyState::Down => {
                h.key_down(event.clone());
            }
            KeyState::Up => h.key_up(event.clone()),
        });
    }

    fn deliver_button(&self, pos_px: Point, detail: u8, state: KeyButMask, down: bool) {
        let button = mouse_button(detail);
        let scale = self.scale.get();
        let buttons = if down {
            // The state field doesn't include the newly pressed button, but
            // consumers want it there.
            mouse_buttons(state).with(button)
        } else {
            // ... and it does include the newly released one.
            mouse_buttons(state).without(button)
        };
        let event = MouseEvent {
            pos: pos_px.to_dp(scale),
            buttons,
            mods: key_mods(state),
            count: u8::from(down),
            button,
            wheel_delta: Vec2::ZERO,
        };
        self.with_handler(|h| {
            if down {
                h.mouse_down(&event)
            } else {
                h.mouse_up(&event)
            }
        });
    }

    fn deliver_wheel(&self, pos_px: Point, button: u8, state: KeyButMask) {
        let mods = key_mods(state);
        // A delta of 120 per tick, matching the Windows convention.
        let is_shift = mods.contains(Modifiers::SHIFT);
        let delta = match button {
            4 if is_shift => (-120.0, 0.0),
            4 => (0.0, -120.0),
            5 if is_shift => (120.0, 0.0),
            5 => (0.0, 120.0),
            6 => (-120.0, 0.0),
            7 => (120.0, 0.0),
            _ => {
                warn!("unexpected mouse wheel button: {}", button);
                return;
            }
        };
        let event = MouseEvent {
            pos: pos_px.to_dp(self.scale.get()),
            buttons: mouse_buttons(state),
            mods,
            count: 0,
            button: MouseButton::None,
            wheel_delta: delta.into(),
        };
        self.with_handler(|h| h.wheel(&event));
    }

    fn deliver_motion(&self, pos_px: Point, state: KeyButMask) {
        let event = MouseEvent {
            pos: pos_px.to_dp(self.scale.get()),
            buttons: mouse_buttons(state),
            mods: key_mods(state),
            count: 0,
            button: MouseButton::None,
            wheel_delta: Vec2::ZERO,
        };
        self.with_handler(|h| h.mouse_move(&event));
    }

    fn handle_client_message(&self, ev: &xproto::ClientMessageEvent) {
        enum Action {
            Close,
            Ping([u32; 5], Atom),
        }
        let action = {
            let atoms = self.atoms.borrow();
            let wm_protocols = atoms.lookup("WM_PROTOCOLS").unwrap_or(x11rb::NONE);
            if wm_protocols == x11rb::NONE || ev.type_ != wm_protocols || ev.format != 32 {
                debug!(
                    "dropping client message of unknown type {:?}",
                    atoms.name_of(ev.type_)
                );
                return;
            }
            let data = ev.data.as_data32();
            let protocol = data[0];
            let delete = atoms.lookup("WM_DELETE_WINDOW").unwrap_or(x11rb::NONE);
            let ping = atoms.lookup("_NET_WM_PING").unwrap_or(x11rb::NONE);
            if delete != x11rb::NONE && protocol == delete {
                Some(Action::Close)
            } else if ping != x11rb::NONE && protocol == ping {
                Some(Action::Ping(data, wm_protocols))
            } else {
                debug!("dropping unrecognized WM_PROTOCOLS message");
                None
            }
        };
        match action {
            Some(Action::Close) => {
                self.with_handler(|h| h.request_close());
            }
            Some(Action::Ping(data, type_)) => {
                // EWMH ping: echo the payload back through the root window.
                log_x11!(self.transport.send_to_wm(self.screen.root, type_, data));
            }
            None => {}
        }
    }

    fn handle_configure_notify(&self, ev: &xproto::ConfigureNotifyEvent) {
        let snapshot = ConfigureSnapshot {
            x: ev.x as i32,
            y: ev.y as i32,
            width: ev.width as u32,
            height: ev.height as u32,
        };
        let previous = self.last_configure.get().unwrap_or_else(|| {
            let geometry = self.geometry.borrow();
            ConfigureSnapshot {
                x: geometry.client_position.0,
                y: geometry.client_position.1,
                width: geometry.client_size.0,
                height: geometry.client_size.1,
            }
        });
        self.last_configure.set(Some(snapshot));

        let moved = (snapshot.x, snapshot.y) != (previous.x, previous.y);
        let resized = (snapshot.width, snapshot.height) != (previous.width, previous.height);

        {
            let mut geometry = self.geometry.borrow_mut();
            geometry.client_position = (snapshot.x, snapshot.y);
            geometry.client_size = (snapshot.width, snapshot.height);
            geometry.last_position = (snapshot.x, snapshot.y);
            geometry.last_size = (snapshot.width, snapshot.height);
        }

        if resized {
            // Internal adapters refresh their surfaces before external
            // observers hear about the new size.
            if let Ok(mut callback) = self.resize_callback.try_borrow_mut() {
                if let Some(callback) = callback.as_mut() {
                    callback(snapshot.width, snapshot.height);
                }
            }
            let size =
                Size::new(snapshot.width as f64, snapshot.height as f64).to_dp(self.scale.get());
            self.with_handler(|h| h.size(size));
        }
        if moved {
            let position =
                Point::new(snapshot.x as f64, snapshot.y as f64).to_dp(self.scale.get());
            self.with_handler(|h| h.moved(position));
        }
    }

    fn handle_map_notify(&self) {
        self.mapped.set(true);
        let was_external = self.external_minimize.replace(false);
        if self.compensate_frame_extents.replace(false) {
            // Now that the WM has decorated us, learn the real extents and
            // re-issue the requested position so the frame lands where the
            // caller asked.
            self.request_frame_extents();
            let (x, y) = {
                let geometry = self.geometry.borrow();
                (
                    geometry.last_position.0 + geometry.frame_extents.left,
                    geometry.last_position.1 + geometry.frame_extents.top,
                )
            };
            log_x11!(self
                .transport
                .configure_window(self.id, &ConfigureWindowAux::new().x(x).y(y)));
            self.geometry.borrow_mut().last_position = (x, y);
        }
        if was_external {
            self.with_handler(|h| h.restored());
        }
    }

    fn handle_unmap_notify(&self) {
        self.mapped.set(false);
        if self.unmap_requested.replace(false) {
            // We asked for this unmap; nothing to report.
            return;
        }
        self.external_minimize.set(true);
        self.with_handler(|h| h.minimized());
    }

    fn handle_property_notify(&self, ev: &xproto::PropertyNotifyEvent) {
        if ev.atom == x11rb::NONE {
            return;
        }
        let atoms = self.atoms.borrow();
        let is_frame_extents =
            matches!(atoms.lookup("_NET_FRAME_EXTENTS"), Ok(atom) if atom == ev.atom);
        let is_wm_state = matches!(atoms.lookup("_NET_WM_STATE"), Ok(atom) if atom == ev.atom);
        drop(atoms);
        if is_frame_extents {
            self.refresh_frame_extents();
        } else if is_wm_state {
            // The WM acted on (or refused) our state request; the next
            // set_fullscreen call consults the property afresh.
            self.requested_fullscreen.set(None);
        }
    }

    #[cfg(test)]
    fn geometry_snapshot(&self) -> Geometry {
        *self.geometry.borrow()
    }

    #[cfg(test)]
    fn external_minimize(&self) -> bool {
        self.external_minimize.get()
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn set_normal_hints(
    transport: &dyn Transport,
    window: XWindow,
    min_size: (u32, u32),
    max_size: Option<(u32, u32)>,
    base_size: (u32, u32),
) -> Result<(), anyhow::Error> {
    let mut flags = P_MIN_SIZE | P_RESIZE_INC | P_BASE_SIZE | P_WIN_GRAVITY;
    if max_size.is_some() {
        flags |= P_MAX_SIZE;
    }
    let max_size = max_size.unwrap_or((0, 0));
    // The WM_NORMAL_HINTS wire layout, ICCCM §4.1.2.3. The four fields
    // after the flags are obsolete but still part of the format.
    let hints: [u32; 18] = [
        flags,
        0,
        0,
        0,
        0,
        min_size.0,
        min_size.1,
        max_size.0,
        max_size.1,
        1,
        1,
        0,
        0,
        0,
        0,
        base_size.0,
        base_size.1,
        NORTH_WEST_GRAVITY,
    ];
    transport.change_property32(
        window,
        u32::from(xproto::AtomEnum::WM_NORMAL_HINTS),
        u32::from(xproto::AtomEnum::WM_SIZE_HINTS),
        &hints,
    )
}

/// Block until `fd` is readable or `deadline` passes. `false` on timeout.
fn wait_for_readable(fd: std::os::unix::io::RawFd, deadline: Instant) -> bool {
    use nix::poll::{poll, PollFd, PollFlags};
    loop {
        let now = Instant::now();
        if deadline <= now {
            return false;
        }
        let millis = i32::try_from(deadline.duration_since(now).as_millis())
            .unwrap_or(i32::MAX - 1)
            .saturating_add(1);
        let mut poll_fds = [PollFd::new(fd, PollFlags::POLLIN)];
        match poll(&mut poll_fds, millis) {
            Ok(0) => return false,
            Ok(_) => return true,
            Err(nix::errno::Errno::EINTR) => {}
            Err(_) => return false,
        }
    }
}

fn cursor_font_glyph(cursor: Cursor) -> u16 {
    // Glyph indices in the standard "cursor" font.
    match cursor {
        Cursor::Arrow => 68,            // XC_left_ptr
        Cursor::IBeam => 152,           // XC_xterm
        Cursor::Pointer => 60,          // XC_hand2
        Cursor::Crosshair => 34,        // XC_crosshair
        Cursor::NotAllowed => 24,       // XC_circle
        Cursor::ResizeLeftRight => 108, // XC_sb_h_double_arrow
        Cursor::ResizeUpDown => 116,    // XC_sb_v_double_arrow
    }
}

// Converts from the `detail` field of a button event.
fn mouse_button(button: u8) -> MouseButton {
    match button {
        1 => MouseButton::Left,
        2 => MouseButton::Middle,
        3 => MouseButton::Right,
        // buttons 4 through 7 are for scrolling.
        4..=7 => MouseButton::None,
        8 => MouseButton::X1,
        9 => MouseButton::X2,
        _ => {
            warn!("unknown mouse button code {}", button);
            MouseButton::None
        }
    }
}

// Extracts the held mouse buttons from an event's `state` field.
fn mouse_buttons(mods: KeyButMask) -> MouseButtons {
    let mut buttons = MouseButtons::new();
    let button_masks = &[
        (KeyButMask::BUTTON1, MouseButton::Left),
        (KeyButMask::BUTTON2, MouseButton::Middle),
        (KeyButMask::BUTTON3, MouseButton::Right),
        // BUTTON4/5 are wheel state, not buttons.
    ];
    for (mask, button) in button_masks {
        if u16::from(mods) & u16::from(*mask) != 0 {
            buttons.insert(*button);
        }
    }
    buttons
}

// Extracts the keyboard modifiers from an event's `state` field.
fn key_mods(mods: KeyButMask) -> Modifiers {
    let mut ret = Modifiers::default();
    let key_masks = [
        (KeyButMask::SHIFT, Modifiers::SHIFT),
        (KeyButMask::CONTROL, Modifiers::CONTROL),
        // Mod keys are configurable, but this is a reasonable default for
        // US keyboards, where the "windows" key is usually MOD4.
        (KeyButMask::MOD1, Modifiers::ALT),
        (KeyButMask::MOD2, Modifiers::NUM_LOCK),
        (KeyButMask::MOD4, Modifiers::META),
        (KeyButMask::LOCK, Modifiers::CAPS_LOCK),
    ];
    for (mask, modifiers) in &key_masks {
        if u16::from(mods) & u16::from(*mask) != 0 {
            ret |= *modifiers;
        }
    }
    ret
}

/// A handle to an X11 [`Window`], weakly held so dropped windows fail
/// gracefully.
#[derive(Clone, Default)]
pub(crate) struct WindowHandle {
    id: XWindow,
    window: Weak<Window>,
}

impl PartialEq for WindowHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for WindowHandle {}

impl WindowHandle {
    fn new(id: XWindow, window: Weak<Window>) -> WindowHandle {
        WindowHandle { id, window }
    }

    fn window(&self) -> Result<Rc<Window>, ShellError> {
        self.window.upgrade().ok_or(ShellError::WindowDropped)
    }

    pub fn show(&self) -> Result<(), ShellError> {
        self.window()?.map_window()
    }

    pub fn hide(&self) -> Result<(), ShellError> {
        self.window()?.unmap_window()
    }

    pub fn close(&self) {
        if let Some(w) = self.window.upgrade() {
            w.destroy();
        } else {
            error!("window {} has already been dropped", self.id);
        }
    }

    pub fn set_position(&self, position: Point) -> Result<(), ShellError> {
        self.window()?.set_position(position)
    }

    pub fn get_position(&self) -> Point {
        if let Some(w) = self.window.upgrade() {
            w.get_position()
        } else {
            error!("window {} has already been dropped", self.id);
            Point::ZERO
        }
    }

    pub fn set_size(&self, size: Size) -> Result<(), ShellError> {
        self.window()?.set_size(size)
    }

    pub fn get_size(&self) -> Size {
        if let Some(w) = self.window.upgrade() {
            w.get_size()
        } else {
            error!("window {} has already been dropped", self.id);
            Size::ZERO
        }
    }

    pub fn set_min_size(&self, size: Size) {
        if let Some(w) = self.window.upgrade() {
            w.set_min_size(size);
        }
    }

    pub fn set_max_size(&self, size: Size) {
        if let Some(w) = self.window.upgrade() {
            w.set_max_size(size);
        }
    }

    pub fn content_insets(&self) -> Insets {
        self.window
            .upgrade()
            .map(|w| w.content_insets())
            .unwrap_or(Insets::ZERO)
    }

    pub fn set_title(&self, title: &str) {
        if let Some(w) = self.window.upgrade() {
            w.set_title(title);
        }
    }

    pub fn title(&self) -> String {
        self.window
            .upgrade()
            .map(|w| w.title())
            .unwrap_or_default()
    }

    pub fn ppi(&self) -> f64 {
        self.window.upgrade().map_or(96.0, |w| w.ppi())
    }

    pub fn is_exposed(&self) -> bool {
        self.window.upgrade().map_or(false, |w| w.is_exposed())
    }

    pub fn client_to_screen(&self, client: Point) -> Point {
        self.window
            .upgrade()
            .map(|w| w.client_to_screen(client))
            .unwrap_or(client)
    }

    pub fn screen_to_client(&self, screen: Point) -> Point {
        self.window
            .upgrade()
            .map(|w| w.screen_to_client(screen))
            .unwrap_or(screen)
    }

    pub fn set_fullscreen(&self, fullscreen: bool) {
        if let Some(w) = self.window.upgrade() {
            w.set_fullscreen(fullscreen);
        }
    }

    pub fn is_fullscreen(&self) -> bool {
        self.window.upgrade().map_or(false, |w| w.is_fullscreen())
    }

    pub fn maximize(&self) {
        if let Some(w) = self.window.upgrade() {
            w.maximize();
        }
    }

    pub fn is_maximized(&self) -> bool {
        self.window.upgrade().map_or(false, |w| w.is_maximized())
    }

    pub fn minimize(&self) {
        if let Some(w) = self.window.upgrade() {
            w.minimize();
        }
    }

    pub fn is_minimized(&self) -> bool {
        self.window.upgrade().map_or(false, |w| w.is_minimized())
    }

    pub fn restore(&self) {
        if let Some(w) = self.window.upgrade() {
            w.restore();
        }
    }

    pub fn bring_to_front_and_focus(&self) {
        if let Some(w) = self.window.upgrade() {
            w.bring_to_front_and_focus();
        }
    }

    pub fn has_focus(&self) -> bool {
        self.window.upgrade().map_or(false, |w| w.has_focus())
    }

    pub fn is_mapped(&self) -> bool {
        self.window.upgrade().map_or(false, |w| w.is_mapped())
    }

    pub fn request_repaint(&self) {
        if let Some(w) = self.window.upgrade() {
            w.request_repaint();
        }
    }

    pub fn set_cursor(&self, cursor: Cursor) {
        if let Some(w) = self.window.upgrade() {
            w.set_cursor(cursor);
        }
    }

    pub fn show_cursor(&self, show: bool) {
        if let Some(w) = self.window.upgrade() {
            w.show_cursor(show);
        }
    }

    pub fn capture_mouse(&self, capture: bool) {
        if let Some(w) = self.window.upgrade() {
            w.capture_mouse(capture);
        }
    }

    pub fn set_clipboard_text(&self, text: String) {
        if let Some(w) = self.window.upgrade() {
            w.set_clipboard_text(text);
        }
    }

    pub fn clipboard_text(&self) -> Option<String> {
        self.window.upgrade().and_then(|w| w.clipboard_text())
    }

    pub fn request_frame_extents(&self) -> bool {
        self.window
            .upgrade()
            .map_or(false, |w| w.request_frame_extents())
    }

    pub fn set_resize_callback(&self, callback: Box<dyn FnMut(u32, u32)>) {
        if let Some(w) = self.window.upgrade() {
            w.set_resize_callback(callback);
        }
    }

    pub fn native_id(&self) -> u32 {
        if self.window.upgrade().is_some() {
            self.id
        } else {
            0
        }
    }

    pub fn get_scale(&self) -> Result<Scale, ShellError> {
        Ok(self.window()?.get_scale())
    }
}
