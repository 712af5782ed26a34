// Copyright 2026 the Skylight Authors
// SPDX-License-Identifier: Apache-2.0

//! A fake transport for exercising the windowing core without a server.
//!
//! Requests are recorded for inspection and state changes are *not*
//! reflected back automatically: tests synthesize the confirming events
//! themselves, exactly the way a window manager would answer (or ignore)
//! the corresponding requests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::os::unix::io::RawFd;
use std::rc::Rc;

use anyhow::Error;
use x11rb::protocol::xproto::{
    self, ChangeWindowAttributesAux, ConfigureWindowAux, CreateWindowAux, KeyButMask,
};
use x11rb::protocol::Event;

use super::atoms::ATOM_NAMES;
use super::transport::{Atom, PropertyChunk, ScreenInfo, Transport, XWindow};

/// A request observed by the fake server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Request {
    CreateWindow {
        window: XWindow,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
    },
    DestroyWindow(XWindow),
    MapWindow(XWindow),
    UnmapWindow(XWindow),
    ConfigureWindow {
        window: XWindow,
        x: Option<i32>,
        y: Option<i32>,
        width: Option<u32>,
        height: Option<u32>,
    },
    ChangeAttributes(XWindow),
    ChangeProperty {
        window: XWindow,
        property: Atom,
    },
    SendToWm {
        window: XWindow,
        type_: Atom,
        data: [u32; 5],
    },
    SetInputFocus(XWindow),
    CreateColormap(u32),
    FreeColormap(u32),
    CreateCursor(u32),
    FreeCursor(u32),
}

pub(crate) struct FakeTransport {
    screen: ScreenInfo,
    /// Atoms the fake server knows; intern with only-if-exists honors this.
    atoms: RefCell<HashMap<String, Atom>>,
    next_atom: Cell<Atom>,
    next_id: Cell<u32>,
    fail_next_id: Cell<bool>,
    properties: RefCell<HashMap<(XWindow, Atom), (Atom, u8, Vec<u8>)>>,
    /// Upper bound on 32-bit units returned per property read, to emulate
    /// the server's bounded reply buffer.
    max_property_units: Cell<u32>,
    requests: RefCell<Vec<Request>>,
    events: RefCell<VecDeque<Event>>,
    focus: Cell<XWindow>,
    pipe_read: RawFd,
    pipe_write: RawFd,
}

pub(crate) const FAKE_ROOT: XWindow = 1;

impl FakeTransport {
    pub fn new() -> Rc<FakeTransport> {
        FakeTransport::with_wm_support(&[])
    }

    /// A fake whose window manager advertises `supported` in
    /// `_NET_SUPPORTED`.
    pub fn with_wm_support(supported: &[&str]) -> Rc<FakeTransport> {
        let (pipe_read, pipe_write) =
            nix::unistd::pipe2(nix::fcntl::OFlag::O_NONBLOCK).expect("create fake event pipe");
        let fake = FakeTransport {
            screen: ScreenInfo {
                root: FAKE_ROOT,
                root_depth: 24,
                root_visual: 32,
                width_px: 1920,
                height_px: 1080,
                // 508 mm at 1920 px is exactly 96 ppi.
                width_mm: 508,
                height_mm: 285,
            },
            atoms: RefCell::new(HashMap::new()),
            next_atom: Cell::new(100),
            next_id: Cell::new(1000),
            fail_next_id: Cell::new(false),
            properties: RefCell::new(HashMap::new()),
            max_property_units: Cell::new(u32::MAX),
            requests: RefCell::new(Vec::new()),
            events: RefCell::new(VecDeque::new()),
            focus: Cell::new(x11rb::NONE),
            pipe_read,
            pipe_write,
        };

        // The server has seen every well-known atom unless a test forgets
        // one explicitly.
        for &name in ATOM_NAMES {
            fake.register_atom(name);
        }

        let supported_handles: Vec<u32> = supported
            .iter()
            .map(|name| fake.register_atom(name))
            .collect();
        let net_supported = fake.register_atom("_NET_SUPPORTED");
        let atom_type = u32::from(xproto::AtomEnum::ATOM);
        fake.store_property32(FAKE_ROOT, net_supported, atom_type, &supported_handles);

        Rc::new(fake)
    }

    fn register_atom(&self, name: &str) -> Atom {
        let mut atoms = self.atoms.borrow_mut();
        if let Some(&atom) = atoms.get(name) {
            return atom;
        }
        let atom = self.next_atom.get();
        self.next_atom.set(atom + 1);
        atoms.insert(name.to_string(), atom);
        atom
    }

    fn store_property32(&self, window: XWindow, property: Atom, type_: Atom, data: &[u32]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_ne_bytes()).collect();
        self.properties
            .borrow_mut()
            .insert((window, property), (type_, 32, bytes));
    }

    // ---- test controls ----

    /// The server-side handle of `name`, registering it if needed.
    pub fn atom(&self, name: &str) -> Atom {
        self.register_atom(name)
    }

    /// Make the server forget `name`, so only-if-exists interning yields
    /// `NONE`.
    pub fn forget_atom(&self, name: &str) {
        self.atoms.borrow_mut().remove(name);
    }

    /// The handles listed in the root window's `_NET_SUPPORTED`.
    pub fn supported_atoms(&self) -> Vec<Atom> {
        let net_supported = self.atom("_NET_SUPPORTED");
        self.property32(FAKE_ROOT, net_supported).unwrap_or_default()
    }

    /// Every request the fake server has seen, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.borrow().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.borrow_mut().clear();
    }

    /// Queue an event and mark the connection readable.
    pub fn push_event(&self, event: Event) {
        self.events.borrow_mut().push_back(event);
        let _ = nix::unistd::write(self.pipe_write, &[0u8]);
    }

    pub fn pending_event_count(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn set_property32(&self, window: XWindow, property: Atom, type_: Atom, data: &[u32]) {
        self.store_property32(window, property, type_, data);
    }

    /// The value of a 32-bit property, as the tests' assertion helper.
    pub fn property32(&self, window: XWindow, property: Atom) -> Option<Vec<u32>> {
        self.properties
            .borrow()
            .get(&(window, property))
            .map(|(_, _, bytes)| {
                bytes
                    .chunks_exact(4)
                    .map(|b| u32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
                    .collect()
            })
    }

    pub fn set_max_property_units(&self, units: u32) {
        self.max_property_units.set(units);
    }

    pub fn set_focus(&self, window: XWindow) {
        self.focus.set(window);
    }

    /// Make the next id allocation return the null id, as a failed native
    /// allocation would.
    pub fn fail_next_id(&self) {
        self.fail_next_id.set(true);
    }

    fn record(&self, request: Request) {
        self.requests.borrow_mut().push(request);
    }
}

impl Drop for FakeTransport {
    fn drop(&mut self) {
        let _ = nix::unistd::close(self.pipe_read);
        let _ = nix::unistd::close(self.pipe_write);
    }
}

impl Transport for FakeTransport {
    fn screen_info(&self) -> Result<ScreenInfo, Error> {
        Ok(self.screen)
    }

    fn generate_id(&self) -> Result<u32, Error> {
        if self.fail_next_id.replace(false) {
            return Ok(0);
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        Ok(id)
    }

    fn intern_atom(&self, name: &str, only_if_exists: bool) -> Result<Atom, Error> {
        if let Some(&atom) = self.atoms.borrow().get(name) {
            return Ok(atom);
        }
        if only_if_exists {
            return Ok(x11rb::NONE);
        }
        Ok(self.register_atom(name))
    }

    fn atom_name(&self, atom: Atom) -> Result<String, Error> {
        self.atoms
            .borrow()
            .iter()
            .find(|(_, &a)| a == atom)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| anyhow::anyhow!("no such atom: {atom}"))
    }

    fn create_window(
        &self,
        _depth: u8,
        window: XWindow,
        _parent: XWindow,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
        _visual: xproto::Visualid,
        _aux: &CreateWindowAux,
    ) -> Result<(), Error> {
        self.record(Request::CreateWindow {
            window,
            x,
            y,
            width,
            height,
        });
        Ok(())
    }

    fn destroy_window(&self, window: XWindow) -> Result<(), Error> {
        self.record(Request::DestroyWindow(window));
        Ok(())
    }

    fn map_window(&self, window: XWindow) -> Result<(), Error> {
        self.record(Request::MapWindow(window));
        Ok(())
    }

    fn unmap_window(&self, window: XWindow) -> Result<(), Error> {
        self.record(Request::UnmapWindow(window));
        Ok(())
    }

    fn configure_window(&self, window: XWindow, aux: &ConfigureWindowAux) -> Result<(), Error> {
        self.record(Request::ConfigureWindow {
            window,
            x: aux.x,
            y: aux.y,
            width: aux.width,
            height: aux.height,
        });
        Ok(())
    }

    fn change_window_attributes(
        &self,
        window: XWindow,
        _aux: &ChangeWindowAttributesAux,
    ) -> Result<(), Error> {
        self.record(Request::ChangeAttributes(window));
        Ok(())
    }

    fn get_property_chunk(
        &self,
        window: XWindow,
        property: Atom,
        long_offset: u32,
        long_length: u32,
    ) -> Result<Option<PropertyChunk>, Error> {
        let properties = self.properties.borrow();
        let Some((type_, format, bytes)) = properties.get(&(window, property)) else {
            return Ok(None);
        };
        let start = (long_offset as usize) * 4;
        if start > bytes.len() {
            return Ok(None);
        }
        let requested = long_length.min(self.max_property_units.get()) as usize * 4;
        let len = requested.min(bytes.len() - start);
        Ok(Some(PropertyChunk {
            type_: *type_,
            format: *format,
            bytes_after: (bytes.len() - start - len) as u32,
            value: bytes[start..start + len].to_vec(),
        }))
    }

    fn change_property8(
        &self,
        window: XWindow,
        property: Atom,
        type_: Atom,
        data: &[u8],
    ) -> Result<(), Error> {
        self.record(Request::ChangeProperty { window, property });
        self.properties
            .borrow_mut()
            .insert((window, property), (type_, 8, data.to_vec()));
        Ok(())
    }

    fn change_property32(
        &self,
        window: XWindow,
        property: Atom,
        type_: Atom,
        data: &[u32],
    ) -> Result<(), Error> {
        self.record(Request::ChangeProperty { window, property });
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_ne_bytes()).collect();
        self.properties
            .borrow_mut()
            .insert((window, property), (type_, 32, bytes));
        Ok(())
    }

    fn send_to_wm(&self, window: XWindow, type_: Atom, data: [u32; 5]) -> Result<(), Error> {
        self.record(Request::SendToWm {
            window,
            type_,
            data,
        });
        Ok(())
    }

    fn input_focus(&self) -> Result<XWindow, Error> {
        Ok(self.focus.get())
    }

    fn set_input_focus(&self, window: XWindow) -> Result<(), Error> {
        self.record(Request::SetInputFocus(window));
        self.focus.set(window);
        Ok(())
    }

    fn create_colormap(
        &self,
        id: u32,
        _window: XWindow,
        _visual: xproto::Visualid,
    ) -> Result<(), Error> {
        self.record(Request::CreateColormap(id));
        Ok(())
    }

    fn free_colormap(&self, id: u32) -> Result<(), Error> {
        self.record(Request::FreeColormap(id));
        Ok(())
    }

    fn create_standard_cursor(&self, id: u32, _glyph: u16) -> Result<(), Error> {
        self.record(Request::CreateCursor(id));
        Ok(())
    }

    fn create_empty_cursor(&self, id: u32) -> Result<(), Error> {
        self.record(Request::CreateCursor(id));
        Ok(())
    }

    fn free_cursor(&self, id: u32) -> Result<(), Error> {
        self.record(Request::FreeCursor(id));
        Ok(())
    }

    fn poll_for_event(&self) -> Result<Option<Event>, Error> {
        let event = self.events.borrow_mut().pop_front();
        if event.is_some() {
            let mut byte = [0u8; 1];
            let _ = nix::unistd::read(self.pipe_read, &mut byte);
        }
        Ok(event)
    }

    fn readiness_fd(&self) -> RawFd {
        self.pipe_read
    }

    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}

/// A `WinHandler` that records every signal it receives, in order.
pub(crate) struct RecordingHandler {
    log: Rc<RefCell<Vec<String>>>,
}

impl RecordingHandler {
    pub fn new(log: &Rc<RefCell<Vec<String>>>) -> RecordingHandler {
        RecordingHandler {
            log: Rc::clone(log),
        }
    }

    fn record(&self, entry: String) {
        self.log.borrow_mut().push(entry);
    }
}

impl crate::window::WinHandler for RecordingHandler {
    fn connect(&mut self, _handle: &crate::window::WindowHandle) {
        self.record("connect".into());
    }

    fn scale(&mut self, scale: crate::scale::Scale) {
        self.record(format!("scale {}", scale.x()));
    }

    fn size(&mut self, size: kurbo::Size) {
        self.record(format!("size {}x{}", size.width, size.height));
    }

    fn moved(&mut self, position: kurbo::Point) {
        self.record(format!("moved {},{}", position.x, position.y));
    }

    fn paint_requested(&mut self, _invalid: kurbo::Rect) {
        self.record("paint".into());
    }

    fn request_close(&mut self) {
        self.record("close-request".into());
    }

    fn destroyed(&mut self) {
        self.record("destroyed".into());
    }

    fn got_focus(&mut self) {
        self.record("got-focus".into());
    }

    fn lost_focus(&mut self) {
        self.record("lost-focus".into());
    }

    fn minimized(&mut self) {
        self.record("minimized".into());
    }

    fn restored(&mut self) {
        self.record("restored".into());
    }

    fn key_down(&mut self, event: crate::keyboard::KeyEvent) -> bool {
        self.record(format!("key-down {}", event.keycode));
        false
    }

    fn key_up(&mut self, event: crate::keyboard::KeyEvent) {
        self.record(format!("key-up {}", event.keycode));
    }

    fn mouse_down(&mut self, event: &crate::mouse::MouseEvent) {
        self.record(format!(
            "mouse-down {:?} {},{}",
            event.button, event.pos.x, event.pos.y
        ));
    }

    fn mouse_up(&mut self, event: &crate::mouse::MouseEvent) {
        self.record(format!(
            "mouse-up {:?} {},{}",
            event.button, event.pos.x, event.pos.y
        ));
    }

    fn mouse_move(&mut self, event: &crate::mouse::MouseEvent) {
        self.record(format!("mouse-move {},{}", event.pos.x, event.pos.y));
    }

    fn wheel(&mut self, event: &crate::mouse::MouseEvent) {
        self.record(format!(
            "wheel {},{}",
            event.wheel_delta.x, event.wheel_delta.y
        ));
    }

    fn as_any(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

// ---- event synthesis helpers shared by the window and dispatcher tests ----

pub(crate) fn configure_notify(window: XWindow, x: i16, y: i16, width: u16, height: u16) -> Event {
    Event::ConfigureNotify(xproto::ConfigureNotifyEvent {
        response_type: xproto::CONFIGURE_NOTIFY_EVENT,
        sequence: 0,
        event: window,
        window,
        above_sibling: x11rb::NONE,
        x,
        y,
        width,
        height,
        border_width: 0,
        override_redirect: false,
    })
}

pub(crate) fn map_notify(window: XWindow) -> Event {
    Event::MapNotify(xproto::MapNotifyEvent {
        response_type: xproto::MAP_NOTIFY_EVENT,
        sequence: 0,
        event: window,
        window,
        override_redirect: false,
    })
}

pub(crate) fn unmap_notify(window: XWindow) -> Event {
    Event::UnmapNotify(xproto::UnmapNotifyEvent {
        response_type: xproto::UNMAP_NOTIFY_EVENT,
        sequence: 0,
        event: window,
        window,
        from_configure: false,
    })
}

pub(crate) fn client_message(window: XWindow, type_: Atom, data: [u32; 5]) -> Event {
    Event::ClientMessage(xproto::ClientMessageEvent::new(32, window, type_, data))
}

pub(crate) fn property_notify(window: XWindow, atom: Atom) -> Event {
    Event::PropertyNotify(xproto::PropertyNotifyEvent {
        response_type: xproto::PROPERTY_NOTIFY_EVENT,
        sequence: 0,
        window,
        atom,
        time: 0,
        state: xproto::Property::NEW_VALUE,
    })
}

pub(crate) fn focus_in(window: XWindow) -> Event {
    Event::FocusIn(xproto::FocusInEvent {
        response_type: xproto::FOCUS_IN_EVENT,
        detail: xproto::NotifyDetail::NONLINEAR,
        sequence: 0,
        event: window,
        mode: xproto::NotifyMode::NORMAL,
    })
}

pub(crate) fn focus_out(window: XWindow) -> Event {
    Event::FocusOut(xproto::FocusOutEvent {
        response_type: xproto::FOCUS_OUT_EVENT,
        detail: xproto::NotifyDetail::NONLINEAR,
        sequence: 0,
        event: window,
        mode: xproto::NotifyMode::NORMAL,
    })
}

pub(crate) fn expose(window: XWindow, x: u16, y: u16, width: u16, height: u16) -> Event {
    Event::Expose(xproto::ExposeEvent {
        response_type: xproto::EXPOSE_EVENT,
        sequence: 0,
        window,
        x,
        y,
        width,
        height,
        count: 0,
    })
}

pub(crate) fn button_press(window: XWindow, detail: u8, x: i16, y: i16) -> Event {
    Event::ButtonPress(xproto::ButtonPressEvent {
        response_type: xproto::BUTTON_PRESS_EVENT,
        detail,
        sequence: 0,
        time: 0,
        root: FAKE_ROOT,
        event: window,
        child: x11rb::NONE,
        root_x: x,
        root_y: y,
        event_x: x,
        event_y: y,
        state: KeyButMask::default(),
        same_screen: true,
    })
}

pub(crate) fn button_release(window: XWindow, detail: u8, x: i16, y: i16) -> Event {
    Event::ButtonRelease(xproto::ButtonReleaseEvent {
        response_type: xproto::BUTTON_RELEASE_EVENT,
        detail,
        sequence: 0,
        time: 0,
        root: FAKE_ROOT,
        event: window,
        child: x11rb::NONE,
        root_x: x,
        root_y: y,
        event_x: x,
        event_y: y,
        state: KeyButMask::BUTTON1,
        same_screen: true,
    })
}

pub(crate) fn motion_notify(window: XWindow, x: i16, y: i16) -> Event {
    Event::MotionNotify(xproto::MotionNotifyEvent {
        response_type: xproto::MOTION_NOTIFY_EVENT,
        detail: xproto::Motion::NORMAL,
        sequence: 0,
        time: 0,
        root: FAKE_ROOT,
        event: window,
        child: x11rb::NONE,
        root_x: x,
        root_y: y,
        event_x: x,
        event_y: y,
        state: KeyButMask::default(),
        same_screen: true,
    })
}

pub(crate) fn key_press(window: XWindow, keycode: u8) -> Event {
    Event::KeyPress(xproto::KeyPressEvent {
        response_type: xproto::KEY_PRESS_EVENT,
        detail: keycode,
        sequence: 0,
        time: 0,
        root: FAKE_ROOT,
        event: window,
        child: x11rb::NONE,
        root_x: 0,
        root_y: 0,
        event_x: 0,
        event_y: 0,
        state: KeyButMask::default(),
        same_screen: true,
    })
}

pub(crate) fn destroy_notify(window: XWindow) -> Event {
    Event::DestroyNotify(xproto::DestroyNotifyEvent {
        response_type: xproto::DESTROY_NOTIFY_EVENT,
        sequence: 0,
        event: window,
        window,
    })
}
