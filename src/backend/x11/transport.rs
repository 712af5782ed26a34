// Copyright 2026 the Skylight Authors
// SPDX-License-Identifier: Apache-2.0

//! The seam between the windowing core and the X protocol.
//!
//! Everything the atom table, the window state machine and the event
//! dispatcher need from the server goes through [`Transport`]. The live
//! implementation is a thin veneer over x11rb's `RustConnection`; tests
//! inject a fake that records requests and synthesizes confirming events,
//! which is how the request-now-observe-later behavior of the window
//! manager protocol gets exercised without a server.

use std::os::fd::{AsFd, AsRawFd};
use std::os::unix::io::RawFd;

use anyhow::{anyhow, Context, Error};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    self, ChangeWindowAttributesAux, ColormapAlloc, ConfigureWindowAux, ConnectionExt,
    CreateWindowAux, EventMask, GetPropertyType, InputFocus, PropMode, WindowClass,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

pub(crate) type Atom = xproto::Atom;
pub(crate) type XWindow = xproto::Window;

/// The subset of screen setup data the windowing core consumes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScreenInfo {
    pub root: XWindow,
    pub root_depth: u8,
    pub root_visual: xproto::Visualid,
    pub width_px: u16,
    pub height_px: u16,
    pub width_mm: u16,
    pub height_mm: u16,
}

/// One reply's worth of a property read.
///
/// The protocol primitive returns a bounded buffer; `bytes_after` tells the
/// caller how much is still undelivered.
#[derive(Debug, Clone)]
pub(crate) struct PropertyChunk {
    pub type_: Atom,
    pub format: u8,
    pub bytes_after: u32,
    pub value: Vec<u8>,
}

/// Protocol operations used by the windowing core.
///
/// All requests are submitted asynchronously; their effects are observed
/// through the event stream. The only replies waited on are queries.
pub(crate) trait Transport {
    fn screen_info(&self) -> Result<ScreenInfo, Error>;
    fn generate_id(&self) -> Result<u32, Error>;
    fn intern_atom(&self, name: &str, only_if_exists: bool) -> Result<Atom, Error>;
    fn atom_name(&self, atom: Atom) -> Result<String, Error>;

    #[allow(clippy::too_many_arguments)]
    fn create_window(
        &self,
        depth: u8,
        window: XWindow,
        parent: XWindow,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
        visual: xproto::Visualid,
        aux: &CreateWindowAux,
    ) -> Result<(), Error>;
    fn destroy_window(&self, window: XWindow) -> Result<(), Error>;
    fn map_window(&self, window: XWindow) -> Result<(), Error>;
    fn unmap_window(&self, window: XWindow) -> Result<(), Error>;
    fn configure_window(&self, window: XWindow, aux: &ConfigureWindowAux) -> Result<(), Error>;
    fn change_window_attributes(
        &self,
        window: XWindow,
        aux: &ChangeWindowAttributesAux,
    ) -> Result<(), Error>;

    /// Read up to `long_length` 32-bit units of `property` starting at
    /// `long_offset`. `Ok(None)` means the property is not set.
    fn get_property_chunk(
        &self,
        window: XWindow,
        property: Atom,
        long_offset: u32,
        long_length: u32,
    ) -> Result<Option<PropertyChunk>, Error>;
    fn change_property8(
        &self,
        window: XWindow,
        property: Atom,
        type_: Atom,
        data: &[u8],
    ) -> Result<(), Error>;
    fn change_property32(
        &self,
        window: XWindow,
        property: Atom,
        type_: Atom,
        data: &[u32],
    ) -> Result<(), Error>;

    /// Send a 32-bit format client message to the root window, with the
    /// substructure masks that address the window manager.
    fn send_to_wm(&self, window: XWindow, type_: Atom, data: [u32; 5]) -> Result<(), Error>;

    fn input_focus(&self) -> Result<XWindow, Error>;
    fn set_input_focus(&self, window: XWindow) -> Result<(), Error>;

    fn create_colormap(
        &self,
        id: u32,
        window: XWindow,
        visual: xproto::Visualid,
    ) -> Result<(), Error>;
    fn free_colormap(&self, id: u32) -> Result<(), Error>;
    /// Create a cursor from the standard X cursor font glyph.
    fn create_standard_cursor(&self, id: u32, glyph: u16) -> Result<(), Error>;
    /// Create a fully transparent cursor, used for hiding the pointer.
    fn create_empty_cursor(&self, id: u32) -> Result<(), Error>;
    fn free_cursor(&self, id: u32) -> Result<(), Error>;

    fn poll_for_event(&self) -> Result<Option<Event>, Error>;
    /// A pollable fd that becomes readable when events may be available.
    fn readiness_fd(&self) -> RawFd;
    fn flush(&self) -> Result<(), Error>;
}

/// Live transport over a `RustConnection`.
pub(crate) struct XTransport {
    conn: RustConnection,
    screen_num: usize,
    root: XWindow,
}

impl XTransport {
    pub(crate) fn connect() -> Result<XTransport, x11rb::errors::ConnectError> {
        let (conn, screen_num) = RustConnection::connect(None)?;
        let root = conn.setup().roots[screen_num].root;
        Ok(XTransport {
            conn,
            screen_num,
            root,
        })
    }
}

impl Transport for XTransport {
    fn screen_info(&self) -> Result<ScreenInfo, Error> {
        let screen = self
            .conn
            .setup()
            .roots
            .get(self.screen_num)
            .ok_or_else(|| anyhow!("invalid screen num: {}", self.screen_num))?;
        Ok(ScreenInfo {
            root: screen.root,
            root_depth: screen.root_depth,
            root_visual: screen.root_visual,
            width_px: screen.width_in_pixels,
            height_px: screen.height_in_pixels,
            width_mm: screen.width_in_millimeters,
            height_mm: screen.height_in_millimeters,
        })
    }

    fn generate_id(&self) -> Result<u32, Error> {
        Ok(self.conn.generate_id()?)
    }

    fn intern_atom(&self, name: &str, only_if_exists: bool) -> Result<Atom, Error> {
        Ok(self
            .conn
            .intern_atom(only_if_exists, name.as_bytes())?
            .reply()
            .with_context(|| format!("intern atom {name}"))?
            .atom)
    }

    fn atom_name(&self, atom: Atom) -> Result<String, Error> {
        let reply = self.conn.get_atom_name(atom)?.reply()?;
        Ok(String::from_utf8_lossy(&reply.name).into_owned())
    }

    fn create_window(
        &self,
        depth: u8,
        window: XWindow,
        parent: XWindow,
        x: i16,
        y: i16,
        width: u16,
        height: u16,
        visual: xproto::Visualid,
        aux: &CreateWindowAux,
    ) -> Result<(), Error> {
        self.conn
            .create_window(
                depth,
                window,
                parent,
                x,
                y,
                width,
                height,
                0,
                WindowClass::INPUT_OUTPUT,
                visual,
                aux,
            )?
            .check()
            .context("create window")?;
        Ok(())
    }

    fn destroy_window(&self, window: XWindow) -> Result<(), Error> {
        self.conn.destroy_window(window)?;
        Ok(())
    }

    fn map_window(&self, window: XWindow) -> Result<(), Error> {
        self.conn.map_window(window)?;
        Ok(())
    }

    fn unmap_window(&self, window: XWindow) -> Result<(), Error> {
        self.conn.unmap_window(window)?;
        Ok(())
    }

    fn configure_window(&self, window: XWindow, aux: &ConfigureWindowAux) -> Result<(), Error> {
        self.conn.configure_window(window, aux)?;
        Ok(())
    }

    fn change_window_attributes(
        &self,
        window: XWindow,
        aux: &ChangeWindowAttributesAux,
    ) -> Result<(), Error> {
        self.conn.change_window_attributes(window, aux)?;
        Ok(())
    }

    fn get_property_chunk(
        &self,
        window: XWindow,
        property: Atom,
        long_offset: u32,
        long_length: u32,
    ) -> Result<Option<PropertyChunk>, Error> {
        let reply = self
            .conn
            .get_property(
                false,
                window,
                property,
                GetPropertyType::ANY,
                long_offset,
                long_length,
            )?
            .reply()
            .context("get property")?;
        if reply.type_ == x11rb::NONE {
            return Ok(None);
        }
        Ok(Some(PropertyChunk {
            type_: reply.type_,
            format: reply.format,
            bytes_after: reply.bytes_after,
            value: reply.value,
        }))
    }

    fn change_property8(
        &self,
        window: XWindow,
        property: Atom,
        type_: Atom,
        data: &[u8],
    ) -> Result<(), Error> {
        self.conn
            .change_property8(PropMode::REPLACE, window, property, type_, data)?;
        Ok(())
    }

    fn change_property32(
        &self,
        window: XWindow,
        property: Atom,
        type_: Atom,
        data: &[u32],
    ) -> Result<(), Error> {
        self.conn
            .change_property32(PropMode::REPLACE, window, property, type_, data)?;
        Ok(())
    }

    fn send_to_wm(&self, window: XWindow, type_: Atom, data: [u32; 5]) -> Result<(), Error> {
        let event = xproto::ClientMessageEvent::new(32, window, type_, data);
        self.conn.send_event(
            false,
            self.root,
            EventMask::SUBSTRUCTURE_NOTIFY | EventMask::SUBSTRUCTURE_REDIRECT,
            event,
        )?;
        Ok(())
    }

    fn input_focus(&self) -> Result<XWindow, Error> {
        Ok(self.conn.get_input_focus()?.reply()?.focus)
    }

    fn set_input_focus(&self, window: XWindow) -> Result<(), Error> {
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, window, x11rb::CURRENT_TIME)?;
        Ok(())
    }

    fn create_colormap(
        &self,
        id: u32,
        window: XWindow,
        visual: xproto::Visualid,
    ) -> Result<(), Error> {
        self.conn
            .create_colormap(ColormapAlloc::NONE, id, window, visual)?;
        Ok(())
    }

    fn free_colormap(&self, id: u32) -> Result<(), Error> {
        self.conn.free_colormap(id)?;
        Ok(())
    }

    fn create_standard_cursor(&self, id: u32, glyph: u16) -> Result<(), Error> {
        let font = self.conn.generate_id()?;
        self.conn.open_font(font, b"cursor")?;
        // Standard cursor font glyphs come in pairs: the shape and its mask.
        self.conn.create_glyph_cursor(
            id,
            font,
            font,
            glyph,
            glyph + 1,
            0,
            0,
            0,
            u16::MAX,
            u16::MAX,
            u16::MAX,
        )?;
        self.conn.close_font(font)?;
        Ok(())
    }

    fn create_empty_cursor(&self, id: u32) -> Result<(), Error> {
        let pixmap = self.conn.generate_id()?;
        self.conn.create_pixmap(1, pixmap, self.root, 1, 1)?;
        self.conn
            .create_cursor(id, pixmap, pixmap, 0, 0, 0, 0, 0, 0, 0, 0)?;
        self.conn.free_pixmap(pixmap)?;
        Ok(())
    }

    fn free_cursor(&self, id: u32) -> Result<(), Error> {
        self.conn.free_cursor(id)?;
        Ok(())
    }

    fn poll_for_event(&self) -> Result<Option<Event>, Error> {
        Ok(self.conn.poll_for_event()?)
    }

    fn readiness_fd(&self) -> RawFd {
        self.conn.stream().as_fd().as_raw_fd()
    }

    fn flush(&self) -> Result<(), Error> {
        self.conn.flush()?;
        Ok(())
    }
}
