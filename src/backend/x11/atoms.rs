// Copyright 2026 the Skylight Authors
// SPDX-License-Identifier: Apache-2.0

//! Interned protocol atoms and window manager feature discovery.

use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{anyhow, Error};
use tracing::debug;

use super::transport::{Atom, PropertyChunk, Transport, XWindow};

/// Every atom name the shell uses, interned in one batch at window
/// preparation time.
///
/// Interning uses only-if-exists: a name the server has never seen yields a
/// `NONE` handle rather than an error, and callers treat that as "feature
/// unavailable".
pub(crate) const ATOM_NAMES: &[&str] = &[
    "WM_PROTOCOLS",
    "WM_CLIENT_MACHINE",
    "WM_DELETE_WINDOW",
    "WM_STATE",
    "WM_CHANGE_STATE",
    "UTF8_STRING",
    "CLIPBOARD",
    "PRIMARY",
    "_NET_SUPPORTED",
    "_NET_SUPPORTING_WM_CHECK",
    // The lengths added by the WM to each side of a window for decorations.
    "_NET_FRAME_EXTENTS",
    // Asks the WM to calculate the frame extents of a window at its current
    // configuration. Some WMs do not implement this but set
    // _NET_FRAME_EXTENTS even when the window is not mapped.
    "_NET_REQUEST_FRAME_EXTENTS",
    "_NET_WM_FULL_PLACEMENT",
    "_NET_WM_FULLSCREEN_MONITORS",
    "_NET_WM_NAME",
    "_NET_WM_PID",
    "_NET_WM_PING",
    "_NET_WM_STATE",
    "_NET_WM_STATE_HIDDEN",
    "_NET_WM_STATE_FULLSCREEN",
    "_NET_WM_STATE_MAXIMIZED_HORZ",
    "_NET_WM_STATE_MAXIMIZED_VERT",
    "_NET_WM_STATE_MODAL",
    "_NET_WM_WINDOW_TYPE",
    "_NET_WM_WINDOW_TYPE_DESKTOP",
    "_NET_WM_WINDOW_TYPE_DOCK",
    "_NET_WM_WINDOW_TYPE_TOOLBAR",
    "_NET_WM_WINDOW_TYPE_MENU",
    "_NET_WM_WINDOW_TYPE_UTILITY",
    "_NET_WM_WINDOW_TYPE_SPLASH",
    "_NET_WM_WINDOW_TYPE_DIALOG",
    "_NET_WM_WINDOW_TYPE_DROPDOWN_MENU",
    "_NET_WM_WINDOW_TYPE_POPUP_MENU",
    "_NET_WM_WINDOW_TYPE_TOOLTIP",
    "_NET_WM_WINDOW_TYPE_NOTIFICATION",
    "_NET_WM_WINDOW_TYPE_COMBO",
    "_NET_WM_WINDOW_TYPE_DND",
    "_NET_WM_WINDOW_TYPE_NORMAL",
];

/// `_NET_WM_STATE` client message actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub(crate) enum StateAction {
    Remove = 0,
    Add = 1,
    #[allow(dead_code)]
    Toggle = 2,
}

/// A fully assembled property value.
#[derive(Debug, Clone)]
pub(crate) struct PropertyValue {
    pub type_: Atom,
    pub format: u8,
    pub data: Vec<u8>,
}

impl PropertyValue {
    pub fn value32(&self) -> impl Iterator<Item = u32> + '_ {
        self.data
            .chunks_exact(4)
            .map(|b| u32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// The atom table for one window's connection.
///
/// Holds the name-to-handle map for [`ATOM_NAMES`] plus the subset the
/// window manager advertises in `_NET_SUPPORTED`. Populated when a window
/// is prepared, cleared when it is destroyed.
pub(crate) struct AtomTable {
    transport: Rc<dyn Transport>,
    root: XWindow,
    map: HashMap<String, Atom>,
    /// Atoms present in the WM's `_NET_SUPPORTED` set.
    net: HashMap<String, Atom>,
}

impl AtomTable {
    /// Intern the well-known atoms and discover what the WM supports.
    pub fn populate(transport: Rc<dyn Transport>, root: XWindow) -> Result<AtomTable, Error> {
        let mut table = AtomTable {
            transport,
            root,
            map: HashMap::new(),
            net: HashMap::new(),
        };

        debug!("populating display atoms");
        for &name in ATOM_NAMES {
            let atom = table.transport.intern_atom(name, true)?;
            debug!(
                "  {}\t: {} {}",
                name,
                atom,
                if atom == x11rb::NONE { "None" } else { "OK" }
            );
            table.map.insert(name.to_string(), atom);
        }

        let net_supported = table.map["_NET_SUPPORTED"];
        if net_supported == x11rb::NONE {
            debug!("_NET_SUPPORTED is not provided by the WM");
            return Ok(table);
        }

        let supported = match table.get_property_by_atom(table.root, net_supported) {
            Some(value) => value.value32().collect::<Vec<_>>(),
            None => {
                debug!("failed to query _NET_SUPPORTED");
                return Ok(table);
            }
        };

        debug!("enumerating _NET_SUPPORTED atoms");
        for (name, &atom) in &table.map {
            if atom != x11rb::NONE && supported.contains(&atom) {
                table.net.insert(name.clone(), atom);
                debug!("  {}", name);
            }
        }
        debug!(
            "  ... and {} others that we don't use",
            supported.len().saturating_sub(table.net.len())
        );

        Ok(table)
    }

    /// Forget everything. Used when the owning window is destroyed.
    pub fn clear(&mut self) {
        self.map.clear();
        self.net.clear();
    }

    /// The handle for `name`.
    ///
    /// Fails if `name` was never interned (including before population);
    /// that is a programming error, not a missing server feature.
    pub fn lookup(&self, name: &str) -> Result<Atom, Error> {
        self.map
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("atom {name} has not been interned"))
    }

    /// Whether `name` was interned to a real (non-`NONE`) handle.
    pub fn exists(&self, name: &str) -> bool {
        matches!(self.map.get(name), Some(&atom) if atom != x11rb::NONE)
    }

    /// Whether the window manager advertises `name` in `_NET_SUPPORTED`.
    ///
    /// Absence means "feature unavailable"; callers degrade gracefully.
    pub fn is_supported(&self, name: &str) -> bool {
        self.net.contains_key(name)
    }

    /// The name of `atom`, for debug output.
    pub fn name_of(&self, atom: Atom) -> Option<String> {
        self.transport.atom_name(atom).ok()
    }

    /// Read the whole value of the property `name` on `window`.
    ///
    /// `None` when the property is not set, the atom is unavailable, or the
    /// read fails; a missing property is normal operation.
    pub fn get_property(&self, window: XWindow, name: &str) -> Option<PropertyValue> {
        let atom = match self.map.get(name) {
            Some(&atom) if atom != x11rb::NONE => atom,
            _ => return None,
        };
        self.get_property_by_atom(window, atom)
    }

    /// Read a whole property via repeated bounded reads.
    ///
    /// The protocol primitive delivers a fixed-size buffer per reply, so the
    /// length is probed with a zero-length read and the remainder fetched
    /// until no bytes are left undelivered.
    pub fn get_property_by_atom(&self, window: XWindow, property: Atom) -> Option<PropertyValue> {
        let mut data = Vec::new();
        let mut offset = 0u32;
        let mut read_units = 0u32;
        let (type_, format) = loop {
            let chunk: PropertyChunk =
                match self
                    .transport
                    .get_property_chunk(window, property, offset, read_units)
                {
                    Ok(Some(chunk)) => chunk,
                    Ok(None) => return None,
                    Err(err) => {
                        debug!("property read failed: {}", err);
                        return None;
                    }
                };
            offset += chunk.value.len() as u32 / 4;
            data.extend_from_slice(&chunk.value);
            if chunk.bytes_after == 0 {
                break (chunk.type_, chunk.format);
            }
            read_units = (chunk.bytes_after + 3) / 4;
        };
        Some(PropertyValue {
            type_,
            format,
            data,
        })
    }

    /// Test which of `state_names` are present in the window's
    /// `_NET_WM_STATE`.
    ///
    /// `None` on failure to read the property; atoms the WM does not provide
    /// always report `false`.
    pub fn check_net_wm_state(
        &self,
        window: XWindow,
        state_names: &[&str],
    ) -> Option<Vec<bool>> {
        if !self.exists("_NET_WM_STATE") {
            debug!("check_net_wm_state failed: _NET_WM_STATE not provided by WM");
            return None;
        }
        let value = self.get_property(window, "_NET_WM_STATE")?;
        let present: Vec<u32> = value.value32().collect();

        let mut states = vec![false; state_names.len()];
        for (i, name) in state_names.iter().enumerate() {
            match self.map.get(*name) {
                Some(&atom) if atom != x11rb::NONE => {
                    states[i] = present.contains(&atom);
                }
                _ => {
                    // An atom the WM never interned cannot be set.
                    debug!("check_net_wm_state: {} is not provided by WM", name);
                }
            }
        }
        Some(states)
    }

    /// Ask the window manager to add, remove or toggle up to two
    /// `_NET_WM_STATE` flags on `window`.
    ///
    /// Returns whether the message was delivered; the actual state change is
    /// observed later through the event stream, if the WM cooperates at all.
    pub fn modify_net_wm_state(
        &self,
        window: XWindow,
        action: StateAction,
        first: &str,
        second: Option<&str>,
    ) -> bool {
        let type_ = match self.map.get("_NET_WM_STATE") {
            Some(&atom) if atom != x11rb::NONE => atom,
            _ => {
                debug!("modify_net_wm_state failed: _NET_WM_STATE not provided by WM");
                return false;
            }
        };
        let first = match self.map.get(first) {
            Some(&atom) if atom != x11rb::NONE => atom,
            _ => {
                debug!("modify_net_wm_state failed: {} not provided by WM", first);
                return false;
            }
        };
        let second = second
            .and_then(|name| self.map.get(name).copied())
            .unwrap_or(x11rb::NONE);

        let data = [action as u32, first, second, 0, 0];
        match self.transport.send_to_wm(window, type_, data) {
            Ok(()) => true,
            Err(err) => {
                debug!("modify_net_wm_state: send failed: {}", err);
                false
            }
        }
    }
}
