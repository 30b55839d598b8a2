//! Client Registry Module
//!
//! Owns every managed window and the id of the focused one.

use anyhow::Result;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};
use x11rb::protocol::xproto::{ConfigureWindowAux, Window};

use crate::error::WmError;
use crate::wm::client::Client;
use crate::wm::moveresize::ButtonBindings;
use crate::wm::xconn::XConn;

/// Managed windows keyed by id, plus the order they were managed in
/// (most recent first).
#[derive(Debug, Default)]
pub struct ClientList {
    clients: HashMap<Window, Client>,
    order: VecDeque<Window>,
    focused: Option<Window>,
}

impl ClientList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `window` with the geometry the server reports for it.
    ///
    /// Fails with [`WmError::GeometryUnavailable`] if the server cannot report
    /// one; nothing is inserted in that case. Managing a window twice keeps
    /// its entry (and focus) and only refreshes the geometry.
    pub fn manage<C: XConn>(
        &mut self,
        conn: &C,
        bindings: &ButtonBindings,
        window: Window,
    ) -> Result<&Client> {
        debug!("Managing window 0x{:x}", window);

        let geometry = conn.geometry(window)?;

        let client = match self.clients.entry(window) {
            Entry::Occupied(entry) => {
                warn!("Window 0x{:x} is already managed", window);
                let client = entry.into_mut();
                if let Some(geometry) = geometry {
                    client.geometry = geometry;
                }
                client
            }
            Entry::Vacant(entry) => {
                let geometry = geometry.ok_or(WmError::GeometryUnavailable(window))?;
                bindings.grab_buttons(conn, window)?;
                self.order.push_front(window);
                entry.insert(Client::new(window, geometry))
            }
        };
        Ok(client)
    }

    /// Look up a managed window
    pub fn find(&self, window: Window) -> Option<&Client> {
        self.clients.get(&window)
    }

    pub fn contains(&self, window: Window) -> bool {
        self.clients.contains_key(&window)
    }

    /// Stop tracking `window`. Clears the focus id if it pointed there.
    pub fn remove(&mut self, window: Window) -> Option<Client> {
        let client = self.clients.remove(&window)?;
        self.order.retain(|&w| w != window);
        if self.focused == Some(window) {
            self.focused = None;
        }
        Some(client)
    }

    /// The focused window, resolved against the registry
    pub fn current(&self) -> Option<&Client> {
        self.focused.and_then(|id| self.clients.get(&id))
    }

    pub fn focused_id(&self) -> Option<Window> {
        self.focused
    }

    pub(crate) fn set_focused(&mut self, window: Option<Window>) {
        debug_assert!(window.is_none_or(|w| self.clients.contains_key(&w)));
        self.focused = window;
    }

    /// Most recently managed window
    pub fn head(&self) -> Option<&Client> {
        self.order.front().and_then(|id| self.clients.get(id))
    }

    /// Managed window ids, most recently managed first
    pub fn ids(&self) -> impl Iterator<Item = Window> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Move a managed window and record its new position
    pub fn move_client<C: XConn>(&mut self, conn: &C, window: Window, x: i32, y: i32) -> Result<()> {
        let Some(client) = self.clients.get_mut(&window) else {
            warn!("Cannot move unmanaged window 0x{:x}", window);
            return Ok(());
        };
        client.geometry.x = x;
        client.geometry.y = y;
        conn.configure_window(window, &ConfigureWindowAux::new().x(x).y(y))
    }

    /// Resize a managed window and record its new size
    pub fn resize_client<C: XConn>(
        &mut self,
        conn: &C,
        window: Window,
        width: u32,
        height: u32,
    ) -> Result<()> {
        let Some(client) = self.clients.get_mut(&window) else {
            warn!("Cannot resize unmanaged window 0x{:x}", window);
            return Ok(());
        };
        client.geometry.width = width;
        client.geometry.height = height;
        conn.configure_window(
            window,
            &ConfigureWindowAux::new().width(width).height(height),
        )
    }

    /// Track geometry a client configured on its own
    pub fn record_configure(&mut self, window: Window, aux: &ConfigureWindowAux) {
        if let Some(client) = self.clients.get_mut(&window) {
            let geom = &mut client.geometry;
            geom.x = aux.x.unwrap_or(geom.x);
            geom.y = aux.y.unwrap_or(geom.y);
            geom.width = aux.width.unwrap_or(geom.width);
            geom.height = aux.height.unwrap_or(geom.height);
        }
    }
}
