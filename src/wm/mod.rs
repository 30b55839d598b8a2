//! Window Manager Module
//!
//! [`WindowManager`] is the single context object of the WM: it owns the
//! client registry, the focus state and the move/resize gesture, and is
//! driven one X event at a time by [`WindowManager::handle_event`].

pub mod client;
pub mod events;
pub mod focus;
pub mod moveresize;
pub mod registry;
pub mod stacking;
pub mod startup;
pub mod xconn;

use anyhow::Result;
use tracing::{debug, info, warn};
use x11rb::protocol::xproto::Window;

use crate::wm::client::Client;
use crate::wm::focus::{BorderColors, FocusManager};
use crate::wm::moveresize::{ButtonBindings, MoveResizeManager};
use crate::wm::registry::ClientList;
use crate::wm::xconn::XConn;

pub struct WindowManager<C: XConn> {
    conn: C,
    clients: ClientList,
    focus: FocusManager,
    moveresize: MoveResizeManager,
    bindings: ButtonBindings,
}

impl<C: XConn> WindowManager<C> {
    pub fn new(conn: C, bindings: ButtonBindings, colors: BorderColors) -> Self {
        Self {
            conn,
            clients: ClientList::new(),
            focus: FocusManager::new(colors),
            moveresize: MoveResizeManager::new(),
            bindings,
        }
    }

    #[cfg(test)]
    pub fn conn(&self) -> &C {
        &self.conn
    }

    #[cfg(test)]
    pub fn clients(&self) -> &ClientList {
        &self.clients
    }

    #[cfg(test)]
    pub fn moveresize(&self) -> &MoveResizeManager {
        &self.moveresize
    }

    /// Manage all viewable, non override-redirect children of the root and
    /// focus the last one managed.
    pub fn scan(&mut self) -> Result<()> {
        let children = self.conn.children(self.conn.root())?;
        info!("Scanning {} existing windows", children.len());

        for window in children {
            let Some(attrs) = self.conn.window_attributes(window)? else {
                continue;
            };
            if attrs.override_redirect || !attrs.viewable {
                debug!("Skipping existing window 0x{:x} ({:?})", window, attrs);
                continue;
            }
            if let Err(err) = self.manage(window) {
                warn!("Failed to manage existing window 0x{:x}: {:#}", window, err);
            }
        }

        if self.clients.is_empty() {
            info!("No existing windows to manage");
        } else {
            info!("Managing {} windows", self.clients.len());
        }
        let head = self.clients.head().map(|c| c.id);
        self.focus(head)
    }

    pub fn manage(&mut self, window: Window) -> Result<&Client> {
        self.clients.manage(&self.conn, &self.bindings, window)
    }

    pub fn find(&self, window: Window) -> Option<&Client> {
        self.clients.find(window)
    }

    /// The focused window, if any
    pub fn current(&self) -> Option<&Client> {
        self.clients.current()
    }

    /// Forget `window`. Focus moves to the root if it had focus, and a
    /// gesture on it (or relying on its focus) is ended.
    pub fn unmanage(&mut self, window: Window) -> Result<()> {
        if !self.clients.contains(window) {
            warn!("Unmanage of unknown window 0x{:x}", window);
            return Ok(());
        }
        debug!("Unmanaging window 0x{:x}", window);

        let was_focused = self.clients.focused_id() == Some(window);
        let gesture = if was_focused {
            self.moveresize.stop(&self.conn)
        } else {
            self.moveresize.release_window(&self.conn, window)
        };
        let refocus = if was_focused {
            self.focus.set_focus(&self.conn, &mut self.clients, None)
        } else {
            Ok(())
        };

        self.clients.remove(window);
        gesture.and(refocus)
    }

    /// Release every managed window; used on shutdown
    pub fn unmanage_all(&mut self) {
        let windows: Vec<Window> = self.clients.ids().collect();
        for window in windows {
            if let Err(err) = self.unmanage(window) {
                debug!("Error releasing window 0x{:x}: {:#}", window, err);
            }
        }
    }

    /// Focus `target` (the root when `None`). A gesture on a window that
    /// loses focus is ended.
    pub fn focus(&mut self, target: Option<Window>) -> Result<()> {
        self.focus.set_focus(&self.conn, &mut self.clients, target)?;

        let focused = self.current().map(|c| c.id);
        match self.moveresize.window() {
            Some(window) if Some(window) != focused => {
                debug!("Focus left 0x{:x}, ending gesture", window);
                self.moveresize.stop(&self.conn)
            }
            _ => Ok(()),
        }
    }

    pub fn raise(&self, window: Window) -> Result<()> {
        stacking::raise_window(&self.conn, window)
    }

    /// Kill the client owning `window` (no WM_DELETE_WINDOW negotiation)
    pub fn close(&self, window: Window) -> Result<()> {
        debug!("Closing window 0x{:x}", window);
        self.conn.kill_client(window)
    }
}
