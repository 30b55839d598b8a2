//! Focus Module
//!
//! Moves input focus between managed windows and keeps border colors in
//! step with it. Click-to-focus is the only policy.

use anyhow::Result;
use tracing::{debug, warn};
use x11rb::protocol::xproto::Window;

use crate::wm::registry::ClientList;
use crate::wm::xconn::XConn;

/// Border pixel values resolved at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BorderColors {
    pub active: u32,
    pub inactive: u32,
}

/// Focus manager
#[derive(Debug)]
pub struct FocusManager {
    colors: BorderColors,
}

impl FocusManager {
    pub fn new(colors: BorderColors) -> Self {
        Self { colors }
    }

    /// Focus `target`, or the root window (nobody) when `None`.
    ///
    /// Focusing the window that already has focus sends nothing.
    pub fn set_focus<C: XConn>(
        &self,
        conn: &C,
        clients: &mut ClientList,
        target: Option<Window>,
    ) -> Result<()> {
        if let Some(window) = target {
            if clients.focused_id() == Some(window) {
                return Ok(());
            }
            if !clients.contains(window) {
                warn!("Refusing to focus unmanaged window 0x{:x}", window);
                return Ok(());
            }
        }

        if let Some(previous) = clients.current().map(|c| c.id) {
            conn.set_border_pixel(previous, self.colors.inactive)?;
        }

        let to_focus = match target {
            Some(window) => {
                conn.set_border_pixel(window, self.colors.active)?;
                window
            }
            None => conn.root(),
        };
        clients.set_focused(target);

        debug!("Focus 0x{:x}", to_focus);
        conn.set_input_focus(to_focus)
    }
}
