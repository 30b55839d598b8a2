//! Stacking Module
//!
//! The server owns the stacking order; the WM only issues restack requests.

use anyhow::Result;
use tracing::debug;
use x11rb::protocol::xproto::{ConfigureWindowAux, StackMode, Window};

use crate::wm::xconn::XConn;

/// Place `window` above all of its siblings
pub fn raise_window<C: XConn>(conn: &C, window: Window) -> Result<()> {
    debug!("Raising window 0x{:x}", window);
    conn.configure_window(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))
}
