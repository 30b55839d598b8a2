//! Startup Module
//!
//! Claims the window manager role on the root window and resolves the
//! border colors. Both run once, before the event loop.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::errors::ReplyError;
use x11rb::protocol::xproto::*;

use crate::config::{parse_color, ColorConfig};
use crate::error::WmError;
use crate::wm::focus::BorderColors;

/// Select SubstructureRedirect on the root. Only one client may hold it, so
/// an X11 error here means another window manager is running.
pub fn become_wm<C: Connection>(conn: &C, root: Window) -> Result<()> {
    let mask = EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY;

    let cookie = conn
        .change_window_attributes(root, &ChangeWindowAttributesAux::new().event_mask(mask))
        .context("Failed to select events on root window")?;

    match cookie.check() {
        Ok(()) => {
            info!("Registered as window manager on root 0x{:x}", root);
            Ok(())
        }
        Err(ReplyError::X11Error(err)) => {
            debug!("Root event selection refused: {:?}", err.error_kind);
            Err(WmError::AnotherWmRunning.into())
        }
        Err(err) => Err(err).context("Failed to select events on root window"),
    }
}

/// Pixel value for a color string. Unparsable colors and failed
/// allocations fall back to pixel 0.
pub fn alloc_color<C: Connection>(conn: &C, colormap: Colormap, spec: &str) -> Result<u32> {
    let Some((red, green, blue)) = parse_color(spec) else {
        warn!("Cannot parse color {:?}, using pixel 0", spec);
        return Ok(0);
    };

    match conn.alloc_color(colormap, red, green, blue)?.reply() {
        Ok(reply) => {
            debug!("Allocated {} as pixel 0x{:x}", spec, reply.pixel);
            Ok(reply.pixel)
        }
        Err(ReplyError::X11Error(err)) => {
            warn!("Cannot allocate color {}: {:?}, using pixel 0", spec, err.error_kind);
            Ok(0)
        }
        Err(err) => Err(err.into()),
    }
}

pub fn border_colors<C: Connection>(
    conn: &C,
    colormap: Colormap,
    colors: &ColorConfig,
) -> Result<BorderColors> {
    Ok(BorderColors {
        active: alloc_color(conn, colormap, &colors.active)?,
        inactive: alloc_color(conn, colormap, &colors.inactive)?,
    })
}
