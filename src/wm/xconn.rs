//! X Connection Module
//!
//! Every request the window manager sends to the X server goes through the
//! [`XConn`] trait. [`X11Conn`] implements it on top of x11rb's
//! `RustConnection`; tests substitute a recording fake.

use anyhow::Result;
use std::sync::Arc;
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::errors::ReplyError;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

use crate::wm::client::Geometry;

/// The parts of GetWindowAttributes the WM decides on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAttrs {
    pub override_redirect: bool,
    pub viewable: bool,
}

/// Requests and queries issued by the window manager.
///
/// Queries return `Ok(None)` when the server answered with an X11 error
/// (typically the window is already gone); `Err` is reserved for a broken
/// connection. Requests without a reply are only queued until [`XConn::flush`].
pub trait XConn {
    /// Root window of the managed screen
    fn root(&self) -> Window;

    fn window_attributes(&self, window: Window) -> Result<Option<WindowAttrs>>;

    fn geometry(&self, window: Window) -> Result<Option<Geometry>>;

    /// Children of `window`, bottom-most first
    fn children(&self, window: Window) -> Result<Vec<Window>>;

    fn map_window(&self, window: Window) -> Result<()>;

    fn configure_window(&self, window: Window, aux: &ConfigureWindowAux) -> Result<()>;

    fn set_border_pixel(&self, window: Window, pixel: u32) -> Result<()>;

    fn set_input_focus(&self, window: Window) -> Result<()>;

    /// Force the owner of `window` to disconnect
    fn kill_client(&self, window: Window) -> Result<()>;

    /// Passive grab of `button` + `modifiers` on `window` (pointer frozen until replayed)
    fn grab_button(&self, window: Window, button: ButtonIndex, modifiers: ModMask) -> Result<()>;

    /// Active pointer grab on the root for motion and release.
    /// Returns false when the server refused the grab.
    fn grab_pointer(&self) -> Result<bool>;

    fn ungrab_pointer(&self) -> Result<()>;

    /// Release a frozen pointer and replay the event to the client
    fn replay_pointer(&self) -> Result<()>;

    fn flush(&self) -> Result<()>;
}

/// [`XConn`] backed by a live X server connection
pub struct X11Conn {
    conn: Arc<RustConnection>,
    root: Window,
}

impl X11Conn {
    pub fn new(conn: Arc<RustConnection>, root: Window) -> Self {
        Self { conn, root }
    }
}

impl XConn for X11Conn {
    fn root(&self) -> Window {
        self.root
    }

    fn window_attributes(&self, window: Window) -> Result<Option<WindowAttrs>> {
        match self.conn.get_window_attributes(window)?.reply() {
            Ok(reply) => Ok(Some(WindowAttrs {
                override_redirect: reply.override_redirect,
                viewable: reply.map_state == MapState::VIEWABLE,
            })),
            Err(ReplyError::X11Error(err)) => {
                debug!("GetWindowAttributes on 0x{:x} failed: {:?}", window, err.error_kind);
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn geometry(&self, window: Window) -> Result<Option<Geometry>> {
        match self.conn.get_geometry(window)?.reply() {
            Ok(reply) => Ok(Some(Geometry::new(
                reply.x.into(),
                reply.y.into(),
                reply.width.into(),
                reply.height.into(),
            ))),
            Err(ReplyError::X11Error(err)) => {
                debug!("GetGeometry on 0x{:x} failed: {:?}", window, err.error_kind);
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn children(&self, window: Window) -> Result<Vec<Window>> {
        Ok(self.conn.query_tree(window)?.reply()?.children)
    }

    fn map_window(&self, window: Window) -> Result<()> {
        self.conn.map_window(window)?;
        Ok(())
    }

    fn configure_window(&self, window: Window, aux: &ConfigureWindowAux) -> Result<()> {
        self.conn.configure_window(window, aux)?;
        Ok(())
    }

    fn set_border_pixel(&self, window: Window, pixel: u32) -> Result<()> {
        self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new().border_pixel(pixel),
        )?;
        Ok(())
    }

    fn set_input_focus(&self, window: Window) -> Result<()> {
        self.conn
            .set_input_focus(InputFocus::PARENT, window, x11rb::CURRENT_TIME)?;
        Ok(())
    }

    fn kill_client(&self, window: Window) -> Result<()> {
        self.conn.kill_client(window)?;
        Ok(())
    }

    fn grab_button(&self, window: Window, button: ButtonIndex, modifiers: ModMask) -> Result<()> {
        self.conn.grab_button(
            false,
            window,
            EventMask::BUTTON_PRESS,
            GrabMode::SYNC,
            GrabMode::ASYNC,
            x11rb::NONE,
            x11rb::NONE,
            button,
            modifiers,
        )?;
        Ok(())
    }

    fn grab_pointer(&self) -> Result<bool> {
        let cookie = self.conn.grab_pointer(
            false,
            self.root,
            EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION,
            GrabMode::ASYNC,
            GrabMode::ASYNC,
            self.root,
            x11rb::NONE,
            x11rb::CURRENT_TIME,
        )?;
        match cookie.reply() {
            Ok(reply) => Ok(reply.status == GrabStatus::SUCCESS),
            Err(ReplyError::X11Error(err)) => {
                debug!("GrabPointer failed: {:?}", err.error_kind);
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn ungrab_pointer(&self) -> Result<()> {
        self.conn.ungrab_pointer(x11rb::CURRENT_TIME)?;
        Ok(())
    }

    fn replay_pointer(&self) -> Result<()> {
        self.conn
            .allow_events(Allow::REPLAY_POINTER, x11rb::CURRENT_TIME)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }
}
