//! MoveResize Module
//!
//! Handles interactive window moving and resizing driven by modifier +
//! mouse button gestures, and the passive button grabs that make those
//! gestures reach the WM before the application.

use anyhow::Result;
use tracing::{debug, warn};
use x11rb::protocol::xproto::{ButtonIndex, ModMask, Window};

use crate::config::{parse_modifier, BindingsConfig};
use crate::error::WmError;
use crate::wm::registry::ClientList;
use crate::wm::xconn::XConn;

/// What a button does when pressed with the modifier held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonRole {
    Move,
    Resize,
    Close,
}

/// Modifier and button assignments for window gestures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonBindings {
    pub modifier: ModMask,
    pub move_button: u8,
    pub resize_button: u8,
    pub close_button: u8,
}

impl ButtonBindings {
    pub fn from_config(config: &BindingsConfig) -> Result<Self, WmError> {
        let modifier = parse_modifier(&config.modifier).ok_or_else(|| {
            WmError::InvalidConfig(format!("unknown modifier {:?}", config.modifier))
        })?;
        Ok(Self {
            modifier,
            move_button: config.move_button,
            resize_button: config.resize_button,
            close_button: config.close_button,
        })
    }

    /// Role of `button`, if it has one
    pub fn role(&self, button: u8) -> Option<ButtonRole> {
        if button == self.move_button {
            Some(ButtonRole::Move)
        } else if button == self.resize_button {
            Some(ButtonRole::Resize)
        } else if button == self.close_button {
            Some(ButtonRole::Close)
        } else {
            None
        }
    }

    /// Whether the gesture modifier is part of an event's state mask
    pub fn modifier_held(&self, state: u16) -> bool {
        state & u16::from(self.modifier) != 0
    }

    /// Passively grab every gesture button on `window`, with and without the
    /// modifier, under both Caps Lock states.
    ///
    /// The bare grabs let a plain click focus and raise the window before the
    /// event is replayed to the application.
    pub fn grab_buttons<C: XConn>(&self, conn: &C, window: Window) -> Result<()> {
        for button in [self.move_button, self.resize_button, self.close_button] {
            for lock in [ModMask::from(0u16), ModMask::LOCK] {
                conn.grab_button(window, ButtonIndex::from(button), lock)?;
                conn.grab_button(window, ButtonIndex::from(button), self.modifier | lock)?;
            }
        }
        Ok(())
    }
}

impl Default for ButtonBindings {
    fn default() -> Self {
        Self {
            modifier: ModMask::M1,
            move_button: 1,
            resize_button: 3,
            close_button: 2,
        }
    }
}

/// Move/resize operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveResizeOperation {
    Move,
    Resize,
}

/// An in-progress gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveResizeState {
    /// Window being moved/resized
    pub window: Window,

    pub operation: MoveResizeOperation,

    /// Last pointer position seen, in root coordinates
    pub anchor_x: i16,
    pub anchor_y: i16,
}

/// Move/resize manager
#[derive(Debug, Default)]
pub struct MoveResizeManager {
    state: Option<MoveResizeState>,
}

impl MoveResizeManager {
    pub fn new() -> Self {
        Self { state: None }
    }

    #[cfg(test)]
    pub fn state(&self) -> Option<&MoveResizeState> {
        self.state.as_ref()
    }

    /// Current operation, `None` when no gesture is in progress
    #[cfg(test)]
    pub fn operation(&self) -> Option<MoveResizeOperation> {
        self.state.map(|s| s.operation)
    }

    /// Window the gesture is acting on
    pub fn window(&self) -> Option<Window> {
        self.state.map(|s| s.window)
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// Begin a gesture on `window` anchored at the press position and take
    /// an active pointer grab so motion is delivered wherever the pointer goes.
    pub fn start<C: XConn>(
        &mut self,
        conn: &C,
        window: Window,
        operation: MoveResizeOperation,
        root_x: i16,
        root_y: i16,
    ) -> Result<()> {
        debug!("Starting {:?} for window 0x{:x} at ({}, {})", operation, window, root_x, root_y);

        self.state = Some(MoveResizeState {
            window,
            operation,
            anchor_x: root_x,
            anchor_y: root_y,
        });

        if !conn.grab_pointer()? {
            warn!("Pointer grab refused, abandoning {:?} of window 0x{:x}", operation, window);
            self.state = None;
        }

        Ok(())
    }

    /// End the gesture, if any, and release the pointer
    pub fn stop<C: XConn>(&mut self, conn: &C) -> Result<()> {
        if let Some(state) = self.state.take() {
            debug!("Finished {:?} of window 0x{:x}", state.operation, state.window);
            conn.ungrab_pointer()?;
        }
        Ok(())
    }

    /// End the gesture if it targets `window`
    pub fn release_window<C: XConn>(&mut self, conn: &C, window: Window) -> Result<()> {
        match self.state {
            Some(state) if state.window == window => self.stop(conn),
            _ => Ok(()),
        }
    }

    /// Apply pointer motion to the grabbed window
    pub fn handle_motion<C: XConn>(
        &mut self,
        conn: &C,
        clients: &mut ClientList,
        root_x: i16,
        root_y: i16,
    ) -> Result<()> {
        let Some(state) = self.state else {
            return Ok(());
        };

        let Some(geometry) = clients.find(state.window).map(|c| c.geometry) else {
            warn!("Grabbed window 0x{:x} is no longer managed", state.window);
            return self.stop(conn);
        };

        let dx = i32::from(root_x) - i32::from(state.anchor_x);
        let dy = i32::from(root_y) - i32::from(state.anchor_y);

        match state.operation {
            MoveResizeOperation::Move => {
                let (x, y) = geometry.translated(dx, dy);
                clients.move_client(conn, state.window, x, y)?;
            }
            MoveResizeOperation::Resize => {
                let (width, height) = geometry.grown(dx, dy);
                clients.resize_client(conn, state.window, width, height)?;
            }
        }

        if let Some(s) = self.state.as_mut() {
            s.anchor_x = root_x;
            s.anchor_y = root_y;
        }

        Ok(())
    }
}
