//! Error types for the window manager

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WmError {
    /// The server could not report the window's geometry (it is usually gone)
    #[error("geometry of window 0x{0:x} is unavailable")]
    GeometryUnavailable(u32),

    /// SubstructureRedirect on the root is already held by another client
    #[error("another window manager is running")]
    AnotherWmRunning,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
