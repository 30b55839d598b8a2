use x11rb::protocol::xproto::Window;

/// Window geometry, relative to the parent (the root for managed windows)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Position shifted by a pointer delta, kept within the protocol's INT16 range
    pub fn translated(&self, dx: i32, dy: i32) -> (i32, i32) {
        let shift = |pos: i32, delta: i32| {
            pos.saturating_add(delta)
                .clamp(i32::from(i16::MIN), i32::from(i16::MAX))
        };
        (shift(self.x, dx), shift(self.y, dy))
    }

    /// Size grown by a pointer delta, between 1 and the protocol's CARD16 limit
    pub fn grown(&self, dx: i32, dy: i32) -> (u32, u32) {
        let grow = |size: u32, delta: i32| {
            (i64::from(size) + i64::from(delta)).clamp(1, i64::from(u16::MAX)) as u32
        };
        (grow(self.width, dx), grow(self.height, dy))
    }
}

/// Window manager client state
/// Represents a top-level window being managed by the WM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    /// X11 window ID
    pub id: Window,

    /// Last geometry requested by the WM (or reported when managed)
    pub geometry: Geometry,
}

impl Client {
    pub fn new(id: Window, geometry: Geometry) -> Self {
        Self { id, geometry }
    }
}
