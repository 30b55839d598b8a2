//! Events Module
//!
//! Routes X events to the window manager handlers. Every handled event is
//! followed by a flush, so the requests it produced reach the server as one
//! batch.

use anyhow::Result;
use tracing::{debug, trace, warn};
use x11rb::protocol::xproto::*;
use x11rb::protocol::{ErrorKind, Event};
use x11rb::x11_utils::X11Error;

use crate::wm::moveresize::{ButtonRole, MoveResizeOperation};
use crate::wm::xconn::XConn;
use crate::wm::WindowManager;

/// Errors caused by racing a client that destroyed or unmapped its window
/// right after we sent a request for it.
pub fn is_benign_error(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::Window)
}

/// The fields of a ConfigureRequest that are forwarded to the server.
/// Border width stays under WM control.
pub fn requested_changes(e: &ConfigureRequestEvent) -> ConfigureWindowAux {
    let mut aux = ConfigureWindowAux::from_configure_request(e);
    aux.border_width = None;
    aux
}

impl<C: XConn> WindowManager<C> {
    /// Handle one event from the server
    pub fn handle_event(&mut self, event: Event) -> Result<()> {
        let handled = match event {
            Event::Error(err) => {
                self.handle_error(&err);
                return Ok(());
            }
            Event::MapRequest(e) => self.handle_map_request(&e),
            Event::UnmapNotify(e) => self.handle_unmap_notify(&e),
            Event::DestroyNotify(e) => self.handle_destroy_notify(&e),
            Event::ConfigureRequest(e) => self.handle_configure_request(&e),
            Event::ButtonPress(e) => self.handle_button_press(&e),
            Event::ButtonRelease(e) => self.handle_button_release(&e),
            Event::MotionNotify(e) => self.handle_motion_notify(&e),
            other => {
                trace!("Ignoring event {:?}", other);
                Ok(())
            }
        };

        let flushed = self.conn.flush();
        handled.and(flushed)
    }

    fn handle_error(&self, err: &X11Error) {
        if is_benign_error(err.error_kind) {
            trace!("Ignoring BadWindow (window already gone): {:?}", err);
            return;
        }
        warn!(
            "X protocol error: request={}, error={:?}",
            err.request_name.unwrap_or("unknown"),
            err.error_kind
        );
    }

    fn handle_map_request(&mut self, e: &MapRequestEvent) -> Result<()> {
        debug!("MapRequest on 0x{:x}", e.window);

        let manageable = self
            .conn
            .window_attributes(e.window)?
            .is_some_and(|attrs| !attrs.override_redirect);

        if manageable {
            match self.manage(e.window) {
                Ok(_) => {
                    self.conn.map_window(e.window)?;
                    return self.focus(Some(e.window));
                }
                Err(err) => debug!("Mapping 0x{:x} unmanaged: {:#}", e.window, err),
            }
        }

        // Still map it so the user can reach the window
        self.conn.map_window(e.window)
    }

    fn handle_unmap_notify(&mut self, e: &UnmapNotifyEvent) -> Result<()> {
        debug!("UnmapNotify on 0x{:x}", e.window);
        if self.find(e.window).is_some() {
            self.unmanage(e.window)?;
        }
        Ok(())
    }

    fn handle_destroy_notify(&mut self, e: &DestroyNotifyEvent) -> Result<()> {
        debug!("DestroyNotify on 0x{:x}", e.window);
        if self.find(e.window).is_some() {
            self.unmanage(e.window)?;
        }
        Ok(())
    }

    fn handle_configure_request(&mut self, e: &ConfigureRequestEvent) -> Result<()> {
        debug!("ConfigureRequest on 0x{:x}", e.window);
        let aux = requested_changes(e);
        self.clients.record_configure(e.window, &aux);
        self.conn.configure_window(e.window, &aux)
    }

    fn handle_button_press(&mut self, e: &ButtonPressEvent) -> Result<()> {
        let state = u16::from(e.state);
        debug!(
            "ButtonPress on 0x{:x}, modifier={:x}, button={}",
            e.event, state, e.detail
        );

        if self.find(e.event).is_some() {
            self.raise(e.event)?;
            self.focus(Some(e.event))?;

            if self.bindings.modifier_held(state) {
                let operation = match self.bindings.role(e.detail) {
                    Some(ButtonRole::Move) => Some(MoveResizeOperation::Move),
                    Some(ButtonRole::Resize) => Some(MoveResizeOperation::Resize),
                    Some(ButtonRole::Close) => {
                        self.close(e.event)?;
                        None
                    }
                    None => None,
                };
                if let Some(operation) = operation {
                    self.moveresize
                        .start(&self.conn, e.event, operation, e.root_x, e.root_y)?;
                }
            }
        }

        // Thaw the pointer and hand the press to the application as well
        self.conn.replay_pointer()
    }

    fn handle_button_release(&mut self, e: &ButtonReleaseEvent) -> Result<()> {
        debug!("ButtonRelease on 0x{:x}", e.event);
        if self.moveresize.is_active() {
            self.moveresize.stop(&self.conn)?;
        }
        Ok(())
    }

    fn handle_motion_notify(&mut self, e: &MotionNotifyEvent) -> Result<()> {
        self.moveresize
            .handle_motion(&self.conn, &mut self.clients, e.root_x, e.root_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::client::Geometry;
    use crate::wm::focus::BorderColors;
    use crate::wm::moveresize::ButtonBindings;
    use crate::wm::xconn::testing::{FakeConn, Request, ROOT};
    use crate::wm::xconn::WindowAttrs;

    const COLORS: BorderColors = BorderColors {
        active: 0x0000ff,
        inactive: 0x202020,
    };

    const A: Window = 0x600001;
    const B: Window = 0x600002;

    fn mod1() -> u16 {
        u16::from(ModMask::M1)
    }

    fn wm_with(conn: FakeConn) -> WindowManager<FakeConn> {
        WindowManager::new(conn, ButtonBindings::default(), COLORS)
    }

    fn managed(window: Window, geometry: Geometry) -> WindowManager<FakeConn> {
        let mut wm = wm_with(FakeConn::new().with_window(window, geometry));
        wm.handle_event(map_request(window)).unwrap();
        wm.conn().take_requests();
        wm
    }

    fn map_request(window: Window) -> Event {
        Event::MapRequest(MapRequestEvent {
            response_type: MAP_REQUEST_EVENT,
            sequence: 0,
            parent: ROOT,
            window,
        })
    }

    fn unmap_notify(window: Window) -> Event {
        Event::UnmapNotify(UnmapNotifyEvent {
            response_type: UNMAP_NOTIFY_EVENT,
            sequence: 0,
            event: ROOT,
            window,
            from_configure: false,
        })
    }

    fn destroy_notify(window: Window) -> Event {
        Event::DestroyNotify(DestroyNotifyEvent {
            response_type: DESTROY_NOTIFY_EVENT,
            sequence: 0,
            event: ROOT,
            window,
        })
    }

    fn pointer_event(window: Window, button: u8, state: u16, x: i16, y: i16) -> ButtonPressEvent {
        ButtonPressEvent {
            response_type: BUTTON_PRESS_EVENT,
            detail: button,
            sequence: 0,
            time: 0,
            root: ROOT,
            event: window,
            child: x11rb::NONE,
            root_x: x,
            root_y: y,
            event_x: x,
            event_y: y,
            state: KeyButMask::from(state),
            same_screen: true,
        }
    }

    fn press(window: Window, button: u8, state: u16, x: i16, y: i16) -> Event {
        Event::ButtonPress(pointer_event(window, button, state, x, y))
    }

    fn release(window: Window, button: u8, x: i16, y: i16) -> Event {
        let mut e = pointer_event(window, button, mod1(), x, y);
        e.response_type = BUTTON_RELEASE_EVENT;
        Event::ButtonRelease(e)
    }

    fn motion(window: Window, x: i16, y: i16) -> Event {
        Event::MotionNotify(MotionNotifyEvent {
            response_type: MOTION_NOTIFY_EVENT,
            detail: Motion::NORMAL,
            sequence: 0,
            time: 0,
            root: ROOT,
            event: window,
            child: x11rb::NONE,
            root_x: x,
            root_y: y,
            event_x: x,
            event_y: y,
            state: KeyButMask::from(mod1()),
            same_screen: true,
        })
    }

    fn assert_grab_invariant(wm: &WindowManager<FakeConn>) {
        if wm.moveresize().is_active() {
            assert!(wm.current().is_some(), "gesture active without focus");
        }
    }

    #[test]
    fn test_map_request_manages_maps_and_focuses() {
        let geom = Geometry::new(3, 4, 300, 200);
        let mut wm = wm_with(FakeConn::new().with_window(A, geom));

        wm.handle_event(map_request(A)).unwrap();

        assert_eq!(wm.find(A).unwrap().geometry, geom);
        assert_eq!(wm.current().map(|c| c.id), Some(A));
        let requests = wm.conn().requests();
        let tail = &requests[requests.len() - 4..];
        assert_eq!(
            tail,
            &[
                Request::Map(A),
                Request::BorderPixel(A, COLORS.active),
                Request::InputFocus(A),
                Request::Flush,
            ]
        );
    }

    #[test]
    fn test_map_request_override_redirect_maps_untracked() {
        let conn = FakeConn::new().with_window(A, Geometry::new(0, 0, 10, 10)).with_attrs(
            A,
            WindowAttrs {
                override_redirect: true,
                viewable: false,
            },
        );
        let mut wm = wm_with(conn);

        wm.handle_event(map_request(A)).unwrap();

        assert!(wm.clients().is_empty());
        assert_eq!(wm.conn().requests(), vec![Request::Map(A), Request::Flush]);
    }

    #[test]
    fn test_map_request_without_geometry_maps_untracked() {
        let conn = FakeConn::new().with_attrs(
            A,
            WindowAttrs {
                override_redirect: false,
                viewable: false,
            },
        );
        let mut wm = wm_with(conn);

        wm.handle_event(map_request(A)).unwrap();

        assert!(wm.find(A).is_none());
        assert_eq!(wm.conn().requests(), vec![Request::Map(A), Request::Flush]);
    }

    #[test]
    fn test_map_request_for_vanished_window_still_maps() {
        let mut wm = wm_with(FakeConn::new());

        wm.handle_event(map_request(A)).unwrap();

        assert!(wm.clients().is_empty());
        assert_eq!(wm.conn().requests(), vec![Request::Map(A), Request::Flush]);
    }

    #[test]
    fn test_unmap_of_focused_window_unfocuses() {
        let mut wm = managed(A, Geometry::new(0, 0, 100, 100));
        assert_eq!(wm.current().map(|c| c.id), Some(A));

        wm.handle_event(unmap_notify(A)).unwrap();

        assert!(wm.find(A).is_none());
        assert!(wm.current().is_none());
        assert!(wm.conn().requests().contains(&Request::InputFocus(ROOT)));
    }

    #[test]
    fn test_destroy_of_unknown_window_is_noop() {
        let mut wm = managed(A, Geometry::new(0, 0, 100, 100));

        wm.handle_event(destroy_notify(B)).unwrap();

        assert!(wm.find(A).is_some());
        assert_eq!(wm.conn().requests(), vec![Request::Flush]);
    }

    #[test]
    fn test_configure_request_forwarded_without_border_width() {
        let mut wm = managed(A, Geometry::new(0, 0, 100, 100));
        let event = ConfigureRequestEvent {
            response_type: CONFIGURE_REQUEST_EVENT,
            stack_mode: StackMode::BELOW,
            sequence: 0,
            parent: ROOT,
            window: A,
            sibling: B,
            x: -10,
            y: 99,
            width: 640,
            height: 480,
            border_width: 7,
            value_mask: ConfigWindow::X
                | ConfigWindow::WIDTH
                | ConfigWindow::BORDER_WIDTH
                | ConfigWindow::SIBLING
                | ConfigWindow::STACK_MODE,
        };

        wm.handle_event(Event::ConfigureRequest(event)).unwrap();

        let expected = ConfigureWindowAux::new()
            .x(-10)
            .width(640)
            .sibling(B)
            .stack_mode(StackMode::BELOW);
        assert_eq!(
            wm.conn().requests(),
            vec![Request::Configure(A, expected), Request::Flush]
        );
        assert_eq!(wm.find(A).unwrap().geometry, Geometry::new(-10, 0, 640, 100));
    }

    #[test]
    fn test_plain_click_raises_focuses_and_replays() {
        let conn = FakeConn::new()
            .with_window(A, Geometry::new(0, 0, 100, 100))
            .with_window(B, Geometry::new(50, 50, 100, 100));
        let mut wm = wm_with(conn);
        wm.handle_event(map_request(A)).unwrap();
        wm.handle_event(map_request(B)).unwrap();
        assert_eq!(wm.current().map(|c| c.id), Some(B));
        wm.conn().take_requests();

        wm.handle_event(press(A, 1, 0, 5, 5)).unwrap();

        assert!(!wm.moveresize().is_active());
        assert_eq!(wm.current().map(|c| c.id), Some(A));
        assert_eq!(
            wm.conn().requests(),
            vec![
                Request::Configure(A, ConfigureWindowAux::new().stack_mode(StackMode::ABOVE)),
                Request::BorderPixel(B, COLORS.inactive),
                Request::BorderPixel(A, COLORS.active),
                Request::InputFocus(A),
                Request::ReplayPointer,
                Request::Flush,
            ]
        );
    }

    #[test]
    fn test_press_on_unmanaged_window_only_replays() {
        let mut wm = managed(A, Geometry::new(0, 0, 100, 100));

        wm.handle_event(press(B, 1, mod1(), 5, 5)).unwrap();

        assert!(!wm.moveresize().is_active());
        assert_eq!(
            wm.conn().requests(),
            vec![Request::ReplayPointer, Request::Flush]
        );
    }

    #[test]
    fn test_move_gesture() {
        let mut wm = managed(A, Geometry::new(0, 0, 100, 100));

        wm.handle_event(press(A, 1, mod1(), 50, 50)).unwrap();
        let state = *wm.moveresize().state().unwrap();
        assert_eq!(state.operation, MoveResizeOperation::Move);
        assert_eq!((state.anchor_x, state.anchor_y), (50, 50));
        assert_grab_invariant(&wm);

        wm.handle_event(motion(A, 70, 80)).unwrap();
        assert_eq!(wm.find(A).unwrap().geometry, Geometry::new(20, 30, 100, 100));
        let state = *wm.moveresize().state().unwrap();
        assert_eq!((state.anchor_x, state.anchor_y), (70, 80));
        assert_grab_invariant(&wm);

        wm.handle_event(release(A, 1, 70, 80)).unwrap();
        assert_eq!(wm.moveresize().operation(), None);
        assert_eq!(wm.find(A).unwrap().geometry, Geometry::new(20, 30, 100, 100));
        assert!(wm.conn().requests().contains(&Request::UngrabPointer));
    }

    #[test]
    fn test_resize_gesture() {
        let mut wm = managed(B, Geometry::new(10, 10, 200, 150));

        wm.handle_event(press(B, 3, mod1(), 210, 160)).unwrap();
        assert_eq!(wm.moveresize().operation(), Some(MoveResizeOperation::Resize));

        wm.handle_event(motion(B, 250, 200)).unwrap();
        assert_eq!(wm.find(B).unwrap().geometry, Geometry::new(10, 10, 240, 190));
        assert!(wm.conn().requests().contains(&Request::Configure(
            B,
            ConfigureWindowAux::new().width(240).height(190)
        )));
    }

    #[test]
    fn test_close_gesture_kills_without_grab() {
        let mut wm = managed(A, Geometry::new(0, 0, 100, 100));

        wm.handle_event(press(A, 2, mod1(), 1, 1)).unwrap();

        assert_eq!(wm.moveresize().operation(), None);
        let requests = wm.conn().requests();
        assert!(requests.contains(&Request::KillClient(A)));
        assert!(!requests.contains(&Request::GrabPointer));
        assert!(requests.contains(&Request::ReplayPointer));
    }

    #[test]
    fn test_unassigned_button_with_modifier_does_nothing() {
        let mut wm = managed(A, Geometry::new(0, 0, 100, 100));

        wm.handle_event(press(A, 4, mod1(), 1, 1)).unwrap();

        let requests = wm.conn().requests();
        assert_eq!(wm.moveresize().operation(), None);
        assert!(!requests.contains(&Request::KillClient(A)));
        assert!(!requests.contains(&Request::GrabPointer));
    }

    #[test]
    fn test_caps_lock_does_not_block_gestures() {
        let mut wm = managed(A, Geometry::new(0, 0, 100, 100));
        let state = mod1() | u16::from(ModMask::LOCK);

        wm.handle_event(press(A, 1, state, 0, 0)).unwrap();

        assert_eq!(wm.moveresize().operation(), Some(MoveResizeOperation::Move));
    }

    #[test]
    fn test_destroy_mid_drag_ends_gesture() {
        let mut wm = managed(A, Geometry::new(0, 0, 100, 100));
        wm.handle_event(press(A, 1, mod1(), 50, 50)).unwrap();

        wm.handle_event(destroy_notify(A)).unwrap();
        assert!(!wm.moveresize().is_active());
        assert_grab_invariant(&wm);

        wm.conn().take_requests();
        wm.handle_event(motion(A, 90, 90)).unwrap();
        assert_eq!(wm.conn().requests(), vec![Request::Flush]);
    }

    #[test]
    fn test_release_without_gesture_is_noop() {
        let mut wm = managed(A, Geometry::new(0, 0, 100, 100));

        wm.handle_event(release(A, 1, 0, 0)).unwrap();

        assert_eq!(wm.conn().requests(), vec![Request::Flush]);
    }

    #[test]
    fn test_unrecognized_event_only_flushes() {
        let mut wm = managed(A, Geometry::new(0, 0, 100, 100));
        let event = Event::MapNotify(MapNotifyEvent {
            response_type: MAP_NOTIFY_EVENT,
            sequence: 0,
            event: ROOT,
            window: A,
            override_redirect: false,
        });

        wm.handle_event(event).unwrap();

        assert_eq!(wm.conn().requests(), vec![Request::Flush]);
    }

    #[test]
    fn test_map_request_during_drag_ends_gesture() {
        let conn = FakeConn::new()
            .with_window(A, Geometry::new(0, 0, 100, 100))
            .with_window(B, Geometry::new(300, 300, 100, 100));
        let mut wm = wm_with(conn);
        wm.handle_event(map_request(A)).unwrap();
        wm.handle_event(press(A, 1, mod1(), 50, 50)).unwrap();
        assert!(wm.moveresize().is_active());

        wm.handle_event(map_request(B)).unwrap();
        assert_eq!(wm.current().map(|c| c.id), Some(B));
        assert!(!wm.moveresize().is_active());
        assert!(wm.conn().requests().contains(&Request::UngrabPointer));
        assert_grab_invariant(&wm);

        wm.handle_event(motion(A, 70, 80)).unwrap();
        assert_eq!(wm.find(A).unwrap().geometry, Geometry::new(0, 0, 100, 100));
        assert_eq!(wm.find(B).unwrap().geometry, Geometry::new(300, 300, 100, 100));
    }

    fn x11_error(kind: ErrorKind) -> Event {
        Event::Error(X11Error {
            error_kind: kind,
            error_code: 0,
            sequence: 0,
            bad_value: A,
            minor_opcode: 0,
            major_opcode: 12,
            extension_name: None,
            request_name: Some("ConfigureWindow"),
        })
    }

    #[test]
    fn test_error_events_send_nothing() {
        let mut wm = managed(A, Geometry::new(0, 0, 100, 100));

        wm.handle_event(x11_error(ErrorKind::Window)).unwrap();
        wm.handle_event(x11_error(ErrorKind::Match)).unwrap();

        assert!(wm.conn().requests().is_empty());
        assert!(wm.find(A).is_some());
    }

    #[test]
    fn test_bad_window_is_benign() {
        assert!(is_benign_error(ErrorKind::Window));
        assert!(!is_benign_error(ErrorKind::Match));
        assert!(!is_benign_error(ErrorKind::Value));
    }
}
