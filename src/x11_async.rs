//! X11 Event Stream
//!
//! Lets the event loop sleep until the X connection has data. A blocking
//! helper task polls the connection's socket with mio and wakes the loop
//! through a [`Notify`]; reading and handling events stays on the loop.

use anyhow::{Context, Result};
use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Notify};
use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::errors::ConnectionError;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

const X11_TOKEN: mio::Token = mio::Token(0);

/// How often the poller checks whether the stream was dropped
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

pub struct X11EventStream {
    conn: Arc<RustConnection>,
    readable: Arc<Notify>,
    /// Dropping this stops the poller
    _shutdown: oneshot::Receiver<()>,
}

impl X11EventStream {
    /// Start watching the connection's socket. Must be called inside a tokio runtime.
    pub fn new(conn: Arc<RustConnection>) -> Result<Self> {
        let fd = conn.stream().as_raw_fd();
        let readable = Arc::new(Notify::new());
        let notify = readable.clone();
        let (guard, shutdown) = oneshot::channel::<()>();

        let mut poll = mio::Poll::new().context("Failed to create mio Poll")?;
        poll.registry()
            .register(&mut mio::unix::SourceFd(&fd), X11_TOKEN, mio::Interest::READABLE)
            .context("Failed to register X11 socket with mio")?;

        tokio::task::spawn_blocking(move || {
            let mut events = mio::Events::with_capacity(1);
            while !guard.is_closed() {
                if let Err(err) = poll.poll(&mut events, Some(POLL_TIMEOUT)) {
                    warn!("X11 socket poll failed: {:?}", err);
                    continue;
                }
                if events.iter().any(|event| event.token() == X11_TOKEN) {
                    notify.notify_one();
                }
            }
            debug!("X11 socket poller stopped");
        });

        Ok(Self {
            conn,
            readable,
            _shutdown: shutdown,
        })
    }

    /// Next queued event without blocking. An error means the connection is gone.
    pub fn poll_next_event(&self) -> Result<Option<Event>, ConnectionError> {
        self.conn.poll_for_event()
    }

    /// Wait until the socket has become readable
    pub async fn wait_readable(&self) {
        self.readable.notified().await;
    }

    pub fn flush(&self) -> Result<(), ConnectionError> {
        self.conn.flush()
    }
}
