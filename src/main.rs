//! wm0
//!
//! A small stacking X11 window manager. Windows keep the geometry their
//! clients ask for; the user moves, resizes and closes them with a modifier
//! held and a mouse button.

mod config;
mod error;
mod wm;
mod x11_async;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use x11rb::connection::Connection;
use x11rb::rust_connection::RustConnection;

use wm::moveresize::ButtonBindings;
use wm::xconn::X11Conn;
use wm::WindowManager;
use x11_async::X11EventStream;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "wm0=info,warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting wm0");

    let config = config::Config::load().context("Failed to load configuration")?;
    let bindings = ButtonBindings::from_config(&config.bindings)?;

    let (conn, screen_num) = RustConnection::connect(None).context("cannot open display")?;
    let conn = Arc::new(conn);

    let screen = &conn.setup().roots[screen_num];
    let root = screen.root;
    let colormap = screen.default_colormap;
    info!(
        "Connected to X server, screen {} ({}x{}), root 0x{:x}",
        screen_num, screen.width_in_pixels, screen.height_in_pixels, root
    );

    wm::startup::become_wm(conn.as_ref(), root)?;
    let colors = wm::startup::border_colors(conn.as_ref(), colormap, &config.colors)?;

    let mut wm = WindowManager::new(X11Conn::new(conn.clone(), root), bindings, colors);
    wm.scan().context("Failed to scan existing windows")?;

    let stream = X11EventStream::new(conn)?;
    stream.flush()?;

    run(&mut wm, &stream).await;
    drop(stream);

    wm.unmanage_all();
    info!("Connection closed, exiting");
    Ok(())
}

/// Handle events until the connection goes away
async fn run(wm: &mut WindowManager<X11Conn>, stream: &X11EventStream) {
    info!("Entering event loop");
    loop {
        // Drain everything already queued (including events read while
        // waiting for replies) before sleeping on the socket.
        loop {
            match stream.poll_next_event() {
                Ok(Some(event)) => {
                    if let Err(e) = wm.handle_event(event) {
                        error!("Error handling event: {:#}", e);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    info!("X11 connection lost: {}", e);
                    return;
                }
            }
        }

        stream.wait_readable().await;
    }
}
