//! Transports: each accepted peer becomes a [`Connection`] for the
//! coordinator plus a [`FrameReader`] driven by [`drive`].

use std::sync::Arc;

use log::{debug, warn};

use crate::connection::Connection;
use crate::session::SessionCoordinator;

pub mod in_memory;
pub mod tcp;
pub mod websocket;

/// Inbound half of a transport.
#[async_trait::async_trait]
pub trait FrameReader: Send {
    /// Next complete frame, or `None` once the peer is gone or the
    /// connection was closed locally.
    async fn recv_frame(&mut self) -> anyhow::Result<Option<String>>;
}

/// Register `conn` with the coordinator and feed it frames until the peer
/// goes away. The coordinator hears about the departure exactly once.
pub async fn drive<R: FrameReader>(
    coordinator: SessionCoordinator,
    conn: Arc<dyn Connection>,
    mut reader: R,
) {
    let id = conn.id();
    if !coordinator.on_connect(conn.clone()) {
        return;
    }

    loop {
        match reader.recv_frame().await {
            Ok(Some(frame)) => {
                if frame.trim().is_empty() {
                    continue;
                }
                coordinator.handle_frame(id, &frame);
            }
            Ok(None) => {
                debug!("{} connection {} closed", conn.kind(), id);
                break;
            }
            Err(e) => {
                warn!("{} connection {} dropped: {}", conn.kind(), id, e);
                break;
            }
        }
        if !conn.is_live() {
            break;
        }
    }

    coordinator.on_disconnect(id);
    conn.close();
}
