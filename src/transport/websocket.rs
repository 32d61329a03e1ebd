use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use log::debug;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::WebSocketStream;

use crate::connection::{Connection, ConnectionId, Liveness, TransportKind};
use crate::transport::FrameReader;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

/// One text frame per WebSocket message.
pub struct WsConnection {
    id: ConnectionId,
    peer: String,
    live: Arc<Liveness>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl WsConnection {
    /// Complete the WebSocket handshake on `stream`, spawn the writer task and
    /// return both halves.
    pub async fn accept(
        id: ConnectionId,
        stream: TcpStream,
        max_frame_len: usize,
    ) -> anyhow::Result<(Arc<WsConnection>, WsFrames)> {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let socket = tokio_tungstenite::accept_async(stream)
            .await
            .with_context(|| format!("WebSocket handshake with {} failed", peer))?;
        let (sink, source) = socket.split();
        let live = Arc::new(Liveness::new());
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(write_loop(id, sink, rx, live.clone()));

        let conn = Arc::new(WsConnection {
            id,
            peer,
            live: live.clone(),
            outbound: Mutex::new(Some(tx)),
        });
        let frames = WsFrames {
            source,
            live,
            max_frame_len,
        };
        Ok((conn, frames))
    }
}

async fn write_loop(
    id: ConnectionId,
    mut sink: WsSink,
    mut rx: mpsc::UnboundedReceiver<String>,
    live: Arc<Liveness>,
) {
    while let Some(text) = rx.recv().await {
        if let Err(e) = sink.send(Message::text(text)).await {
            debug!("Write to {} failed: {}", id, e);
            live.kill();
            break;
        }
    }
    let _ = sink.close().await;
}

impl Connection for WsConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer(&self) -> &str {
        &self.peer
    }

    fn kind(&self) -> TransportKind {
        TransportKind::WebSocket
    }

    fn send(&self, text: &str) {
        if !self.live.is_live() {
            return;
        }
        let outbound = self.outbound.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = outbound.as_ref() {
            let _ = tx.send(text.to_string());
        }
    }

    fn close(&self) -> bool {
        let closed = self.live.kill();
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        closed
    }

    fn is_live(&self) -> bool {
        self.live.is_live()
    }
}

/// Reading half of a [`WsConnection`].
pub struct WsFrames {
    source: WsSource,
    live: Arc<Liveness>,
    max_frame_len: usize,
}

impl WsFrames {
    fn frame(&self, text: &str) -> anyhow::Result<Option<String>> {
        if text.len() > self.max_frame_len {
            anyhow::bail!("Frame too large (max: {} bytes)", self.max_frame_len);
        }
        Ok(Some(text.trim_end_matches(['\r', '\n']).to_string()))
    }
}

#[async_trait::async_trait]
impl FrameReader for WsFrames {
    async fn recv_frame(&mut self) -> anyhow::Result<Option<String>> {
        loop {
            let live = self.live.clone();
            let next = tokio::select! {
                _ = live.closed() => return Ok(None),
                next = self.source.next() => next,
            };
            match next {
                None => return Ok(None),
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => return Ok(None),
                Some(Err(e)) => return Err(anyhow::anyhow!("WebSocket error: {}", e)),
                Some(Ok(Message::Text(text))) => return self.frame(text.as_str()),
                Some(Ok(Message::Binary(bytes))) => {
                    return self.frame(&String::from_utf8_lossy(&bytes));
                }
                Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
            }
        }
    }
}
