use std::sync::{Arc, Mutex, PoisonError};

use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::connection::{Connection, ConnectionId, Liveness, TransportKind};
use crate::transport::FrameReader;

/// Newline-delimited text over a TCP stream.
pub struct TcpConnection {
    id: ConnectionId,
    peer: String,
    live: Arc<Liveness>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl TcpConnection {
    /// Split `stream`, spawn its writer task and return both halves.
    pub fn spawn(
        id: ConnectionId,
        stream: TcpStream,
        max_frame_len: usize,
    ) -> (Arc<TcpConnection>, TcpFrames) {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let (read_half, write_half) = stream.into_split();
        let live = Arc::new(Liveness::new());
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(write_loop(id, write_half, rx, live.clone()));

        let conn = Arc::new(TcpConnection {
            id,
            peer,
            live: live.clone(),
            outbound: Mutex::new(Some(tx)),
        });
        let frames = TcpFrames {
            reader: BufReader::new(read_half),
            live,
            max_frame_len,
            buf: Vec::new(),
        };
        (conn, frames)
    }
}

async fn write_loop(
    id: ConnectionId,
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<String>,
    live: Arc<Liveness>,
) {
    while let Some(mut line) = rx.recv().await {
        line.push('\n');
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            debug!("Write to {} failed: {}", id, e);
            live.kill();
            break;
        }
    }
    let _ = writer.shutdown().await;
}

impl Connection for TcpConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer(&self) -> &str {
        &self.peer
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Tcp
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
        // Dropping the sender lets the writer flush what is queued, then
        // shut the socket down.
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

/// Reading half of a [`TcpConnection`].
pub struct TcpFrames {
    reader: BufReader<OwnedReadHalf>,
    live: Arc<Liveness>,
    max_frame_len: usize,
    buf: Vec<u8>,
}

#[async_trait::async_trait]
impl FrameReader for TcpFrames {
    async fn recv_frame(&mut self) -> anyhow::Result<Option<String>> {
        let TcpFrames {
            reader,
            live,
            max_frame_len,
            buf,
        } = self;
        buf.clear();
        let limit = *max_frame_len as u64 + 1;

        let mut limited = (&mut *reader).take(limit);
        let read = tokio::select! {
            _ = live.closed() => return Ok(None),
            read = limited.read_until(b'\n', &mut *buf) => read,
        };
        let n = read.map_err(|e| {
            if e.kind() == std::io::ErrorKind::ConnectionReset {
                anyhow::anyhow!("Connection reset by peer")
            } else {
                anyhow::anyhow!("Read error: {}", e)
            }
        })?;
        if n == 0 {
            return Ok(None);
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        } else if buf.len() > *max_frame_len {
            return Err(anyhow::anyhow!(
                "Frame too large (max: {} bytes)",
                max_frame_len
            ));
        }
        Ok(Some(String::from_utf8_lossy(buf).into_owned()))
    }
}
