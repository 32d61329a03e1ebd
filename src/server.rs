//! Listeners for both transports, feeding one coordinator.

use std::net::SocketAddr;

use anyhow::Context;
use log::{info, warn};
use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::session::SessionCoordinator;
use crate::transport::tcp::TcpConnection;
use crate::transport::websocket::WsConnection;
use crate::transport::drive;

pub struct Server {
    coordinator: SessionCoordinator,
    tcp: TcpListener,
    ws: TcpListener,
    max_frame_len: usize,
}

impl Server {
    /// Validate `config` and bind both listeners.
    pub async fn bind(config: &ServerConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let tcp = TcpListener::bind(&config.tcp_bind)
            .await
            .with_context(|| format!("binding TCP listener on {}", config.tcp_bind))?;
        let ws = TcpListener::bind(&config.ws_bind)
            .await
            .with_context(|| format!("binding WebSocket listener on {}", config.ws_bind))?;
        Ok(Server {
            coordinator: SessionCoordinator::new(config.session_settings()),
            tcp,
            ws,
            max_frame_len: config.max_frame_len,
        })
    }

    pub fn tcp_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.tcp.local_addr()?)
    }

    pub fn ws_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.ws.local_addr()?)
    }

    pub fn coordinator(&self) -> &SessionCoordinator {
        &self.coordinator
    }

    /// Accept connections on both listeners until the task is dropped.
    pub async fn run(self) -> anyhow::Result<()> {
        info!(
            "Listening for TCP on {} and WebSocket on {}",
            self.tcp_addr()?,
            self.ws_addr()?
        );
        loop {
            tokio::select! {
                accepted = self.tcp.accept() => match accepted {
                    Ok((stream, addr)) => self.serve_tcp(stream, addr),
                    Err(e) => warn!("TCP accept failed: {}", e),
                },
                accepted = self.ws.accept() => match accepted {
                    Ok((stream, addr)) => self.serve_ws(stream, addr),
                    Err(e) => warn!("WebSocket accept failed: {}", e),
                },
            }
        }
    }

    fn serve_tcp(&self, stream: TcpStream, addr: SocketAddr) {
        let id = self.coordinator.next_connection_id();
        info!("TCP connection {} from {}", id, addr);
        let _ = stream.set_nodelay(true);
        let (conn, frames) = TcpConnection::spawn(id, stream, self.max_frame_len);
        tokio::spawn(drive(self.coordinator.clone(), conn, frames));
    }

    fn serve_ws(&self, stream: TcpStream, addr: SocketAddr) {
        let id = self.coordinator.next_connection_id();
        let coordinator = self.coordinator.clone();
        let max_frame_len = self.max_frame_len;
        tokio::spawn(async move {
            match WsConnection::accept(id, stream, max_frame_len).await {
                Ok((conn, frames)) => {
                    info!("WebSocket connection {} from {}", id, addr);
                    drive(coordinator, conn, frames).await;
                }
                Err(e) => warn!("{:#}", e),
            }
        });
    }
}
