//! WebSocket server the renderer host connects to.
//!
//! # Connection Flow
//!
//! 1. The shell binds a listener (port `0` picks a free one)
//! 2. The renderer host is started with [`PendingServer::ws_url`]
//! 3. The host connects and upgrades to WebSocket
//! 4. The host sends READY with the initial content size
//! 5. The connection is ready for commands

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::Connection;
use super::connection::ReadyData;

// ============================================================================
// Constants
// ============================================================================

/// Default time allowed for the host to connect.
pub const DEFAULT_ACCEPT_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// PendingServer
// ============================================================================

/// A WebSocket server that is bound but has no host yet.
///
/// # Example
///
/// ```ignore
/// use std::net::{IpAddr, Ipv4Addr};
/// use tab_shell::transport::PendingServer;
///
/// let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
/// println!("host should connect to {}", server.ws_url());
/// let (connection, ready) = server.accept().await?;
/// ```
#[derive(Debug)]
pub struct PendingServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    accept_timeout: Duration,
}

impl PendingServer {
    /// Binds to `ip:port`. Port `0` lets the OS pick.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(ip: IpAddr, port: u16) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let local_addr = listener.local_addr()?;

        debug!(addr = %local_addr, "WebSocket server bound");

        Ok(Self {
            listener,
            local_addr,
            accept_timeout: DEFAULT_ACCEPT_TIMEOUT,
        })
    }

    /// Overrides how long [`accept`](Self::accept) waits for the host.
    #[must_use]
    pub fn with_accept_timeout(mut self, accept_timeout: Duration) -> Self {
        self.accept_timeout = accept_timeout;
        self
    }

    /// Returns the bound port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Returns the bound socket address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// WebSocket URL the host should connect to.
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    /// Accepts the host and completes the READY handshake.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if the host does not connect in time
    /// - [`Error::Connection`] if the WebSocket upgrade fails
    /// - handshake errors from [`Connection::wait_ready`]
    pub async fn accept(self) -> Result<(Connection, ReadyData)> {
        let (stream, peer) = timeout(self.accept_timeout, self.listener.accept())
            .await
            .map_err(|_| Error::connection_timeout(self.accept_timeout.as_millis() as u64))??;

        debug!(%peer, "TCP connection accepted");

        let ws_stream = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;

        let connection = Connection::new(ws_stream);
        let ready = connection.wait_ready().await?;

        info!(%peer, width = ready.width, height = ready.height, "Renderer host connected");
        Ok((connection, ready))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn test_bind_random_port() {
        let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind should succeed");

        assert!(server.port() > 0);
        assert_eq!(server.ws_url(), format!("ws://127.0.0.1:{}", server.port()));
        assert_eq!(server.local_addr().ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[tokio::test]
    async fn test_accept_times_out_without_host() {
        let server = PendingServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
            .await
            .expect("bind should succeed")
            .with_accept_timeout(Duration::from_millis(20));

        let err = server.accept().await.expect_err("no host");
        assert!(matches!(err, Error::ConnectionTimeout { .. }));
        assert!(err.is_timeout());
    }
}
