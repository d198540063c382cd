//! WebSocket server and connection accept loop.
//!
//! Binds a TCP listener, upgrades each connection to WebSocket, and spawns
//! one [`Session`] task per connection. Connections never share session
//! state; the only shared object is the rate limiter, whose windows are
//! partitioned per connection key.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::session::RateLimiter;

use super::Session;

// ============================================================================
// Server
// ============================================================================

/// The cloak pipeline's WebSocket server.
///
/// # Example
///
/// ```ignore
/// use std::net::{IpAddr, Ipv4Addr};
/// use cloakstream::Server;
///
/// let server = Server::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
/// println!("listening on {}", server.ws_url());
/// server.run().await?;
/// ```
pub struct Server {
    /// TCP listener for incoming connections.
    listener: TcpListener,
    /// Address the listener is bound to.
    local_addr: SocketAddr,
    /// Shared fixed-window limiter, keyed per connection.
    limiter: Arc<RateLimiter>,
}

impl Server {
    /// Binds to the specified address and port.
    ///
    /// Use port 0 to let the OS assign a random available port.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if binding fails.
    pub async fn bind(ip: IpAddr, port: u16) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(ip, port)).await?;
        let local_addr = listener.local_addr()?;

        debug!(%local_addr, "server bound");

        Ok(Self {
            listener,
            local_addr,
            limiter: Arc::new(RateLimiter::default()),
        })
    }

    /// Replaces the default rate limiter.
    #[must_use]
    pub fn with_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = Arc::new(limiter);
        self
    }

    /// Returns the bound socket address.
    #[inline]
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the WebSocket URL for this server.
    ///
    /// Format: `ws://{ip}:{port}`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    /// Accepts connections forever, one session task per connection.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if accepting fails; individual
    /// connection failures are logged and do not end the loop.
    pub async fn run(self) -> Result<()> {
        info!(addr = %self.local_addr, "listening");

        loop {
            let (stream, peer) = self.listener.accept().await?;
            debug!(%peer, "TCP connection accepted");

            let limiter = Arc::clone(&self.limiter);
            tokio::spawn(async move {
                match tokio_tungstenite::accept_async(stream).await {
                    Ok(ws_stream) => {
                        info!(%peer, "WebSocket connection established");
                        Session::new(peer, limiter).run(ws_stream).await;
                    }
                    Err(e) => {
                        warn!(%peer, error = %e, "WebSocket upgrade failed");
                    }
                }
            });
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
