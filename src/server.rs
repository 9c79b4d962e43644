//! Server builder and accept loop.
//!
//! Each accepted socket gets its own task, pipeline, and [`ServerHandler`].
//! Nothing is shared between connections, so one connection failing never
//! affects the others or the accept loop.
//!
//! # Example
//!
//! ```ignore
//! use msgpipe::Server;
//!
//! #[tokio::main]
//! async fn main() -> msgpipe::Result<()> {
//!     let server = Server::builder().backlog(100).bind().await?;
//!     server.run_until(async { tokio::signal::ctrl_c().await.ok(); }).await
//! }
//! ```

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::{ConnectionSettings, ServerConfig};
use crate::connection::Connection;
use crate::error::Result;
use crate::handler::{Delivery, ServerHandler};
use crate::transport::listen;

/// Pause after a failed `accept` (e.g. out of file descriptors) so the loop
/// does not spin while the condition lasts.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Builder for configuring and binding a [`Server`].
pub struct ServerBuilder {
    config: ServerConfig,
    deliveries: Option<mpsc::UnboundedSender<Delivery>>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            config,
            deliveries: None,
        }
    }

    /// Address to listen on. Default: `127.0.0.1:8007`.
    pub fn address(mut self, address: SocketAddr) -> Self {
        self.config.address = address;
        self
    }

    /// Listen backlog. Default: 100.
    pub fn backlog(mut self, backlog: u32) -> Self {
        self.config.backlog = backlog;
        self
    }

    /// Largest accepted frame payload.
    pub fn max_frame_size(mut self, size: u32) -> Self {
        self.config.connection.max_frame_size = size;
        self
    }

    /// Socket read buffer size.
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.connection.read_buffer_size = size;
        self
    }

    /// Forward every received message, tagged with its peer, to `tx`.
    pub fn deliveries(mut self, tx: mpsc::UnboundedSender<Delivery>) -> Self {
        self.deliveries = Some(tx);
        self
    }

    /// Validate the configuration and bind the listener.
    pub async fn bind(self) -> Result<Server> {
        Server::bind_with(self.config, self.deliveries).await
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound server, not yet accepting.
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    settings: ConnectionSettings,
    deliveries: Option<mpsc::UnboundedSender<Delivery>>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Bind with the given configuration.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        Self::bind_with(config, None).await
    }

    async fn bind_with(
        config: ServerConfig,
        deliveries: Option<mpsc::UnboundedSender<Delivery>>,
    ) -> Result<Self> {
        config.validate()?;

        let listener = listen(config.address, config.backlog)?;
        let local_addr = listener.local_addr()?;
        tracing::info!(address = %local_addr, backlog = config.backlog, "Server listening");

        Ok(Self {
            listener,
            local_addr,
            settings: config.connection,
            deliveries,
        })
    }

    /// The bound address (useful when binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections forever.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// On shutdown the listener is closed and every live connection task is
    /// aborted; each aborted pipeline releases its resources on drop.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let Server {
            listener,
            local_addr,
            settings,
            deliveries,
        } = self;

        tokio::pin!(shutdown);
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(address = %local_addr, live = connections.len(), "Server shutting down");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::info!(peer = %peer, "Accepted connection");
                        connections.spawn(serve_connection(
                            stream,
                            peer,
                            settings.clone(),
                            deliveries.clone(),
                        ));
                    }
                    Err(e) => back_off_after_accept_error(&e).await,
                },
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = finished {
                        if e.is_panic() {
                            tracing::error!(error = %e, "Connection task panicked");
                        }
                    }
                }
            }
        }

        connections.shutdown().await;
        Ok(())
    }
}

async fn back_off_after_accept_error(error: &io::Error) {
    tracing::warn!(error = %error, backoff_ms = ACCEPT_ERROR_BACKOFF.as_millis() as u64, "Accept failed");
    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    settings: ConnectionSettings,
    deliveries: Option<mpsc::UnboundedSender<Delivery>>,
) {
    let handler = match deliveries {
        Some(tx) => ServerHandler::with_deliveries(peer, tx),
        None => ServerHandler::new(peer),
    };

    let connection = match Connection::establish(stream, peer, handler, &settings) {
        Ok(connection) => connection,
        Err(e) => {
            tracing::warn!(peer = %peer, error = %e, "Failed to set up connection");
            return;
        }
    };

    // Errors are already logged by the connection; they stay contained here.
    let _ = connection.run(None).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_configuration() {
        let builder = Server::builder()
            .address("127.0.0.1:0".parse().unwrap())
            .backlog(10)
            .max_frame_size(1024)
            .read_buffer_size(512);

        assert_eq!(builder.config.address.port(), 0);
        assert_eq!(builder.config.backlog, 10);
        assert_eq!(builder.config.connection.max_frame_size, 1024);
        assert_eq!(builder.config.connection.read_buffer_size, 512);
        assert!(builder.deliveries.is_none());
    }

    #[tokio::test]
    async fn test_bind_reports_local_addr() {
        let server = Server::builder()
            .address("127.0.0.1:0".parse().unwrap())
            .bind()
            .await
            .unwrap();

        assert_ne!(server.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_rejects_invalid_config() {
        let result = Server::builder()
            .address("127.0.0.1:0".parse().unwrap())
            .backlog(0)
            .bind()
            .await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_error_backs_off() {
        let start = tokio::time::Instant::now();
        let error = io::Error::new(io::ErrorKind::Other, "too many open files");

        back_off_after_accept_error(&error).await;

        assert!(start.elapsed() >= ACCEPT_ERROR_BACKOFF);
    }

    #[tokio::test]
    async fn test_run_until_stops() {
        let server = Server::builder()
            .address("127.0.0.1:0".parse().unwrap())
            .bind()
            .await
            .unwrap();

        server.run_until(async {}).await.unwrap();
    }
}
