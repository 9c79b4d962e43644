//! Client builder and interactive session.
//!
//! The [`Client`] owns one connection task. Messages submitted with
//! [`Client::send`] are queued on a channel and dispatched through the
//! pipeline by that task, in submission order.
//!
//! # Example
//!
//! ```ignore
//! use msgpipe::Client;
//! use tokio::io::BufReader;
//!
//! #[tokio::main]
//! async fn main() -> msgpipe::Result<()> {
//!     let client = Client::builder().connect().await?;
//!     client.run_interactive(BufReader::new(tokio::io::stdin())).await?;
//!     client.close().await
//! }
//! ```

use std::net::SocketAddr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::console::is_exit_command;
use crate::error::{PipelineError, Result};
use crate::handler::ClientHandler;
use crate::message::Message;
use crate::transport::connect;

/// Builder for configuring and connecting a [`Client`].
pub struct ClientBuilder {
    config: ClientConfig,
    inbound: Option<mpsc::UnboundedSender<Message>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config,
            inbound: None,
        }
    }

    /// Server address. Default: `127.0.0.1:8007`.
    pub fn address(mut self, address: SocketAddr) -> Self {
        self.config.address = address;
        self
    }

    /// Set `TCP_NODELAY`. Default: true.
    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.config.nodelay = nodelay;
        self
    }

    /// Largest frame payload sent or accepted.
    pub fn max_frame_size(mut self, size: u32) -> Self {
        self.config.connection.max_frame_size = size;
        self
    }

    /// Depth of the queue between `send` and the connection task.
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.config.outbound_capacity = capacity;
        self
    }

    /// Forward messages received from the server to `tx`.
    pub fn inbound(mut self, tx: mpsc::UnboundedSender<Message>) -> Self {
        self.inbound = Some(tx);
        self
    }

    /// Connect and start the connection task.
    pub async fn connect(self) -> Result<Client> {
        Client::connect_with(self.config, self.inbound).await
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A connected client.
pub struct Client {
    outbound: mpsc::Sender<Message>,
    task: JoinHandle<Result<()>>,
    peer: SocketAddr,
    local_addr: SocketAddr,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Connect with the given configuration.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        Self::connect_with(config, None).await
    }

    async fn connect_with(
        config: ClientConfig,
        inbound: Option<mpsc::UnboundedSender<Message>>,
    ) -> Result<Self> {
        config.validate()?;

        let stream = connect(config.address, config.nodelay).await?;
        let peer = stream.peer_addr()?;
        let local_addr = stream.local_addr()?;
        tracing::info!(peer = %peer, local = %local_addr, "Connected");

        let handler = match inbound {
            Some(tx) => ClientHandler::with_inbound(peer, tx),
            None => ClientHandler::new(peer),
        };
        let connection = Connection::establish(stream, peer, handler, &config.connection)?;

        let (outbound, rx) = mpsc::channel(config.outbound_capacity);
        let task = tokio::spawn(connection.run(Some(rx)));

        Ok(Self {
            outbound,
            task,
            peer,
            local_addr,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether the connection task has stopped accepting messages.
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    /// Wrap `text` with the current local time and queue it.
    ///
    /// Returns the message as sent.
    pub async fn send(&self, text: impl Into<String>) -> Result<Message> {
        let message = Message::now(text);
        self.send_message(message.clone()).await?;
        Ok(message)
    }

    /// Queue a prepared message.
    ///
    /// # Errors
    ///
    /// `ConnectionClosed` if the connection has already ended; the cause is
    /// returned by [`close`](Self::close).
    pub async fn send_message(&self, message: Message) -> Result<()> {
        self.outbound
            .send(message)
            .await
            .map_err(|_| PipelineError::ConnectionClosed)
    }

    /// Read lines from `input` and send each one until a line equal to
    /// `exit` (any case) or end of input.
    ///
    /// Returns how many messages were sent.
    ///
    /// # Errors
    ///
    /// `ConnectionClosed` as soon as the connection ends, even while waiting
    /// for input; [`close`](Self::close) returns the cause.
    pub async fn run_interactive<R>(&self, input: R) -> Result<usize>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut sent = 0;

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = self.outbound.closed() => {
                    tracing::warn!(peer = %self.peer, sent, "Connection ended while waiting for input");
                    return Err(PipelineError::ConnectionClosed);
                }
            };

            let Some(line) = line else {
                tracing::debug!("End of input");
                break;
            };
            if is_exit_command(&line) {
                tracing::debug!("Exit requested");
                break;
            }
            self.send(line).await?;
            sent += 1;
        }

        Ok(sent)
    }

    /// Stop sending, let queued messages drain, and close the connection.
    ///
    /// # Errors
    ///
    /// The error that ended the connection, if any.
    pub async fn close(self) -> Result<()> {
        let Client { outbound, task, .. } = self;
        drop(outbound);

        match task.await {
            Ok(result) => result,
            Err(e) => Err(PipelineError::Transport(std::io::Error::new(
                std::io::ErrorKind::Other,
                e,
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_configuration() {
        let builder = Client::builder()
            .address("127.0.0.1:9000".parse().unwrap())
            .nodelay(false)
            .max_frame_size(2048)
            .outbound_capacity(4);

        assert_eq!(builder.config.address.port(), 9000);
        assert!(!builder.config.nodelay);
        assert_eq!(builder.config.connection.max_frame_size, 2048);
        assert_eq!(builder.config.outbound_capacity, 4);
    }

    #[test]
    fn test_builder_default() {
        let builder = ClientBuilder::default();
        assert_eq!(builder.config, ClientConfig::default());
        assert!(builder.inbound.is_none());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let address = {
            let listener = crate::transport::listen("127.0.0.1:0".parse().unwrap(), 1).unwrap();
            listener.local_addr().unwrap()
        };

        let result = Client::builder().address(address).connect().await;
        assert!(matches!(result, Err(PipelineError::Transport(_))));
    }
}
