//! Server-side terminal handler.

use std::net::SocketAddr;

use tokio::sync::mpsc;

use super::{expect_message, Handler};
use crate::console::write_stdout_line;
use crate::error::{PipelineError, Result};
use crate::message::Message;
use crate::pipeline::Payload;

/// A message received by the server, with the connection it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub peer: SocketAddr,
    pub message: Message,
}

/// Displays each inbound message as `server:{text}`.
///
/// Inbound only; nothing originates here. An optional channel receives a
/// copy of every delivery, tagged with the peer address.
pub struct ServerHandler {
    peer: SocketAddr,
    deliveries: Option<mpsc::UnboundedSender<Delivery>>,
    received: u64,
}

impl ServerHandler {
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            peer,
            deliveries: None,
            received: 0,
        }
    }

    /// Also forward every received message to `deliveries`.
    pub fn with_deliveries(peer: SocketAddr, deliveries: mpsc::UnboundedSender<Delivery>) -> Self {
        Self {
            peer,
            deliveries: Some(deliveries),
            received: 0,
        }
    }

    /// Messages received so far on this connection.
    pub fn received(&self) -> u64 {
        self.received
    }
}

impl Handler for ServerHandler {
    fn inbound(&mut self, payload: Payload) -> Result<()> {
        let message = expect_message("server", payload)?;
        self.received += 1;

        tracing::info!(
            peer = %self.peer,
            time = %message.timestamp(),
            "Message received"
        );
        if let Err(e) = write_stdout_line(&format!("server:{}", message.text())) {
            tracing::warn!(peer = %self.peer, error = %e, "Failed to display message");
        }

        if let Some(tx) = &self.deliveries {
            // Receiver gone just means nobody is listening any more.
            let _ = tx.send(Delivery {
                peer: self.peer,
                message,
            });
        }
        Ok(())
    }

    fn fault(&mut self, error: &PipelineError) {
        tracing::warn!(peer = %self.peer, error = %error, "Dropping connection");
    }

    fn closed(&mut self) {
        tracing::debug!(peer = %self.peer, received = self.received, "Server handler released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[test]
    fn test_delivery_tagged_with_peer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut handler = ServerHandler::with_deliveries(peer(), tx);

        let message = Message::now("hello");
        handler.inbound(Payload::Message(message.clone())).unwrap();

        let delivery = rx.try_recv().unwrap();
        assert_eq!(delivery.peer, peer());
        assert_eq!(delivery.message, message);
        assert_eq!(handler.received(), 1);
    }

    #[test]
    fn test_rejects_non_message() {
        let mut handler = ServerHandler::new(peer());
        let result = handler.inbound(Payload::Bytes(Bytes::from_static(b"raw")));
        assert!(matches!(
            result,
            Err(PipelineError::UnexpectedPayload { expected: "message", .. })
        ));
        assert_eq!(handler.received(), 0);
    }

    #[test]
    fn test_closed_receiver_is_not_an_error() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut handler = ServerHandler::with_deliveries(peer(), tx);
        assert!(handler.inbound(Payload::Message(Message::now("x"))).is_ok());
    }
}
