//! Client-side terminal handler.

use std::net::SocketAddr;

use tokio::sync::mpsc;

use super::{expect_message, Handler};
use crate::console::write_stdout_line;
use crate::error::{PipelineError, Result};
use crate::message::Message;
use crate::pipeline::Payload;

/// Echoes each outgoing message as `client:{text}` and displays inbound
/// messages as `remote:{text}`.
pub struct ClientHandler {
    peer: SocketAddr,
    inbound_tx: Option<mpsc::UnboundedSender<Message>>,
    sent: u64,
}

impl ClientHandler {
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            peer,
            inbound_tx: None,
            sent: 0,
        }
    }

    /// Also forward received messages to `inbound_tx`.
    pub fn with_inbound(peer: SocketAddr, inbound_tx: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            peer,
            inbound_tx: Some(inbound_tx),
            sent: 0,
        }
    }

    /// Messages written so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl Handler for ClientHandler {
    fn inbound(&mut self, payload: Payload) -> Result<()> {
        let message = expect_message("client", payload)?;
        tracing::debug!(peer = %self.peer, "Message received");

        if let Err(e) = write_stdout_line(&format!("remote:{}", message.text())) {
            tracing::warn!(error = %e, "Failed to display message");
        }
        if let Some(tx) = &self.inbound_tx {
            let _ = tx.send(message);
        }
        Ok(())
    }

    fn outbound(&mut self, payload: &Payload) -> Result<()> {
        if let Payload::Message(message) = payload {
            self.sent += 1;
            if let Err(e) = write_stdout_line(&format!("client:{}", message.text())) {
                tracing::warn!(error = %e, "Failed to display message");
            }
        }
        Ok(())
    }

    fn fault(&mut self, error: &PipelineError) {
        tracing::error!(peer = %self.peer, error = %error, "Session failed");
    }

    fn closed(&mut self) {
        tracing::debug!(peer = %self.peer, sent = self.sent, "Client handler released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "127.0.0.1:8007".parse().unwrap()
    }

    #[test]
    fn test_outbound_counts_messages() {
        let mut handler = ClientHandler::new(peer());
        let payload = Payload::Message(Message::now("hi"));

        handler.outbound(&payload).unwrap();
        handler.outbound(&payload).unwrap();

        assert_eq!(handler.sent(), 2);
    }

    #[test]
    fn test_outbound_ignores_non_messages() {
        let mut handler = ClientHandler::new(peer());
        handler.outbound(&Payload::Text("raw".into())).unwrap();
        assert_eq!(handler.sent(), 0);
    }

    #[test]
    fn test_inbound_forwarded() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut handler = ClientHandler::with_inbound(peer(), tx);

        let message = Message::now("from server");
        handler.inbound(Payload::Message(message.clone())).unwrap();

        assert_eq!(rx.try_recv().unwrap(), message);
    }

    #[test]
    fn test_inbound_rejects_text() {
        let mut handler = ClientHandler::new(peer());
        assert!(handler.inbound(Payload::Text("x".into())).is_err());
    }
}
