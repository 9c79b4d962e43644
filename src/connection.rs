//! One connection: a socket read loop driving a single pipeline.
//!
//! The connection task is the pipeline's only caller. It waits on two
//! sources at once: bytes from the socket (inbound) and, on the client,
//! messages submitted by the input loop (outbound). Each event is fully
//! dispatched before the next is taken, so stage order holds in both
//! directions.
//!
//! ```text
//!   socket read half ──► dispatch_inbound ──► handler
//!   outbound channel ──► dispatch_outbound ──► writer task ──► socket write half
//! ```
//!
//! Whatever ends the loop (EOF, a fault, the outbound source finishing) the
//! pipeline is shut down before `run` returns, and released on drop if the
//! task is cancelled.

use std::net::SocketAddr;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::config::ConnectionSettings;
use crate::error::Result;
use crate::handler::Handler;
use crate::message::Message;
use crate::pipeline::{ConnectionState, Payload, Pipeline, Stage};
use crate::writer::spawn_writer_task;

/// An open connection ready to run.
pub struct Connection<R> {
    peer: SocketAddr,
    reader: R,
    pipeline: Pipeline,
    read_buffer_size: usize,
}

impl Connection<OwnedReadHalf> {
    /// Wrap an established TCP stream: spawn its writer task, build the
    /// standard message pipeline around `handler`, and open it.
    pub fn establish(
        stream: TcpStream,
        peer: SocketAddr,
        handler: impl Handler + 'static,
        settings: &ConnectionSettings,
    ) -> Result<Self> {
        let (reader, write_half) = stream.into_split();
        let (writer, writer_task) = spawn_writer_task(write_half, settings.writer.clone());

        let pipeline = Pipeline::builder()
            .stages(Stage::message_chain(settings.max_frame_size))
            .handler(handler)
            .writer(writer, writer_task)
            .label(peer.to_string())
            .build()?;

        Connection::new(peer, reader, pipeline, settings.read_buffer_size)
    }
}

impl<R> Connection<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Take ownership of a reader and a pipeline, opening the pipeline.
    pub fn new(
        peer: SocketAddr,
        reader: R,
        mut pipeline: Pipeline,
        read_buffer_size: usize,
    ) -> Result<Self> {
        pipeline.open()?;
        Ok(Self {
            peer,
            reader,
            pipeline,
            read_buffer_size,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.pipeline.state()
    }

    /// Run until the peer disconnects, a dispatch fails, or `outbound`
    /// finishes (all its senders dropped).
    ///
    /// With `outbound` set to `None` the connection is inbound-only.
    ///
    /// # Errors
    ///
    /// The first dispatch or transport error; otherwise any error from
    /// draining the writer.
    pub async fn run(self, mut outbound: Option<mpsc::Receiver<Message>>) -> Result<()> {
        let Connection {
            peer,
            mut reader,
            mut pipeline,
            read_buffer_size,
        } = self;

        let mut buf = BytesMut::with_capacity(read_buffer_size);
        let mut chunks: u64 = 0;

        let outcome: Result<()> = loop {
            buf.reserve(read_buffer_size);
            tokio::select! {
                read = reader.read_buf(&mut buf) => {
                    match read {
                        Ok(0) => {
                            tracing::debug!(peer = %peer, "Peer closed the connection");
                            break Ok(());
                        }
                        Ok(_) => {}
                        Err(e) => break Err(e.into()),
                    }
                    chunks += 1;
                    if let Err(e) = pipeline.dispatch_inbound(buf.split().freeze()) {
                        break Err(e);
                    }
                }
                next = recv_outbound(&mut outbound), if outbound.is_some() => {
                    match next {
                        Some(message) => {
                            if let Err(e) = pipeline.dispatch_outbound(Payload::Message(message)).await {
                                break Err(e);
                            }
                        }
                        None => {
                            tracing::debug!(peer = %peer, "Outbound source finished");
                            break Ok(());
                        }
                    }
                }
            }
        };

        // Stop the producer before draining so nothing new is accepted.
        drop(outbound);
        let drained = pipeline.shutdown().await;

        match &outcome {
            Ok(()) => tracing::info!(peer = %peer, chunks, "Connection closed"),
            Err(e) => tracing::warn!(peer = %peer, chunks, error = %e, "Connection closed with error"),
        }

        outcome.and(drained)
    }
}

async fn recv_outbound(outbound: &mut Option<mpsc::Receiver<Message>>) -> Option<Message> {
    match outbound {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
