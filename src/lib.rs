//! # msgpipe
//!
//! A bidirectional message channel over TCP built on a layered codec
//! pipeline.
//!
//! A server and a client exchange [`Message`]s (text plus timestamp) over one
//! persistent connection. Each end owns a [`Pipeline`](pipeline::Pipeline) of
//! stages that turn raw socket bytes into messages on the way in and back
//! into bytes on the way out:
//!
//! ```text
//! socket bytes ─► Framing ─► Text ─► Message ─► terminal handler
//! socket bytes ◄─ Framing ◄─ Text ◄─ Message ◄─ caller
//! ```
//!
//! Frames are length-prefixed (4-byte big-endian) so message boundaries
//! survive TCP coalescing and splitting. Payloads are UTF-8 JSON.
//!
//! ## Example
//!
//! ```ignore
//! use msgpipe::{Client, Server};
//!
//! #[tokio::main]
//! async fn main() -> msgpipe::Result<()> {
//!     let server = Server::builder().bind().await?;
//!     let address = server.local_addr();
//!     tokio::spawn(server.run());
//!
//!     let client = Client::builder().address(address).connect().await?;
//!     client.send("hello").await?;
//!     client.close().await
//! }
//! ```

pub mod codec;
pub mod config;
pub mod connection;
pub mod console;
pub mod error;
pub mod handler;
pub mod message;
pub mod pipeline;
pub mod protocol;
pub mod transport;
pub mod writer;

mod client;
mod server;

pub use client::{Client, ClientBuilder};
pub use error::{PipelineError, Result};
pub use message::Message;
pub use server::{Server, ServerBuilder};
