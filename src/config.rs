//! Server and client configuration.
//!
//! Plain structs with defaults. The builders on [`Server`](crate::Server) and
//! [`Client`](crate::Client) fill these in; [`ServerConfig::from_env`] and
//! [`ClientConfig::from_env`] honor `MSGPIPE_ADDR`.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use crate::error::{PipelineError, Result};
use crate::protocol::DEFAULT_MAX_FRAME_SIZE;
use crate::writer::WriterConfig;

/// Default port.
pub const DEFAULT_PORT: u16 = 8007;

/// Default address: loopback on [`DEFAULT_PORT`].
pub const DEFAULT_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_PORT));

/// Default listen backlog.
pub const DEFAULT_BACKLOG: u32 = 100;

/// Default socket read buffer size.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Default queue depth between the input loop and the connection task.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 64;

/// Environment variable overriding the address.
pub const ADDR_ENV: &str = "MSGPIPE_ADDR";

/// Per-connection settings shared by both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Size of the buffer handed to each socket read.
    pub read_buffer_size: usize,
    /// Largest frame payload accepted or produced.
    pub max_frame_size: u32,
    /// Writer task settings.
    pub writer: WriterConfig,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            writer: WriterConfig::default(),
        }
    }
}

impl ConnectionSettings {
    pub fn validate(&self) -> Result<()> {
        if self.read_buffer_size == 0 {
            return Err(invalid("read_buffer_size must be greater than 0"));
        }
        if self.max_frame_size == 0 {
            return Err(invalid("max_frame_size must be greater than 0"));
        }
        if self.writer.channel_capacity == 0 {
            return Err(invalid("writer channel_capacity must be greater than 0"));
        }
        if self.writer.max_pending_chunks == 0 {
            return Err(invalid("writer max_pending_chunks must be greater than 0"));
        }
        Ok(())
    }
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to listen on.
    pub address: SocketAddr,
    /// Pending-connection backlog passed to `listen`.
    pub backlog: u32,
    pub connection: ConnectionSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDR,
            backlog: DEFAULT_BACKLOG,
            connection: ConnectionSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults, with the address taken from `MSGPIPE_ADDR` when set.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(address) = address_from_env()? {
            config.address = address;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.backlog == 0 {
            return Err(invalid("backlog must be greater than 0"));
        }
        self.connection.validate()
    }
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server address to connect to.
    pub address: SocketAddr,
    /// Disable Nagle's algorithm on the socket.
    pub nodelay: bool,
    /// Queue depth for messages waiting to enter the pipeline.
    pub outbound_capacity: usize,
    pub connection: ConnectionSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDR,
            nodelay: true,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            connection: ConnectionSettings::default(),
        }
    }
}

impl ClientConfig {
    /// Defaults, with the address taken from `MSGPIPE_ADDR` when set.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(address) = address_from_env()? {
            config.address = address;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.outbound_capacity == 0 {
            return Err(invalid("outbound_capacity must be greater than 0"));
        }
        self.connection.validate()
    }
}

/// Read `MSGPIPE_ADDR`, if set.
pub fn address_from_env() -> Result<Option<SocketAddr>> {
    match std::env::var(ADDR_ENV) {
        Ok(value) => parse_address(&value).map(Some),
        Err(_) => Ok(None),
    }
}

/// Parse a `host:port` socket address.
pub fn parse_address(value: &str) -> Result<SocketAddr> {
    value
        .trim()
        .parse()
        .map_err(|e| invalid(&format!("invalid address `{}`: {}", value, e)))
}

fn invalid(reason: &str) -> PipelineError {
    PipelineError::InvalidConfig(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let server = ServerConfig::default();
        assert_eq!(server.address.to_string(), "127.0.0.1:8007");
        assert_eq!(server.backlog, 100);
        assert!(server.validate().is_ok());

        let client = ClientConfig::default();
        assert_eq!(client.address, server.address);
        assert!(client.nodelay);
        assert!(client.validate().is_ok());
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(
            parse_address(" 127.0.0.1:9000 ").unwrap().port(),
            9000
        );
        assert!(matches!(
            parse_address("localhost"),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut server = ServerConfig::default();
        server.backlog = 0;
        assert!(server.validate().is_err());

        let mut client = ClientConfig::default();
        client.connection.writer.channel_capacity = 0;
        assert!(client.validate().is_err());

        let mut client = ClientConfig::default();
        client.outbound_capacity = 0;
        assert!(client.validate().is_err());

        let mut settings = ConnectionSettings::default();
        settings.max_frame_size = 0;
        assert!(settings.validate().is_err());
    }
}
