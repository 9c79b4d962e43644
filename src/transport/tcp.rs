//! TCP socket setup.
//!
//! # Example
//!
//! ```ignore
//! use msgpipe::transport::{connect, listen};
//!
//! let listener = listen("127.0.0.1:8007".parse()?, 100)?;
//! let stream = connect(listener.local_addr()?, true).await?;
//! ```

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpSocket, TcpStream};

use crate::error::Result;

/// Bind a listener with an explicit backlog.
///
/// Must be called from within a tokio runtime.
pub fn listen(address: SocketAddr, backlog: u32) -> Result<TcpListener> {
    let socket = if address.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };

    #[cfg(unix)]
    socket.set_reuseaddr(true)?;

    socket.bind(address)?;
    let listener = socket.listen(backlog)?;

    tracing::debug!(address = %address, backlog, "Listener bound");
    Ok(listener)
}

/// Connect to `address`, optionally disabling Nagle's algorithm.
pub async fn connect(address: SocketAddr, nodelay: bool) -> Result<TcpStream> {
    let stream = TcpStream::connect(address).await?;
    stream.set_nodelay(nodelay)?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    #[tokio::test]
    async fn test_listen_and_connect() {
        let listener = listen("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let address = listener.local_addr().unwrap();

        let (accepted, connected) = tokio::join!(listener.accept(), connect(address, true));
        let (_, peer) = accepted.unwrap();
        let stream = connected.unwrap();

        assert_eq!(stream.local_addr().unwrap(), peer);
        assert!(stream.nodelay().unwrap());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Grab a free port, then close it so nothing is listening.
        let address = {
            let listener = listen("127.0.0.1:0".parse().unwrap(), 1).unwrap();
            listener.local_addr().unwrap()
        };

        let result = connect(address, false).await;
        assert!(matches!(result, Err(PipelineError::Transport(_))));
    }
}
