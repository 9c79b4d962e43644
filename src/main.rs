//! `msgpipe` command line.
//!
//! ```text
//! msgpipe [server|client|both] [ADDRESS]
//! ```
//!
//! With no mode both ends run in one process: the server is bound first, then
//! the client reads lines from stdin and sends them until `exit`.

use std::net::SocketAddr;

use anyhow::{bail, Context};
use tokio::io::BufReader;
use tokio::sync::oneshot;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use msgpipe::config::{address_from_env, parse_address, DEFAULT_ADDR};
use msgpipe::{Client, Server};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Server,
    Client,
    Both,
}

impl Mode {
    fn parse(value: &str) -> anyhow::Result<Self> {
        match value {
            "server" => Ok(Mode::Server),
            "client" => Ok(Mode::Client),
            "both" => Ok(Mode::Both),
            other => bail!("unknown mode `{}` (expected server, client or both)", other),
        }
    }
}

/// Logs go to stderr; stdout is reserved for the chat display.
fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match std::env::var("MSGPIPE_LOG").as_deref() {
            Ok("trace") => "trace",
            Ok("debug") => "debug",
            Ok("warn") | Ok("warning") => "warn",
            Ok("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!("msgpipe={}", level))
    };

    let use_json = std::env::var("MSGPIPE_LOG_FORMAT").as_deref() == Ok("json");

    if use_json {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init();
    }
}

fn resolve_address(arg: Option<&str>) -> anyhow::Result<SocketAddr> {
    if let Some(value) = arg {
        return parse_address(value).context("bad address argument");
    }
    Ok(address_from_env()
        .context("bad MSGPIPE_ADDR")?
        .unwrap_or(DEFAULT_ADDR))
}

async fn run_server(address: SocketAddr) -> anyhow::Result<()> {
    let server = Server::builder().address(address).bind().await?;
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
            }
        })
        .await?;
    Ok(())
}

async fn run_client(address: SocketAddr) -> anyhow::Result<()> {
    let client = Client::builder()
        .address(address)
        .connect()
        .await
        .with_context(|| format!("failed to connect to {}", address))?;

    let interactive = client
        .run_interactive(BufReader::new(tokio::io::stdin()))
        .await;

    // The connection's own error explains a failed session better.
    client.close().await.context("connection failed")?;
    let sent = interactive?;
    tracing::debug!(sent, "Input finished");
    Ok(())
}

async fn run_both(address: SocketAddr) -> anyhow::Result<()> {
    let server = Server::builder().address(address).bind().await?;
    let local = server.local_addr();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server_task = tokio::spawn(server.run_until(async {
        let _ = stop_rx.await;
    }));

    let outcome = run_client(local).await;

    let _ = stop_tx.send(());
    server_task.await.context("server task failed")??;

    outcome
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = match args.first() {
        Some(value) => Mode::parse(value)?,
        None => Mode::Both,
    };
    let address = resolve_address(args.get(1).map(String::as_str))?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), ?mode, address = %address, "msgpipe starting");

    match mode {
        Mode::Server => run_server(address).await,
        Mode::Client => run_client(address).await,
        Mode::Both => run_both(address).await,
    }
}
