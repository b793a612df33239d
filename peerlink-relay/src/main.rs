use anyhow::{Context, Result};
use clap::Parser;
use peerlink_relay::{RelayService, serve};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Signaling relay for peerlink clients.
#[derive(Parser)]
#[command(name = "peerlink-relay", version)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:3000")]
    addr: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let listener = TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("Failed to bind {}", args.addr))?;
    info!("Relay listening on {}", listener.local_addr()?);

    serve(listener, RelayService::new())
        .await
        .context("Relay server stopped")?;
    Ok(())
}
