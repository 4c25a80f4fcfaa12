use std::sync::Arc;

use clap::Parser;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tunnel_core::BufferPool;
use tunnel_plain::PlainConfig;

#[derive(Parser, Debug)]
#[command(name = "tunnel-plain")]
#[command(about = "Trivial TCP port forwarder")]
struct Args {
    #[arg(long = "config", short = 'c', default_value = "tunnel-plain.json")]
    config: String,
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    setup_logging();
    let args = Args::parse();

    let config = match PlainConfig::load(&args.config) {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(%error, path = %args.config, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let listener = match TcpListener::bind(&config.listen_addr).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(%error, addr = %config.listen_addr, "failed to bind listener");
            std::process::exit(1);
        }
    };
    info!(addr = %config.listen_addr, target = %config.target_addr, "forwarding");

    let pool = Arc::new(BufferPool::new());

    loop {
        let (conn, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(error) => {
                warn!(%error, "accept failed");
                continue;
            }
        };

        let pool = pool.clone();
        let target_addr = config.target_addr.clone();
        tokio::spawn(async move {
            let target_conn = match TcpStream::connect(&target_addr).await {
                Ok(conn) => conn,
                Err(error) => {
                    error!(%peer, %error, addr = %target_addr, "failed to dial target");
                    return;
                }
            };
            tunnel_core::copy_bidirectional(&pool, conn, target_conn).await;
        });
    }
}
