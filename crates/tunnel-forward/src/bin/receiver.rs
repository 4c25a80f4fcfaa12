use clap::Parser;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tunnel_core::BufferPool;
use tunnel_forward::{tls, ReceiverConfig};

#[derive(Parser, Debug)]
#[command(name = "tunnel-receiver")]
#[command(about = "Accepts TLS and relays it plaintext to a local target")]
struct Args {
    #[arg(long = "config", short = 'c', default_value = "tunnel-receiver.json")]
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

    let config = match ReceiverConfig::load(&args.config) {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(%error, path = %args.config, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let acceptor = match tls::acceptor(&config.cert_path, &config.key_path) {
        Ok(acceptor) => acceptor,
        Err(error) => {
            tracing::error!(%error, "failed to build TLS server configuration");
            std::process::exit(1);
        }
    };

    let listener = match TcpListener::bind(&config.listen_addr).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(%error, addr = %config.listen_addr, "failed to bind receiver listener");
            std::process::exit(1);
        }
    };
    info!(addr = %config.listen_addr, "receiver listening");

    let pool = std::sync::Arc::new(BufferPool::new());

    loop {
        let (tcp, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(error) => {
                warn!(%error, "receiver accept failed");
                continue;
            }
        };

        let acceptor = acceptor.clone();
        let pool = pool.clone();
        let target_addr = config.target_addr.clone();

        tokio::spawn(async move {
            let tls_conn = match acceptor.accept(tcp).await {
                Ok(tls) => tls,
                Err(error) => {
                    error!(%peer, %error, "TLS handshake failed");
                    return;
                }
            };

            let target_conn = match TcpStream::connect(&target_addr).await {
                Ok(conn) => conn,
                Err(error) => {
                    error!(%peer, %error, addr = %target_addr, "failed to dial target");
                    return;
                }
            };

            info!(%peer, target = %target_addr, "relaying TLS connection to target");
            tunnel_core::copy_bidirectional(&pool, tls_conn, target_conn).await;
        });
    }
}
