use clap::Parser;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tunnel_core::BufferPool;
use tunnel_forward::{tls, EntryConfig};

#[derive(Parser, Debug)]
#[command(name = "tunnel-entry")]
#[command(about = "Accepts plaintext and relays it TLS-encrypted to a receiver")]
struct Args {
    #[arg(long = "config", short = 'c', default_value = "tunnel-entry.json")]
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

    let config = match EntryConfig::load(&args.config) {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(%error, path = %args.config, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let connector = match tls::connector(config.ca_path.as_deref(), config.insecure_skip_verify) {
        Ok(connector) => connector,
        Err(error) => {
            tracing::error!(%error, "failed to build TLS client configuration");
            std::process::exit(1);
        }
    };

    let listener = match TcpListener::bind(&config.listen_addr).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(%error, addr = %config.listen_addr, "failed to bind entry listener");
            std::process::exit(1);
        }
    };
    info!(addr = %config.listen_addr, "entry listening");

    let pool = std::sync::Arc::new(BufferPool::new());
    let receiver_host = config
        .receiver_addr
        .rsplit_once(':')
        .map(|(host, _)| host.to_string())
        .unwrap_or_else(|| config.receiver_addr.clone());

    loop {
        let (plain_conn, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(error) => {
                warn!(%error, "entry accept failed");
                continue;
            }
        };

        let connector = connector.clone();
        let pool = pool.clone();
        let receiver_addr = config.receiver_addr.clone();
        let receiver_host = receiver_host.clone();

        tokio::spawn(async move {
            let server_name = match tls::server_name(&receiver_host) {
                Ok(name) => name,
                Err(error) => {
                    error!(%peer, %error, "invalid receiver host name");
                    return;
                }
            };

            let tcp = match TcpStream::connect(&receiver_addr).await {
                Ok(tcp) => tcp,
                Err(error) => {
                    error!(%peer, %error, addr = %receiver_addr, "failed to dial receiver");
                    return;
                }
            };

            let tls_conn = match connector.connect(server_name, tcp).await {
                Ok(tls) => tls,
                Err(error) => {
                    error!(%peer, %error, "TLS handshake with receiver failed");
                    return;
                }
            };

            info!(%peer, "relaying connection through TLS to receiver");
            tunnel_core::copy_bidirectional(&pool, plain_conn, tls_conn).await;
        });
    }
}
