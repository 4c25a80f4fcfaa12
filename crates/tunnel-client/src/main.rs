use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tunnel_client::{supervisor, PrivateConfig};

/// Private Endpoint of the reverse multiplexed tunnel.
#[derive(Parser, Debug)]
#[command(name = "tunnel-client")]
#[command(about = "Private Endpoint: dials the tunnel and forwards to local services")]
struct Args {
    /// Path to the JSON configuration file.
    #[arg(long = "config", short = 'c', default_value = "tunnel-client.json")]
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

    let config = match PrivateConfig::load(&args.config) {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(%error, path = %args.config, "failed to load configuration");
            std::process::exit(1);
        }
    };

    supervisor::run(config).await;
}
