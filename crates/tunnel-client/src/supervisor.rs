use std::sync::Arc;
use std::time::Duration;

use rsa::RsaPublicKey;
use tokio::net::TcpStream;
use tracing::{error, info, warn};
use tunnel_core::{copy_bidirectional, prove_secret, BufferPool, ConcurrencyCounter};
use tunnel_session::Session;
use yamux::Mode;

use crate::config::PrivateConfig;
use crate::dialer::RoundRobin;
use crate::error::IterationError;
use crate::local_dialer;

const BACKOFF: Duration = Duration::from_secs(3);

/// The outer loop on the Private Endpoint (spec §4.6, "R side").
pub async fn run(config: PrivateConfig) -> ! {
    let public_key = match tunnel_core::keys::load_public_key(&config.public_key_path) {
        Ok(key) => key,
        Err(error) => {
            error!(%error, "failed to load public key, exiting");
            std::process::exit(1);
        }
    };

    loop {
        match run_iteration(&config, &public_key).await {
            Ok(()) => info!("iteration ended, restarting"),
            Err(error) => warn!(%error, "iteration failed"),
        }
        tokio::time::sleep(BACKOFF).await;
    }
}

async fn run_iteration(
    config: &PrivateConfig,
    public_key: &RsaPublicKey,
) -> Result<(), IterationError> {
    info!("INIT");

    let mut transport =
        TcpStream::connect(&config.tunnel_server_addr)
            .await
            .map_err(|source| IterationError::TunnelDial {
                addr: config.tunnel_server_addr.clone(),
                source,
            })?;
    info!(addr = %config.tunnel_server_addr, "TRANSPORT_READY");

    prove_secret(&mut transport, public_key, config.secret_token.as_bytes())
        .await
        .map_err(IterationError::Handshake)?;
    info!("AUTHED");

    if !config.use_mux {
        return run_iteration_no_mux(config, transport).await;
    }

    // R accepts streams on the Session (mux server role), the inverse of
    // having dialed the underlying TCP connection (spec §4.3/§4.5).
    let session = Session::new(transport, &config.yamux, Mode::Server);
    info!("SESSION_UP / SERVING");

    let targets = Arc::new(RoundRobin::new(config.local_listen_addr.clone()));
    let counter = Arc::new(ConcurrencyCounter::new(
        config.yamux.max_concurrent_connections,
    ));
    let pool = Arc::new(BufferPool::new());

    let session_error = local_dialer::run(&session, targets, counter, pool).await;
    session.shutdown();
    Err(IterationError::Session(session_error))
}

/// Degenerate `useMux = false` mode: splice the single local target
/// straight onto the tunnel transport (spec §9).
async fn run_iteration_no_mux(
    config: &PrivateConfig,
    transport: TcpStream,
) -> Result<(), IterationError> {
    let target = &config.local_listen_addr[0];
    let local_conn =
        TcpStream::connect(target)
            .await
            .map_err(|source| IterationError::TunnelDial {
                addr: target.clone(),
                source,
            })?;
    info!(%target, "SERVING (no-mux splice mode)");

    let pool = BufferPool::new();
    copy_bidirectional(&pool, transport, local_conn).await;
    Ok(())
}
