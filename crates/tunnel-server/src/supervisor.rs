use std::sync::Arc;
use std::time::Duration;

use rsa::RsaPrivateKey;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};
use tunnel_core::{authenticate_initiator, copy_bidirectional, BufferPool, ConcurrencyCounter};
use tunnel_session::Session;
use yamux::Mode;

use crate::config::PublicConfig;
use crate::error::IterationError;
use crate::listener_set::{bind_all, serve};
use crate::termination::Termination;

const BACKOFF: Duration = Duration::from_secs(3);

/// The outer loop on the Public Endpoint (spec §4.6, "P side"): build, run,
/// and tear down one instance of the full stack per iteration, forever.
/// Key-load failure is the only fatal condition; everything else loops.
pub async fn run(config: PublicConfig) -> ! {
    let private_key = match tunnel_core::keys::load_private_key(&config.private_key_path) {
        Ok(key) => key,
        Err(error) => {
            error!(%error, "failed to load private key, exiting");
            std::process::exit(1);
        }
    };

    loop {
        match run_iteration(&config, &private_key).await {
            Ok(()) => info!("iteration ended, restarting"),
            Err(error) => warn!(%error, "iteration failed"),
        }
        tokio::time::sleep(BACKOFF).await;
    }
}

async fn run_iteration(
    config: &PublicConfig,
    private_key: &RsaPrivateKey,
) -> Result<(), IterationError> {
    info!("INIT");

    let tunnel_listener =
        TcpListener::bind(&config.tunnel_listen_addr)
            .await
            .map_err(|source| IterationError::TunnelBind {
                addr: config.tunnel_listen_addr.clone(),
                source,
            })?;
    info!(addr = %config.tunnel_listen_addr, "tunnel listener bound");

    // Only one client at a time: accept exactly one inbound connection then
    // stop listening (spec §4.6).
    let (mut transport, peer) = tunnel_listener
        .accept()
        .await
        .map_err(IterationError::TunnelAccept)?;
    drop(tunnel_listener);
    info!(%peer, "TRANSPORT_READY");

    authenticate_initiator(&mut transport, private_key, config.secret_token.as_bytes())
        .await
        .map_err(IterationError::Handshake)?;
    info!(%peer, "AUTHED");

    if !config.use_mux {
        return run_iteration_no_mux(config, transport).await;
    }

    // P opens streams on the Session (mux client role) even though R, not
    // P, dialed the underlying TCP connection (spec §4.3/§4.4).
    let session = Arc::new(Session::new(transport, &config.yamux, Mode::Client));
    info!("SESSION_UP");

    let listeners = bind_all(&config.user_listen_addr).await;
    if listeners.is_empty() {
        return Err(IterationError::NoUserListenersBound);
    }

    let counter = Arc::new(ConcurrencyCounter::new(
        config.yamux.max_concurrent_connections,
    ));
    let pool = Arc::new(BufferPool::new());
    let term = Arc::new(Termination::new());

    info!("SERVING");
    serve(listeners, session.clone(), counter, pool, term).await;

    session.shutdown();
    Ok(())
}

/// Degenerate `useMux = false` mode (spec §9): no Session, exactly one user
/// connection spliced straight onto the tunnel transport for the lifetime
/// of the iteration. Validated at config time to carry at most one
/// `userListenAddr`.
async fn run_iteration_no_mux(
    config: &PublicConfig,
    transport: TcpStream,
) -> Result<(), IterationError> {
    let addr = &config.user_listen_addr[0];
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| IterationError::TunnelBind {
            addr: addr.clone(),
            source,
        })?;
    info!(%addr, "SERVING (no-mux splice mode)");

    let (user_conn, peer) = listener
        .accept()
        .await
        .map_err(IterationError::TunnelAccept)?;
    info!(%peer, "splicing user connection directly onto tunnel transport");

    let pool = BufferPool::new();
    copy_bidirectional(&pool, user_conn, transport).await;
    Ok(())
}
