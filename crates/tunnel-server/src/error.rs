use thiserror::Error;
use tunnel_core::CoreError;
use tunnel_session::SessionError;

/// Errors that abandon a single supervisor iteration (spec §7). None of
/// these are fatal to the process; the supervisor logs and retries after
/// the 3-second backoff.
#[derive(Debug, Error)]
pub enum IterationError {
    #[error("failed to bind tunnel listener on {addr}: {source}")]
    TunnelBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to accept tunnel connection: {0}")]
    TunnelAccept(#[source] std::io::Error),
    #[error("no user listener bound successfully")]
    NoUserListenersBound,
    #[error("key material error: {0}")]
    Key(#[from] CoreError),
    #[error("handshake failed: {0}")]
    Handshake(#[source] CoreError),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}
