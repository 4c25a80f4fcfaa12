//! Multiplex Session (spec §4.3) — the stream multiplexer is assumed
//! provided (an existing `yamux` library); this crate is the thin contract
//! layer the core requires on top of it: `open_stream`/`accept_stream`,
//! shared session settings, and a TCP-level keepalive knob.
//!
//! Per spec §4.4/§4.5, P *opens* streams (mux client role) and R *accepts*
//! them (mux server role) — the mux role is the inverse of which side
//! dialed the underlying TCP connection.
//!
//! `yamux` 0.12+ dropped the `Control`/background-task model this crate
//! used to lean on: `Connection` no longer implements `futures::Stream`,
//! and there is no cloneable `Control` handle to open streams from other
//! tasks. Both directions are now poll-based (`poll_next_inbound`,
//! `poll_new_outbound`) against a single `&mut Connection`, so exactly one
//! task — the driver below — owns it; every other task reaches it through
//! a request channel.

mod keepalive;
mod settings;
mod timeout_stream;

pub use keepalive::enable_keepalive;
pub use settings::SessionSettings;
pub use timeout_stream::WriteTimeoutStream;

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::compat::{Compat, FuturesAsyncReadCompatExt, TokioAsyncReadCompatExt};
use yamux::{Connection, ConnectionError, Mode};

type CompatTcp = Compat<TcpStream>;

/// A multiplexed stream, wrapped so it exposes tokio's `AsyncRead`/
/// `AsyncWrite` instead of `yamux::Stream`'s native `futures::io` traits.
pub type MuxStream = Compat<yamux::Stream>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session transport closed: {0}")]
    Closed(#[from] ConnectionError),
    #[error("session driver task ended unexpectedly")]
    DriverGone,
}

/// A request to open an outbound stream, answered by the driver task once
/// `poll_new_outbound` yields a result.
struct OpenRequest {
    reply: oneshot::Sender<Result<yamux::Stream, ConnectionError>>,
}

/// A multiplex overlay on the Tunnel Transport (spec §3 "Session").
///
/// Internally drives the yamux `Connection` on a background task so that
/// frames get pumped even while the caller is only opening outbound
/// streams (P) or only awaiting inbound ones (R). When the driver task
/// observes a transport error, it closes the inbound channel so that any
/// pending `accept_stream` wakes with an error, matching "if the
/// underlying transport breaks, all extant streams fail; accept/open
/// returns an error thereafter" (spec §4.3).
pub struct Session {
    open_tx: mpsc::Sender<OpenRequest>,
    inbound: Mutex<mpsc::Receiver<Result<yamux::Stream, SessionError>>>,
    driver: tokio::task::JoinHandle<()>,
    write_timeout: Duration,
}

impl Session {
    /// Build a session over an already-authenticated TCP transport.
    /// `mode` is `Mode::Client` on P (it opens streams) and `Mode::Server`
    /// on R (it accepts them).
    pub fn new(transport: TcpStream, settings: &SessionSettings, mode: Mode) -> Self {
        // Must happen before `compat()` consumes the TcpStream below: the
        // Rust `yamux` crate has no multiplex-layer ping, so
        // `enableKeepAlive`/`keepAliveInterval` (spec §6) are applied to
        // the underlying TCP socket instead (spec §5's dead-peer
        // detection within `keepAliveInterval` then falls to the OS).
        if settings.enable_keep_alive {
            let interval = Duration::from_millis(settings.keep_alive_interval_ms);
            if let Err(error) = enable_keepalive(&transport, interval) {
                tracing::warn!(%error, "failed to enable TCP keepalive on tunnel transport");
            }
        }

        let mut cfg = yamux::Config::default();
        cfg.set_max_num_streams(settings.accept_backlog);
        if settings.max_stream_window_size > 0 {
            cfg.set_max_connection_receive_window(settings.max_stream_window_size);
        }

        let io = transport.compat();
        let connection = Connection::new(io, cfg, mode);

        let (inbound_tx, inbound_rx) = mpsc::channel(settings.accept_backlog.max(1));
        let (open_tx, open_rx) = mpsc::channel(settings.accept_backlog.max(1));
        let driver = tokio::spawn(drive(connection, inbound_tx, open_rx));

        Self {
            open_tx,
            inbound: Mutex::new(inbound_rx),
            driver,
            write_timeout: Duration::from_millis(settings.connection_write_timeout_ms),
        }
    }

    /// P side: open a new outbound stream (spec §4.4 step 2). The returned
    /// stream enforces `connectionWriteTimeout` on every write.
    pub async fn open_stream(&self) -> Result<WriteTimeoutStream<MuxStream>, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.open_tx
            .send(OpenRequest { reply: reply_tx })
            .await
            .map_err(|_| SessionError::DriverGone)?;
        let stream = reply_rx
            .await
            .map_err(|_| SessionError::DriverGone)?
            .map_err(SessionError::Closed)?;
        Ok(WriteTimeoutStream::new(stream.compat(), self.write_timeout))
    }

    /// R side: accept the next inbound stream (spec §4.5). The returned
    /// stream enforces `connectionWriteTimeout` on every write.
    pub async fn accept_stream(&self) -> Result<WriteTimeoutStream<MuxStream>, SessionError> {
        let mut rx = self.inbound.lock().await;
        match rx.recv().await {
            Some(Ok(stream)) => Ok(WriteTimeoutStream::new(stream.compat(), self.write_timeout)),
            Some(Err(e)) => Err(e),
            None => Err(SessionError::DriverGone),
        }
    }

    /// Tear down the session: aborts the driver task, which drops the
    /// `Connection` and the underlying transport.
    pub fn shutdown(&self) {
        self.driver.abort();
    }
}

/// What the driver was woken up to handle: an inbound stream (or the end
/// of the connection), or a pending request to open an outbound one.
enum Event {
    Inbound(Option<Result<yamux::Stream, ConnectionError>>),
    Open(OpenRequest),
}

/// Drives the yamux `Connection` on a single task, since `poll_next_inbound`
/// and `poll_new_outbound` both need `&mut Connection` and 0.13 provides no
/// way to share that access across tasks. Inbound streams are forwarded
/// eagerly (checked first each iteration); an outbound open request is
/// serviced to completion before the loop goes back to polling inbound,
/// since only one of the two `poll_*` calls is ever in flight at a time.
async fn drive(
    mut connection: Connection<CompatTcp>,
    inbound_tx: mpsc::Sender<Result<yamux::Stream, SessionError>>,
    mut open_rx: mpsc::Receiver<OpenRequest>,
) {
    loop {
        let event = futures::future::poll_fn(|cx: &mut Context<'_>| {
            if let Poll::Ready(next) = connection.poll_next_inbound(cx) {
                return Poll::Ready(Event::Inbound(next));
            }
            if let Poll::Ready(Some(request)) = open_rx.poll_recv(cx) {
                return Poll::Ready(Event::Open(request));
            }
            Poll::Pending
        })
        .await;

        match event {
            Event::Inbound(Some(Ok(stream))) => {
                if inbound_tx.send(Ok(stream)).await.is_err() {
                    return;
                }
            }
            Event::Inbound(Some(Err(error))) => {
                let _ = inbound_tx.send(Err(SessionError::Closed(error))).await;
                return;
            }
            Event::Inbound(None) => return,
            Event::Open(request) => {
                let result =
                    futures::future::poll_fn(|cx: &mut Context<'_>| connection.poll_new_outbound(cx))
                        .await;
                let _ = request.reply.send(result);
            }
        }
    }
}

/// Live reference count of a session's control handle, used by callers that
/// need to share one `Session` across many tasks (the User Listener Set
/// and the Local Dialer both do this).
pub type SharedSession = Arc<Session>;

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn loopback_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (accept_result, client) = tokio::join!(listener.accept(), TcpStream::connect(addr));
        let (server, _) = accept_result.unwrap();
        (server, client.unwrap())
    }

    #[tokio::test]
    async fn opens_and_accepts_a_stream_end_to_end() {
        let (server_tcp, client_tcp) = loopback_pair().await;

        let server_session = Session::new(server_tcp, &SessionSettings::default(), Mode::Server);
        let client_session = Session::new(client_tcp, &SessionSettings::default(), Mode::Client);

        let accept_task = tokio::spawn(async move {
            let mut stream = server_session.accept_stream().await.unwrap();
            let mut buf = [0u8; 5];
            stream.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf, b"hello");
        });

        let mut opened = client_session.open_stream().await.unwrap();
        opened.write_all(b"hello").await.unwrap();
        opened.flush().await.unwrap();

        accept_task.await.unwrap();
    }

    #[tokio::test]
    async fn opens_several_streams_concurrently() {
        let (server_tcp, client_tcp) = loopback_pair().await;

        let server_session = Arc::new(Session::new(
            server_tcp,
            &SessionSettings::default(),
            Mode::Server,
        ));
        let client_session = Arc::new(Session::new(
            client_tcp,
            &SessionSettings::default(),
            Mode::Client,
        ));

        let accept_task = tokio::spawn({
            let server_session = server_session.clone();
            async move {
                for _ in 0..3 {
                    let mut stream = server_session.accept_stream().await.unwrap();
                    let mut buf = [0u8; 1];
                    stream.read_exact(&mut buf).await.unwrap();
                }
            }
        });

        let opens = (0..3).map(|_| {
            let client_session = client_session.clone();
            tokio::spawn(async move {
                let mut stream = client_session.open_stream().await.unwrap();
                stream.write_all(b"x").await.unwrap();
                stream.flush().await.unwrap();
            })
        });
        for open in opens {
            open.await.unwrap();
        }

        accept_task.await.unwrap();
    }
}
