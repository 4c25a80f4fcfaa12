use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use tunnel_core::{copy_bidirectional, BufferPool, ConcurrencyCounter};
use tunnel_session::SharedSession;

use crate::termination::Termination;

/// Binds every configured `userListenAddr`. Per spec §4.4, an address that
/// fails to bind is logged and skipped; only if *none* bind does the
/// iteration abort.
pub async fn bind_all(addrs: &[String]) -> Vec<(String, TcpListener)> {
    let mut bound = Vec::with_capacity(addrs.len());
    for addr in addrs {
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                info!(%addr, "user listener bound");
                bound.push((addr.clone(), listener));
            }
            Err(error) => warn!(%addr, %error, "failed to bind user listener, skipping"),
        }
    }
    bound
}

/// Runs one acceptor per bound listener until `term` fires, pairing every
/// accepted user connection with a freshly opened multiplex stream (spec
/// §4.4). Returns once every acceptor has exited.
pub async fn serve(
    listeners: Vec<(String, TcpListener)>,
    session: SharedSession,
    counter: Arc<ConcurrencyCounter>,
    pool: Arc<BufferPool>,
    term: Arc<Termination>,
) {
    let mut tasks = Vec::with_capacity(listeners.len());
    for (addr, listener) in listeners {
        let session = session.clone();
        let counter = counter.clone();
        let pool = pool.clone();
        let term = term.clone();
        tasks.push(tokio::spawn(accept_loop(
            addr, listener, session, counter, pool, term,
        )));
    }
    for task in tasks {
        let _ = task.await;
    }
}

async fn accept_loop(
    addr: String,
    listener: TcpListener,
    session: SharedSession,
    counter: Arc<ConcurrencyCounter>,
    pool: Arc<BufferPool>,
    term: Arc<Termination>,
) {
    loop {
        let accepted = tokio::select! {
            biased;
            _ = term.wait() => break,
            result = listener.accept() => result,
        };

        let (user_conn, peer) = match accepted {
            Ok(pair) => pair,
            Err(error) => {
                warn!(%addr, %error, "user listener accept failed");
                continue;
            }
        };

        if !counter.try_admit() {
            debug!(%addr, %peer, "concurrency cap reached, rejecting user connection");
            drop(user_conn);
            continue;
        }

        let session = session.clone();
        let counter = counter.clone();
        let pool = pool.clone();
        let term = term.clone();
        tokio::spawn(async move {
            handle_user_connection(user_conn, peer.to_string(), session, counter, pool, term)
                .await;
        });
    }
    debug!(%addr, "user listener acceptor exiting");
}

async fn handle_user_connection(
    user_conn: TcpStream,
    peer: String,
    session: SharedSession,
    counter: Arc<ConcurrencyCounter>,
    pool: Arc<BufferPool>,
    term: Arc<Termination>,
) {
    let stream = match session.open_stream().await {
        Ok(stream) => stream,
        Err(error) => {
            warn!(%peer, %error, "failed to open stream for user connection");
            counter.release();
            drop(user_conn);
            term.signal();
            return;
        }
    };

    debug!(%peer, "stream opened, relaying");
    copy_bidirectional(&pool, user_conn, stream).await;
    counter.release();
    debug!(%peer, "user connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_all_skips_unbindable_addresses_and_keeps_the_rest() {
        let good = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let good_addr = good.local_addr().unwrap().to_string();
        drop(good); // free the port so bind_all can take it again

        let addrs = vec![good_addr.clone(), "not-an-address".to_string()];
        let bound = bind_all(&addrs).await;

        assert_eq!(bound.len(), 1);
        assert_eq!(bound[0].0, good_addr);
    }

    #[tokio::test]
    async fn empty_address_list_binds_nothing() {
        let bound = bind_all(&[]).await;
        assert!(bound.is_empty());
    }
}
