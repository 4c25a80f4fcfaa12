//! Scenario S4 (spec §8, "Concurrency cap"): with `maxConcurrentConnections
//! = 2`, a third simultaneous user connection is rejected without ever
//! opening a stream, while the first two keep relaying.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tunnel_core::{BufferPool, ConcurrencyCounter};
use tunnel_server::listener_set::{bind_all, serve};
use tunnel_server::termination::Termination;
use tunnel_session::{Session, SessionSettings};
use yamux::Mode;

async fn loopback_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (accept_result, client) = tokio::join!(listener.accept(), TcpStream::connect(addr));
    let (server, _) = accept_result.unwrap();
    (server, client.unwrap())
}

/// An in-process echo target standing in for R's local service, reached
/// through a real multiplex session so each admitted user connection gets a
/// genuine end-to-end relay.
async fn accept_and_echo_streams(session: Arc<Session>) {
    loop {
        let mut stream = match session.accept_stream().await {
            Ok(s) => s,
            Err(_) => return,
        };
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            loop {
                let n = match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => n,
                };
                if stream.write_all(&buf[..n]).await.is_err() {
                    return;
                }
            }
        });
    }
}

#[tokio::test]
async fn third_concurrent_user_connection_is_rejected_first_two_keep_working() {
    let (server_tcp, client_tcp) = loopback_pair().await;
    let settings = SessionSettings::default();

    // P opens streams (Mode::Client); R accepts and echoes them back.
    let p_session = Arc::new(Session::new(client_tcp, &settings, Mode::Client));
    let r_session = Arc::new(Session::new(server_tcp, &settings, Mode::Server));
    tokio::spawn(accept_and_echo_streams(r_session));

    let listeners = bind_all(&["127.0.0.1:0".to_string()]).await;
    assert_eq!(listeners.len(), 1);
    let user_listen_addr = listeners[0].1.local_addr().unwrap();

    let counter = Arc::new(ConcurrencyCounter::new(2));
    let pool = Arc::new(BufferPool::new());
    let term = Arc::new(Termination::new());

    tokio::spawn(serve(listeners, p_session.clone(), counter, pool, term));

    let mut first = TcpStream::connect(user_listen_addr).await.unwrap();
    let mut second = TcpStream::connect(user_listen_addr).await.unwrap();

    first.write_all(b"one").await.unwrap();
    let mut buf = [0u8; 3];
    first.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"one");

    second.write_all(b"two").await.unwrap();
    second.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"two");

    // The third connection arrives while the first two are still open and
    // must be closed by P without ever reaching a local echo — so reading
    // from it yields EOF rather than an echoed byte.
    let mut third = TcpStream::connect(user_listen_addr).await.unwrap();
    let mut one_byte = [0u8; 1];
    let read_result =
        tokio::time::timeout(Duration::from_secs(2), third.read(&mut one_byte)).await;
    match read_result {
        Ok(Ok(0)) => {} // closed immediately, as expected
        Ok(Ok(n)) => panic!("expected rejection, got {n} bytes"),
        Ok(Err(_)) => {} // reset is also an acceptable rejection signal
        Err(_) => panic!("third connection was not rejected within the timeout"),
    }

    // The first two connections remain healthy.
    first.write_all(b"ok").await.unwrap();
    let mut buf2 = [0u8; 2];
    first.read_exact(&mut buf2).await.unwrap();
    assert_eq!(&buf2, b"ok");
}
