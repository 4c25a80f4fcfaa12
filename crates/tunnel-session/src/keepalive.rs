//! TCP-level keepalive for the Tunnel Transport.
//!
//! The Rust `yamux` crate, unlike the Go hashicorp/yamux it's standing in
//! for, doesn't ping at the multiplex layer — so `yamux.enableKeepAlive`
//! and `yamux.keepAliveInterval` are applied to the underlying TCP socket
//! instead via `socket2`'s `SO_KEEPALIVE`. Detecting a dead peer within
//! `keepAliveInterval` (spec §5) is then the OS's job.

use std::time::Duration;

use tokio::net::TcpStream;

#[cfg(unix)]
pub fn enable_keepalive(stream: &TcpStream, interval: Duration) -> std::io::Result<()> {
    use std::os::unix::io::{AsRawFd, FromRawFd, IntoRawFd};

    let raw = stream.as_raw_fd();
    // SAFETY: `raw` is a valid, open socket fd for the lifetime of `stream`;
    // we hand it back via `into_raw_fd` below instead of letting `socket2`
    // close it on drop.
    let socket = unsafe { socket2::Socket::from_raw_fd(raw) };
    let keepalive = socket2::TcpKeepalive::new()
        .with_time(interval)
        .with_interval(interval);
    let result = socket.set_tcp_keepalive(&keepalive);
    let _ = socket.into_raw_fd();
    result
}

#[cfg(windows)]
pub fn enable_keepalive(stream: &TcpStream, interval: Duration) -> std::io::Result<()> {
    use std::os::windows::io::{AsRawSocket, FromRawSocket, IntoRawSocket};

    let raw = stream.as_raw_socket();
    // SAFETY: see the unix impl above; ownership is handed back via
    // `into_raw_socket`.
    let socket = unsafe { socket2::Socket::from_raw_socket(raw) };
    let keepalive = socket2::TcpKeepalive::new()
        .with_time(interval)
        .with_interval(interval);
    let result = socket.set_tcp_keepalive(&keepalive);
    let _ = socket.into_raw_socket();
    result
}
