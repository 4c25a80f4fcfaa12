//! The single capability the Bidirectional Copier is written against:
//! "a reliable ordered byte channel" (spec.md §9). A plain `TcpStream` and a
//! multiplexed `yamux::Stream` both satisfy it for free via the blanket impl
//! below, so the copier never needs to know which kind of stream it holds.

use tokio::io::{AsyncRead, AsyncWrite};

/// A reliable, ordered, bidirectional byte channel with cooperative close.
///
/// This is deliberately a marker trait over `AsyncRead + AsyncWrite`: the
/// copier only ever needs those two capabilities, plus `Unpin + Send` so it
/// can be held across `.await` points and moved into spawned tasks.
pub trait TunnelStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + ?Sized> TunnelStream for T {}

/// A boxed, type-erased tunnel stream, used wherever a component needs to
/// hold "a TCP connection or a multiplex stream, I don't care which".
pub type BoxedStream = Box<dyn TunnelStream>;
