//! Shared primitives for the reverse tunnel family: the capability trait
//! both plain and multiplexed streams implement, the bidirectional copier
//! built against it, the RSA handshake, and the admission counter.

pub mod copier;
pub mod counter;
pub mod error;
pub mod handshake;
pub mod keys;
pub mod stream;

pub use copier::{copy_bidirectional, BufferPool};
pub use counter::ConcurrencyCounter;
pub use error::CoreError;
pub use handshake::{authenticate_initiator, prove_secret};
pub use stream::TunnelStream;
