//! TLS-wrapped point-to-point forwarder (spec §1 mode b, §4.10): an entry
//! accepts plaintext and relays it encrypted to a receiver that decrypts
//! and delivers it to a target. No multiplexing, authentication, or
//! supervision — just the Bidirectional Copier reused from `tunnel-core`
//! around a TLS leg instead of a plain one.

pub mod config;
pub mod tls;

pub use config::{ConfigError, EntryConfig, ReceiverConfig};
pub use tls::TlsConfigError;
