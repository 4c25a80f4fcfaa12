//! Trivial TCP port forwarder (spec §1 mode c): the degenerate case of the
//! TLS forwarder in `tunnel-forward` without the TLS leg. Shares the same
//! Bidirectional Copier from `tunnel-core`.

pub mod config;

pub use config::{ConfigError, PlainConfig};
