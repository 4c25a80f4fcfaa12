//! Private Endpoint (R): dials out to the Public Endpoint, proves
//! possession of the shared secret, and round-robins accepted multiplex
//! streams across the configured local target services.

pub mod config;
pub mod dialer;
pub mod error;
pub mod local_dialer;
pub mod supervisor;

pub use config::{ConfigError, PrivateConfig};
pub use error::IterationError;
