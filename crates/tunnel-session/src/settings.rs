use serde::Deserialize;

/// The `yamux` config block shared verbatim by both peers (spec §6). The
/// same settings must be used on both sides of a tunnel.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    #[serde(rename = "acceptBacklog", default = "default_accept_backlog")]
    pub accept_backlog: usize,

    #[serde(rename = "enableKeepAlive", default = "default_enable_keep_alive")]
    pub enable_keep_alive: bool,

    #[serde(rename = "keepAliveInterval", default = "default_keep_alive_interval")]
    pub keep_alive_interval_ms: u64,

    #[serde(
        rename = "connectionWriteTimeout",
        default = "default_write_timeout"
    )]
    pub connection_write_timeout_ms: u64,

    /// Per-stream receive window in bytes; 0 selects the yamux crate default.
    #[serde(rename = "maxStreamWindowSize", default)]
    pub max_stream_window_size: u32,

    /// Stream concurrency cap; 0 means unlimited (spec §4.4/§4.5).
    #[serde(rename = "maxConcurrentConnections", default)]
    pub max_concurrent_connections: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            accept_backlog: default_accept_backlog(),
            enable_keep_alive: default_enable_keep_alive(),
            keep_alive_interval_ms: default_keep_alive_interval(),
            connection_write_timeout_ms: default_write_timeout(),
            max_stream_window_size: 0,
            max_concurrent_connections: 0,
        }
    }
}

fn default_accept_backlog() -> usize {
    256
}

fn default_enable_keep_alive() -> bool {
    true
}

fn default_keep_alive_interval() -> u64 {
    30_000
}

fn default_write_timeout() -> u64 {
    10_000
}
