use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tunnel_session::SessionSettings;

/// Public Endpoint configuration (spec §6, "Configuration — Public Endpoint").
#[derive(Debug, Clone, Deserialize)]
pub struct PublicConfig {
    #[serde(rename = "tunnelListenAddr")]
    pub tunnel_listen_addr: String,

    /// External user bind addresses. An empty list means every iteration is
    /// abandoned before it serves anything (spec §4.4).
    #[serde(rename = "userListenAddr")]
    pub user_listen_addr: Vec<String>,

    #[serde(rename = "yamux", default)]
    pub yamux: SessionSettings,

    #[serde(rename = "privateKeyPath")]
    pub private_key_path: String,

    #[serde(rename = "secretToken")]
    pub secret_token: String,

    /// If false, skip the Session and splice the tunnel transport directly
    /// into the first accepted user connection (spec §9 "Degenerate no-mux
    /// mode"). Only one `userListenAddr` entry is permitted in that mode.
    #[serde(rename = "useMux", default = "default_use_mux")]
    pub use_mux: bool,
}

fn default_use_mux() -> bool {
    true
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config JSON in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("userListenAddr must not be empty")]
    NoUserListeners,
    #[error("useMux=false supports at most one userListenAddr entry, got {0}")]
    TooManyListenersForNoMux(usize),
}

impl PublicConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let text = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_ref.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_ref.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.user_listen_addr.is_empty() {
            return Err(ConfigError::NoUserListeners);
        }
        if !self.use_mux && self.user_listen_addr.len() > 1 {
            return Err(ConfigError::TooManyListenersForNoMux(
                self.user_listen_addr.len(),
            ));
        }
        Ok(())
    }
}
