use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Trivial TCP port forwarder configuration (spec §1, mode c).
#[derive(Debug, Clone, Deserialize)]
pub struct PlainConfig {
    #[serde(rename = "listenAddr")]
    pub listen_addr: String,

    #[serde(rename = "targetAddr")]
    pub target_addr: String,
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
}

impl PlainConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let text = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_ref.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_ref.display().to_string(),
            source,
        })
    }
}
