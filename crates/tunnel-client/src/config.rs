use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tunnel_session::SessionSettings;

/// Private Endpoint configuration (spec §6, "Configuration — Private Endpoint").
#[derive(Debug, Clone, Deserialize)]
pub struct PrivateConfig {
    #[serde(rename = "tunnelServerAddr")]
    pub tunnel_server_addr: String,

    /// Local target addresses, selected round-robin per accepted stream.
    #[serde(rename = "localListenAddr")]
    pub local_listen_addr: Vec<String>,

    #[serde(rename = "yamux", default)]
    pub yamux: SessionSettings,

    #[serde(rename = "publicKeyPath")]
    pub public_key_path: String,

    #[serde(rename = "secretToken")]
    pub secret_token: String,

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
    #[error("localListenAddr must not be empty")]
    NoLocalTargets,
    #[error("useMux=false supports at most one localListenAddr entry, got {0}")]
    TooManyTargetsForNoMux(usize),
}

impl PrivateConfig {
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
        if self.local_listen_addr.is_empty() {
            return Err(ConfigError::NoLocalTargets);
        }
        // Multiple addresses in no-mux mode would round-robin across
        // targets that can never receive a stream (spec §9, Open Question
        // 2) — reject rather than silently make the extras unreachable.
        if !self.use_mux && self.local_listen_addr.len() > 1 {
            return Err(ConfigError::TooManyTargetsForNoMux(
                self.local_listen_addr.len(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_minimal_config_with_defaults() {
        let path = write_temp(
            "tunnel-client-config-minimal.json",
            r#"{
                "tunnelServerAddr": "127.0.0.1:9000",
                "localListenAddr": ["127.0.0.1:9001"],
                "publicKeyPath": "key.pub.pem",
                "secretToken": "s"
            }"#,
        );
        let config = PrivateConfig::load(&path).unwrap();
        assert!(config.use_mux);
        assert_eq!(config.local_listen_addr.len(), 1);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn rejects_multiple_targets_without_mux() {
        let path = write_temp(
            "tunnel-client-config-no-mux.json",
            r#"{
                "tunnelServerAddr": "127.0.0.1:9000",
                "localListenAddr": ["127.0.0.1:9001", "127.0.0.1:9002"],
                "publicKeyPath": "key.pub.pem",
                "secretToken": "s",
                "useMux": false
            }"#,
        );
        let result = PrivateConfig::load(&path);
        assert!(matches!(
            result,
            Err(ConfigError::TooManyTargetsForNoMux(2))
        ));
        let _ = std::fs::remove_file(path);
    }
}
