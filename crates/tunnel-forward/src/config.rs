use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

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

fn load<T: serde::de::DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
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

/// Entry side: accepts plaintext and relays it TLS-encrypted to a receiver
/// (spec §4.10, mode b).
#[derive(Debug, Clone, Deserialize)]
pub struct EntryConfig {
    #[serde(rename = "listenAddr")]
    pub listen_addr: String,

    #[serde(rename = "receiverAddr")]
    pub receiver_addr: String,

    #[serde(rename = "caPath")]
    pub ca_path: Option<String>,

    #[serde(rename = "insecureSkipVerify", default)]
    pub insecure_skip_verify: bool,
}

impl EntryConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load(path)
    }
}

/// Receiver side: accepts TLS and relays it plaintext to the final target
/// (spec §4.10, mode b).
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiverConfig {
    #[serde(rename = "listenAddr")]
    pub listen_addr: String,

    #[serde(rename = "targetAddr")]
    pub target_addr: String,

    #[serde(rename = "certPath")]
    pub cert_path: String,

    #[serde(rename = "keyPath")]
    pub key_path: String,
}

impl ReceiverConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_entry_config() {
        let path = std::env::temp_dir().join("tunnel-forward-entry-config.json");
        std::fs::write(
            &path,
            r#"{"listenAddr": "0.0.0.0:8080", "receiverAddr": "receiver.example.com:9443"}"#,
        )
        .unwrap();
        let config = EntryConfig::load(&path).unwrap();
        assert!(!config.insecure_skip_verify);
        assert_eq!(config.receiver_addr, "receiver.example.com:9443");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn loads_receiver_config() {
        let path = std::env::temp_dir().join("tunnel-forward-receiver-config.json");
        std::fs::write(
            &path,
            r#"{"listenAddr": "0.0.0.0:9443", "targetAddr": "127.0.0.1:9000", "certPath": "cert.pem", "keyPath": "key.pem"}"#,
        )
        .unwrap();
        let config = ReceiverConfig::load(&path).unwrap();
        assert_eq!(config.target_addr, "127.0.0.1:9000");
        let _ = std::fs::remove_file(path);
    }
}
