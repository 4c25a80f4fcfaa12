use thiserror::Error;

/// Errors shared by both peers' core machinery: key loading and the
/// handshake. Config and transport errors are defined per-binary since
/// their fatal/retry handling differs between P and R (spec §7).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read key file {path}: {source}")]
    KeyFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("key file {path} is not a recognized PEM type (expected RSA PRIVATE KEY, PRIVATE KEY, or PUBLIC KEY)")]
    UnsupportedKeyType { path: String },

    #[error("failed to parse key material: {0}")]
    KeyParse(String),

    #[error("handshake I/O error: {0}")]
    HandshakeIo(#[from] std::io::Error),

    #[error("handshake failed: shared secret mismatch")]
    SecretMismatch,

    #[error("handshake failed: RSA decryption error")]
    DecryptFailed,

    #[error("handshake failed: RSA encryption error")]
    EncryptFailed,
}
