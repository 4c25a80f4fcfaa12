//! Key material loading (spec §6, "Key formats accepted").
//!
//! Private keys: PEM `RSA PRIVATE KEY` (PKCS#1) or `PRIVATE KEY` (PKCS#8
//! containing RSA). Public keys: PEM `PUBLIC KEY` (PKIX SubjectPublicKeyInfo).
//! Any other PEM type is a fatal config-time error.

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::CoreError;

pub fn load_private_key(path: &str) -> Result<RsaPrivateKey, CoreError> {
    let pem = std::fs::read_to_string(path).map_err(|source| CoreError::KeyFileRead {
        path: path.to_string(),
        source,
    })?;

    if let Ok(key) = RsaPrivateKey::from_pkcs1_pem(&pem) {
        return Ok(key);
    }
    if let Ok(key) = RsaPrivateKey::from_pkcs8_pem(&pem) {
        return Ok(key);
    }

    Err(CoreError::UnsupportedKeyType {
        path: path.to_string(),
    })
}

pub fn load_public_key(path: &str) -> Result<RsaPublicKey, CoreError> {
    let pem = std::fs::read_to_string(path).map_err(|source| CoreError::KeyFileRead {
        path: path.to_string(),
        source,
    })?;

    RsaPublicKey::from_public_key_pem(&pem).map_err(|_| CoreError::UnsupportedKeyType {
        path: path.to_string(),
    })
}
