//! Handshake Authenticator (spec §4.2).
//!
//! One-shot, no retry within an iteration. R proves possession of the
//! shared secret by encrypting it to P's public key; P proves possession
//! of the matching private key by decrypting and comparing. No framing, no
//! length prefix — the ciphertext length is exactly the RSA modulus size.

use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::CoreError;
use crate::stream::TunnelStream;

/// R side: encrypt the shared secret to P's public key and write the
/// ciphertext to the transport, then return — ready for Session
/// construction.
pub async fn prove_secret<S: TunnelStream>(
    transport: &mut S,
    public_key: &RsaPublicKey,
    secret: &[u8],
) -> Result<(), CoreError> {
    let mut rng = rand::thread_rng();
    let ciphertext = public_key
        .encrypt(&mut rng, Pkcs1v15Encrypt, secret)
        .map_err(|_| CoreError::EncryptFailed)?;

    tracing::debug!(bytes = ciphertext.len(), "sending handshake ciphertext");
    transport.write_all(&ciphertext).await?;
    Ok(())
}

/// P side: read exactly `modulus_len` bytes, decrypt with the private key,
/// and compare byte-for-byte against the configured secret. Any I/O
/// failure, decryption failure, or mismatch is a handshake failure; the
/// caller closes the transport and retries via the supervisor.
pub async fn authenticate_initiator<S: TunnelStream>(
    transport: &mut S,
    private_key: &RsaPrivateKey,
    expected_secret: &[u8],
) -> Result<(), CoreError> {
    let modulus_len = private_key.size();
    let mut ciphertext = vec![0u8; modulus_len];
    transport.read_exact(&mut ciphertext).await?;

    let plaintext = private_key
        .decrypt(Pkcs1v15Encrypt, &ciphertext)
        .map_err(|_| CoreError::DecryptFailed)?;

    if plaintext != expected_secret {
        return Err(CoreError::SecretMismatch);
    }

    tracing::debug!("handshake authenticated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::traits::PublicKeyParts;
    use tokio::io::duplex;

    fn test_keypair() -> (RsaPrivateKey, RsaPublicKey) {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_key = RsaPublicKey::from(&private_key);
        (private_key, public_key)
    }

    #[tokio::test]
    async fn authenticates_matching_secret() {
        let (private_key, public_key) = test_keypair();
        let (mut r_side, mut p_side) = duplex(1024);

        let secret = b"correct horse battery staple".to_vec();
        let secret_clone = secret.clone();
        let prover = tokio::spawn(async move {
            prove_secret(&mut r_side, &public_key, &secret_clone)
                .await
                .unwrap();
        });

        authenticate_initiator(&mut p_side, &private_key, &secret)
            .await
            .unwrap();
        prover.await.unwrap();
    }

    #[tokio::test]
    async fn rejects_wrong_secret() {
        let (private_key, public_key) = test_keypair();
        let (mut r_side, mut p_side) = duplex(1024);

        tokio::spawn(async move {
            let _ = prove_secret(&mut r_side, &public_key, b"wrong").await;
        });

        let result = authenticate_initiator(&mut p_side, &private_key, b"correct").await;
        assert!(matches!(result, Err(CoreError::SecretMismatch)));
    }

    #[tokio::test]
    async fn ciphertext_is_modulus_sized() {
        let (private_key, public_key) = test_keypair();
        let (mut r_side, mut p_side) = duplex(1024);

        tokio::spawn(async move {
            prove_secret(&mut r_side, &public_key, b"s").await.unwrap();
        });

        let mut buf = vec![0u8; private_key.size()];
        p_side.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf.len(), 256);
    }
}
