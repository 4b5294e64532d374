//! Display sealing for sensitive identifiers (AES-256-GCM).
//!
//! Buyer ids are stored in clear inside the ledger and hashed as such; only
//! their on-screen rendition is sealed. Output is hex of `nonce || ciphertext`.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed")]
    SealFailed,

    #[error("decryption failed -- wrong passphrase or corrupted text")]
    OpenFailed,

    #[error("sealed text is not valid hex")]
    Encoding(#[from] hex::FromHexError),
}

/// Symmetric key derived from an application-held passphrase.
#[derive(Clone)]
pub struct DisplayKey {
    key: [u8; 32],
}

impl DisplayKey {
    /// Key = SHA-256(passphrase).
    pub fn from_passphrase(passphrase: &str) -> Self {
        let key: [u8; 32] = Sha256::digest(passphrase.as_bytes()).into();
        Self { key }
    }

    /// Seal `plaintext` under a fresh random nonce.
    pub fn seal(&self, plaintext: &str) -> Result<String, CryptoError> {
        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| CryptoError::SealFailed)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| CryptoError::SealFailed)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(hex::encode(out))
    }

    /// Recover the plaintext of a value produced by [`DisplayKey::seal`].
    pub fn open(&self, sealed: &str) -> Result<String, CryptoError> {
        let data = hex::decode(sealed)?;
        if data.len() < NONCE_LEN {
            return Err(CryptoError::OpenFailed);
        }
        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| CryptoError::OpenFailed)?;
        let plain = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CryptoError::OpenFailed)?;
        String::from_utf8(plain).map_err(|_| CryptoError::OpenFailed)
    }
}

impl std::fmt::Debug for DisplayKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DisplayKey(..)")
    }
}
