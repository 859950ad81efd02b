//! Secrets derived from the device secret, and their AEAD transforms.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::secrets::SecretBytes;

/// Per-entity secret used for crate content; derived deterministically, never
/// stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFileSecret {
    pub file: PathBuf,
    pub(crate) key: SecretBytes,
    pub(crate) iv: SecretBytes,
}

impl DeviceFileSecret {
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        seal(self.key.as_bytes(), self.iv.as_bytes(), plaintext)
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        open(self.key.as_bytes(), self.iv.as_bytes(), ciphertext)
    }
}

/// Per-crate secret used for the metadata envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMetadataSecret {
    pub(crate) key: SecretBytes,
    pub(crate) iv: SecretBytes,
}

impl DeviceMetadataSecret {
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        seal(self.key.as_bytes(), self.iv.as_bytes(), plaintext)
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        open(self.key.as_bytes(), self.iv.as_bytes(), ciphertext)
    }
}

// AES-GCM with the cipher chosen by key size; the tag is appended to the
// ciphertext.

pub(crate) fn seal(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    if iv.len() < 12 {
        return Err(Error::EncryptionFailed {
            reason: format!("Unsupported IV size [{}]", iv.len()),
        });
    }
    let nonce = Nonce::from_slice(&iv[..12]);

    match key.len() {
        16 => Aes128Gcm::new_from_slice(key)
            .map_err(|e| Error::EncryptionFailed { reason: e.to_string() })?
            .encrypt(nonce, plaintext)
            .map_err(|_| Error::EncryptionFailed {
                reason: "AEAD encryption failed".to_string(),
            }),
        32 => Aes256Gcm::new_from_slice(key)
            .map_err(|e| Error::EncryptionFailed { reason: e.to_string() })?
            .encrypt(nonce, plaintext)
            .map_err(|_| Error::EncryptionFailed {
                reason: "AEAD encryption failed".to_string(),
            }),
        other => Err(Error::EncryptionFailed {
            reason: format!("Unsupported key size [{}]", other),
        }),
    }
}

pub(crate) fn open(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if iv.len() < 12 {
        return Err(Error::DecryptionFailed {
            reason: format!("Unsupported IV size [{}]", iv.len()),
        });
    }
    let nonce = Nonce::from_slice(&iv[..12]);

    match key.len() {
        16 => Aes128Gcm::new_from_slice(key)
            .map_err(|e| Error::DecryptionFailed { reason: e.to_string() })?
            .decrypt(nonce, ciphertext)
            .map_err(|_| Error::DecryptionFailed {
                reason: "AEAD authentication failed".to_string(),
            }),
        32 => Aes256Gcm::new_from_slice(key)
            .map_err(|e| Error::DecryptionFailed { reason: e.to_string() })?
            .decrypt(nonce, ciphertext)
            .map_err(|_| Error::DecryptionFailed {
                reason: "AEAD authentication failed".to_string(),
            }),
        other => Err(Error::DecryptionFailed {
            reason: format!("Unsupported key size [{}]", other),
        }),
    }
}
