//! Password-derived user secrets.
//!
//! A user's password is stretched with PBKDF2-HMAC-SHA512 into two
//! independent hashed passwords: one presented to the server for
//! authentication and one that never leaves the client, from which the local
//! secret protecting the device secret at rest is derived.

use hkdf::Hkdf;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;

use crate::config::SecretsConfig;
use crate::error::{Error, Result};
use crate::model::UserId;
use crate::secrets::derived::{open, seal};
use crate::secrets::SecretBytes;

/// A user's raw password, pending derivation.
#[derive(Debug, Clone)]
pub struct UserPassword {
    pub user: UserId,
    pub salt: String,
    password: SecretBytes,
    pub target: SecretsConfig,
}

impl UserPassword {
    pub fn new(user: UserId, salt: &str, password: &str, target: SecretsConfig) -> Self {
        Self {
            user,
            salt: salt.to_string(),
            password: SecretBytes::new(password.as_bytes().to_vec()),
            target,
        }
    }

    pub fn to_hashed_authentication_password(&self) -> UserHashedAuthenticationPassword {
        let params = &self.target.derivation.authentication;

        UserHashedAuthenticationPassword {
            user: self.user,
            hashed_password: derive_password(
                self.password.as_bytes(),
                &format!("{}-authentication-{}", params.salt_prefix, self.salt),
                params.iterations,
                params.secret_size,
            ),
        }
    }

    pub fn to_hashed_encryption_password(&self) -> UserHashedEncryptionPassword {
        let params = &self.target.derivation.encryption;

        UserHashedEncryptionPassword {
            user: self.user,
            hashed_password: derive_password(
                self.password.as_bytes(),
                &format!("{}-encryption-{}", params.salt_prefix, self.salt),
                params.iterations,
                params.secret_size,
            ),
            target: self.target.clone(),
        }
    }
}

fn derive_password(password: &[u8], salt: &str, iterations: u32, size: usize) -> SecretBytes {
    let mut derived = vec![0u8; size];
    pbkdf2_hmac::<Sha512>(password, salt.as_bytes(), iterations, &mut derived);
    SecretBytes::new(derived)
}

/// The hashed password presented to the server instead of the raw one.
#[derive(Debug, Clone)]
pub struct UserHashedAuthenticationPassword {
    pub user: UserId,
    hashed_password: SecretBytes,
}

impl UserHashedAuthenticationPassword {
    /// Renders the password for transmission, consuming it; it can only be
    /// extracted once.
    pub fn extract(self) -> String {
        hex::encode(self.hashed_password.as_bytes())
    }
}

/// The client-side hashed password; never transmitted.
#[derive(Debug, Clone)]
pub struct UserHashedEncryptionPassword {
    pub user: UserId,
    hashed_password: SecretBytes,
    target: SecretsConfig,
}

impl UserHashedEncryptionPassword {
    /// Derives the secret protecting the device secret at rest.
    pub fn to_local_encryption_secret(&self) -> Result<UserLocalEncryptionSecret> {
        let sizes = self.target.encryption.device_secret;

        let hkdf = Hkdf::<Sha512>::new(
            Some(self.user.as_bytes()),
            self.hashed_password.as_bytes(),
        );

        let mut key = vec![0u8; sizes.key_size];
        hkdf.expand(format!("{}-local-key", self.user).as_bytes(), &mut key)
            .map_err(|e| Error::EncryptionFailed {
                reason: format!("Key derivation failed: {}", e),
            })?;

        let mut iv = vec![0u8; sizes.iv_size];
        hkdf.expand(format!("{}-local-iv", self.user).as_bytes(), &mut iv)
            .map_err(|e| Error::EncryptionFailed {
                reason: format!("IV derivation failed: {}", e),
            })?;

        Ok(UserLocalEncryptionSecret {
            user: self.user,
            key: SecretBytes::new(key),
            iv: SecretBytes::new(iv),
        })
    }
}

/// Password-derived secret guarding the device secret at rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLocalEncryptionSecret {
    pub user: UserId,
    key: SecretBytes,
    iv: SecretBytes,
}

impl UserLocalEncryptionSecret {
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        seal(self.key.as_bytes(), self.iv.as_bytes(), plaintext)
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        open(self.key.as_bytes(), self.iv.as_bytes(), ciphertext)
    }
}
