//! The device secret and its deterministic per-entity derivations.

use hkdf::Hkdf;
use sha2::Sha512;
use std::path::Path;

use crate::config::SecretsConfig;
use crate::error::{Error, Result};
use crate::model::entity::Checksum;
use crate::model::{CrateId, DeviceId, UserId};
use crate::secrets::derived::{DeviceFileSecret, DeviceMetadataSecret};
use crate::secrets::user::UserLocalEncryptionSecret;
use crate::secrets::SecretBytes;

/// The single random secret of a device, from which every other secret is
/// derived.
///
/// Derivations use HKDF-SHA512 keyed by the secret, salted and labelled with
/// entity-identifying data, so the same entity always yields the same key
/// material on any client holding the device secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSecret {
    pub user: UserId,
    pub device: DeviceId,
    secret: SecretBytes,
    pub target: SecretsConfig,
}

impl DeviceSecret {
    pub fn new(user: UserId, device: DeviceId, secret: SecretBytes, target: SecretsConfig) -> Self {
        Self {
            user,
            device,
            secret,
            target,
        }
    }

    /// Derives the secret protecting the content of one crate part, keyed by
    /// the crate-part path.
    ///
    /// The checksum of the captured content takes part in the derivation, so
    /// every version of an entity is protected by different key material, and
    /// every part of a multi-part file by a different key and IV.
    pub fn to_file_secret(&self, path: &Path, checksum: &Checksum) -> Result<DeviceFileSecret> {
        let path_rendered = path.to_string_lossy();
        let checksum_hex = checksum.to_hex();

        let mut salt = Vec::new();
        salt.extend_from_slice(self.user.as_bytes());
        salt.extend_from_slice(self.device.as_bytes());
        salt.extend_from_slice(path_rendered.as_bytes());
        salt.extend_from_slice(checksum.as_bytes());

        let key_info = format!(
            "{}-{}-{}-{}-key",
            self.user, self.device, path_rendered, checksum_hex
        );
        let iv_info = format!(
            "{}-{}-{}-{}-iv",
            self.user, self.device, path_rendered, checksum_hex
        );

        let (key, iv) = self.expand(
            &salt,
            &key_info,
            &iv_info,
            self.target.encryption.file.key_size,
            self.target.encryption.file.iv_size,
        )?;

        Ok(DeviceFileSecret {
            file: path.to_path_buf(),
            key,
            iv,
        })
    }

    /// Derives the secret protecting one metadata crate.
    pub fn to_metadata_secret(&self, metadata_crate: CrateId) -> Result<DeviceMetadataSecret> {
        let mut salt = Vec::new();
        salt.extend_from_slice(self.user.as_bytes());
        salt.extend_from_slice(self.device.as_bytes());
        salt.extend_from_slice(metadata_crate.as_bytes());

        let key_info = format!("{}-{}-{}-key", self.user, self.device, metadata_crate);
        let iv_info = format!("{}-{}-{}-iv", self.user, self.device, metadata_crate);

        let (key, iv) = self.expand(
            &salt,
            &key_info,
            &iv_info,
            self.target.encryption.metadata.key_size,
            self.target.encryption.metadata.iv_size,
        )?;

        Ok(DeviceMetadataSecret { key, iv })
    }

    /// Encrypts the raw secret for storage, under a password-derived local
    /// secret.
    pub fn encrypted(&self, local: &UserLocalEncryptionSecret) -> Result<Vec<u8>> {
        local.encrypt(self.secret.as_bytes())
    }

    /// Restores a device secret from storage; a wrong password surfaces as a
    /// decryption failure.
    pub fn decrypted(
        user: UserId,
        device: DeviceId,
        encrypted_secret: &[u8],
        local: &UserLocalEncryptionSecret,
        target: SecretsConfig,
    ) -> Result<Self> {
        let secret = local.decrypt(encrypted_secret)?;

        Ok(Self {
            user,
            device,
            secret: SecretBytes::new(secret),
            target,
        })
    }

    fn expand(
        &self,
        salt: &[u8],
        key_info: &str,
        iv_info: &str,
        key_size: usize,
        iv_size: usize,
    ) -> Result<(SecretBytes, SecretBytes)> {
        let hkdf = Hkdf::<Sha512>::new(Some(salt), self.secret.as_bytes());

        let mut key = vec![0u8; key_size];
        hkdf.expand(key_info.as_bytes(), &mut key)
            .map_err(|e| Error::EncryptionFailed {
                reason: format!("Key derivation failed: {}", e),
            })?;

        let mut iv = vec![0u8; iv_size];
        hkdf.expand(iv_info.as_bytes(), &mut iv)
            .map_err(|e| Error::EncryptionFailed {
                reason: format!("IV derivation failed: {}", e),
            })?;

        Ok((SecretBytes::new(key), SecretBytes::new(iv)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EncryptionSecretConfig, SecretsConfig};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn config() -> SecretsConfig {
        let mut config = SecretsConfig::default();
        config.encryption.file = EncryptionSecretConfig {
            key_size: 16,
            iv_size: 12,
        };
        config.encryption.metadata = EncryptionSecretConfig {
            key_size: 16,
            iv_size: 12,
        };
        config
    }

    fn secret() -> DeviceSecret {
        DeviceSecret::new(
            Uuid::parse_str("00000000-0000-4000-8000-000000000001").unwrap(),
            Uuid::parse_str("00000000-0000-4000-8000-000000000002").unwrap(),
            SecretBytes::new(b"some-secret".to_vec()),
            config(),
        )
    }

    #[test]
    fn test_file_secrets_match_known_derivations() {
        let derived = secret()
            .to_file_secret(
                Path::new("/tmp/file/one"),
                &Checksum::from_be_bytes(&[0x01, 0xe2, 0x40]),
            )
            .unwrap();

        assert_eq!(derived.file, PathBuf::from("/tmp/file/one"));
        assert_eq!(hex::encode(derived.key.as_bytes()), "13cee69640b5ffa07a789b8e2b213f04");
        assert_eq!(hex::encode(derived.iv.as_bytes()), "8be18313a5092164067f1edc");
    }

    #[test]
    fn test_metadata_secrets_match_known_derivations() {
        let metadata_crate = Uuid::parse_str("00000000-0000-4000-8000-00000000000a").unwrap();

        let derived = secret().to_metadata_secret(metadata_crate).unwrap();

        assert_eq!(hex::encode(derived.key.as_bytes()), "61be4cbf4cae7a8ab93d6ce278b26952");
        assert_eq!(hex::encode(derived.iv.as_bytes()), "0c2a8c4704e18bf04393c30f");
    }

    #[test]
    fn test_derivations_are_deterministic_and_entity_specific() {
        let checksum = Checksum::from_u64(123);

        let a = secret().to_file_secret(Path::new("/tmp/a"), &checksum).unwrap();
        let b = secret().to_file_secret(Path::new("/tmp/a"), &checksum).unwrap();
        let other_path = secret().to_file_secret(Path::new("/tmp/b"), &checksum).unwrap();
        let other_content = secret()
            .to_file_secret(Path::new("/tmp/a"), &Checksum::from_u64(124))
            .unwrap();

        assert_eq!(a, b);
        assert_ne!(a.key, other_path.key);
        assert_ne!(a.key, other_content.key);
    }

    fn local_secret(password: &str) -> crate::secrets::user::UserLocalEncryptionSecret {
        crate::secrets::user::UserPassword::new(
            Uuid::parse_str("00000000-0000-4000-8000-000000000001").unwrap(),
            "test",
            password,
            config(),
        )
        .to_hashed_encryption_password()
        .to_local_encryption_secret()
        .unwrap()
    }

    #[test]
    fn test_device_secrets_round_trip_through_storage() {
        let original = secret();
        let local = local_secret("foo");

        let stored = original.encrypted(&local).unwrap();
        let restored =
            DeviceSecret::decrypted(original.user, original.device, &stored, &local, config())
                .unwrap();

        assert_eq!(restored, original);
    }

    #[test]
    fn test_wrong_passwords_fail_to_restore_device_secrets() {
        let original = secret();

        let stored = original.encrypted(&local_secret("foo")).unwrap();
        let result = DeviceSecret::decrypted(
            original.user,
            original.device,
            &stored,
            &local_secret("other"),
            config(),
        );

        assert!(matches!(result, Err(Error::DecryptionFailed { .. })));
    }

    #[test]
    fn test_password_changes_preserve_the_underlying_secret() {
        let original = secret();
        let old = local_secret("foo");
        let new = local_secret("bar");

        let stored = original.encrypted(&old).unwrap();
        let restored =
            DeviceSecret::decrypted(original.user, original.device, &stored, &old, config())
                .unwrap();
        let restored_again = DeviceSecret::decrypted(
            original.user,
            original.device,
            &restored.encrypted(&new).unwrap(),
            &new,
            config(),
        )
        .unwrap();

        assert_eq!(restored_again, original);
    }

    #[test]
    fn test_device_secrets_redact_their_content() {
        let rendered = format!("{:?}", secret());

        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("some-secret"));
    }
}
