//! Secret derivation and encryption parameters

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Minimum allowed symmetric key size, in bytes
pub const MIN_KEY_SIZE: usize = 16;

/// Minimum allowed IV size, in bytes
pub const MIN_IV_SIZE: usize = 12;

/// Minimum allowed derived secret size, in bytes
pub const MIN_SECRET_SIZE: usize = 16;

/// Minimum allowed number of key derivation iterations
pub const MIN_ITERATIONS: u32 = 100_000;

/// Parameters for all secret derivation and encryption operations.
///
/// All sizes are in bytes. The configuration is validated on load; invalid
/// values are rejected rather than silently clamped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretsConfig {
    pub derivation: DerivationConfig,
    pub encryption: EncryptionConfig,
}

/// Password-based key derivation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationConfig {
    pub encryption: KeyDerivationConfig,
    pub authentication: KeyDerivationConfig,
}

/// PBKDF2 parameters for one derivation purpose
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDerivationConfig {
    /// Size of the derived secret, in bytes
    pub secret_size: usize,
    /// Number of PBKDF2 iterations
    pub iterations: u32,
    /// Prefix mixed into the derivation salt
    pub salt_prefix: String,
}

/// Key and IV sizes for each class of encrypted payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionConfig {
    pub file: EncryptionSecretConfig,
    pub metadata: EncryptionSecretConfig,
    pub device_secret: EncryptionSecretConfig,
}

/// Key and IV sizes for one class of encrypted payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionSecretConfig {
    pub key_size: usize,
    pub iv_size: usize,
}

impl EncryptionSecretConfig {
    pub fn validated(self) -> Result<Self> {
        if self.key_size < MIN_KEY_SIZE {
            return Err(Error::InvalidConfiguration {
                reason: format!("key must not be smaller than {} bytes", MIN_KEY_SIZE),
            });
        }
        if self.iv_size < MIN_IV_SIZE {
            return Err(Error::InvalidConfiguration {
                reason: format!("iv must not be smaller than {} bytes", MIN_IV_SIZE),
            });
        }
        Ok(self)
    }
}

impl KeyDerivationConfig {
    pub fn validated(self) -> Result<Self> {
        if self.secret_size < MIN_SECRET_SIZE {
            return Err(Error::InvalidConfiguration {
                reason: format!("secret must not be smaller than {} bytes", MIN_SECRET_SIZE),
            });
        }
        if self.iterations < MIN_ITERATIONS {
            return Err(Error::InvalidConfiguration {
                reason: format!("iterations must not be fewer than {}", MIN_ITERATIONS),
            });
        }
        Ok(self)
    }
}

impl SecretsConfig {
    /// Validate all nested parameters, returning the configuration unchanged
    /// when every bound holds.
    pub fn validated(self) -> Result<Self> {
        self.derivation.encryption.clone().validated()?;
        self.derivation.authentication.clone().validated()?;
        self.encryption.file.validated()?;
        self.encryption.metadata.validated()?;
        self.encryption.device_secret.validated()?;
        Ok(self)
    }

    /// Load and validate a configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validated()
    }

    /// Persist the configuration as TOML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            derivation: DerivationConfig {
                encryption: KeyDerivationConfig {
                    secret_size: 32,
                    iterations: 150_000,
                    salt_prefix: "stowage".to_string(),
                },
                authentication: KeyDerivationConfig {
                    secret_size: 32,
                    iterations: 150_000,
                    salt_prefix: "stowage".to_string(),
                },
            },
            encryption: EncryptionConfig {
                file: EncryptionSecretConfig {
                    key_size: 32,
                    iv_size: 12,
                },
                metadata: EncryptionSecretConfig {
                    key_size: 32,
                    iv_size: 12,
                },
                device_secret: EncryptionSecretConfig {
                    key_size: 32,
                    iv_size: 12,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() -> Result<()> {
        SecretsConfig::default().validated()?;
        Ok(())
    }

    #[test]
    fn test_rejects_small_keys() {
        let mut config = SecretsConfig::default();
        config.encryption.file.key_size = 8;

        let result = config.validated();
        assert!(matches!(result, Err(Error::InvalidConfiguration { .. })));
    }

    #[test]
    fn test_rejects_low_iteration_counts() {
        let mut config = SecretsConfig::default();
        config.derivation.authentication.iterations = 1_000;

        let result = config.validated();
        assert!(matches!(result, Err(Error::InvalidConfiguration { .. })));
    }

    #[test]
    fn test_toml_round_trip() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("secrets.toml");

        let config = SecretsConfig::default();
        config.save(&path)?;

        let loaded = SecretsConfig::load(&path)?;
        assert_eq!(loaded, config);

        Ok(())
    }
}
