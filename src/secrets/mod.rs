//! Key material and the deterministic secret chain.
//!
//! All key material lives in [`SecretBytes`]: zeroed on drop and redacted in
//! `Debug` output, so secrets never leak through logs or error chains.

pub mod derived;
pub mod device;
pub mod user;

pub use derived::{DeviceFileSecret, DeviceMetadataSecret};
pub use device::DeviceSecret;
pub use user::{
    UserHashedAuthenticationPassword, UserHashedEncryptionPassword, UserLocalEncryptionSecret,
    UserPassword,
};

use zeroize::Zeroizing;

/// Raw key material; zeroed on drop, redacted in `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretBytes(Zeroizing<Vec<u8>>);

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[u8]> for SecretBytes {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }
}

impl From<Vec<u8>> for SecretBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBytes([REDACTED])")
    }
}

impl std::fmt::Display for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}
