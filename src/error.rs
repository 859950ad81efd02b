//! Error types for stowage operations

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Main error type for stowage operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Rule [{rule}] matched no files")]
    RuleMatchingFailure { rule: String },

    #[error("Invalid rule pattern [{pattern}]: {reason}")]
    InvalidRulePattern { pattern: String, reason: String },

    #[error("Metadata for entity [{}] not found", entity.display())]
    MetadataNotFound { entity: PathBuf },

    #[error(
        "Expected metadata for entity [{}] but none was found in metadata for entry [{entry}]",
        entity.display()
    )]
    MetadataNotFoundInEntry { entity: PathBuf, entry: Uuid },

    #[error("Failed to pull crate [{crate_id}] for entity [{}]", entity.display())]
    CratePullFailed { crate_id: Uuid, entity: PathBuf },

    #[error("Unexpected last part ID [{last_part}] encountered for an entity with [{parts}] crate(s)")]
    UnexpectedCrateParts { last_part: usize, parts: usize },

    #[error("Mismatched entity metadata; current is a {current} but existing is a {existing}")]
    MismatchedEntityVariants { current: String, existing: String },

    #[error("Encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    #[error("Decryption failed: {reason}")]
    DecryptionFailed { reason: String },

    #[error("Unsupported compression algorithm: {name}")]
    UnsupportedCompression { name: String },

    #[error("Unsupported checksum algorithm: {name}")]
    UnsupportedChecksum { name: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("API failure: {reason}")]
    ApiFailure { reason: String },

    #[error("Expected dataset entry for definition [{definition}] but none was found")]
    EntryNotFound { definition: Uuid },

    #[error("Invalid entity permissions [{permissions}]")]
    InvalidPermissions { permissions: String },

    #[error("Operation cancelled by user")]
    Cancelled,
}

/// Result type alias for stowage operations
pub type Result<T> = std::result::Result<T, Error>;
