//! Entity analysis: content checksums and on-disk metadata extraction.

use crc32fast::Hasher as Crc32Hasher;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::entity::{Checksum, EntityMetadata};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Checksum strategy applied to entity content, selected by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    Crc32,
    Sha256,
    Blake3,
}

impl ChecksumAlgorithm {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "crc32" => Ok(Self::Crc32),
            "sha256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(Error::UnsupportedChecksum {
                name: other.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Crc32 => "crc32",
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }

    pub fn calculate_for_bytes(&self, bytes: &[u8]) -> Checksum {
        match self {
            Self::Crc32 => {
                let mut hasher = Crc32Hasher::new();
                hasher.update(bytes);
                Checksum::from_u64(hasher.finalize() as u64)
            }
            Self::Sha256 => Checksum::from_be_bytes(&Sha256::digest(bytes)),
            Self::Blake3 => Checksum::from_be_bytes(blake3::hash(bytes).as_bytes()),
        }
    }

    /// Streams a file through the hasher without loading it whole.
    pub fn calculate_for_file(&self, path: &Path) -> Result<Checksum> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];

        match self {
            Self::Crc32 => {
                let mut hasher = Crc32Hasher::new();
                loop {
                    let read = reader.read(&mut buffer)?;
                    if read == 0 {
                        break;
                    }
                    hasher.update(&buffer[..read]);
                }
                Ok(Checksum::from_u64(hasher.finalize() as u64))
            }
            Self::Sha256 => {
                let mut hasher = Sha256::new();
                loop {
                    let read = reader.read(&mut buffer)?;
                    if read == 0 {
                        break;
                    }
                    hasher.update(&buffer[..read]);
                }
                Ok(Checksum::from_be_bytes(&hasher.finalize()))
            }
            Self::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                loop {
                    let read = reader.read(&mut buffer)?;
                    if read == 0 {
                        break;
                    }
                    hasher.update(&buffer[..read]);
                }
                Ok(Checksum::from_be_bytes(hasher.finalize().as_bytes()))
            }
        }
    }
}

/// Renders a permissions mode as the rwx triple string stored in metadata.
pub fn render_permissions(mode: u32) -> String {
    let mut rendered = String::with_capacity(9);

    for shift in [6u32, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        rendered.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        rendered.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        rendered.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }

    rendered
}

/// Parses an rwx triple string back into a permissions mode.
pub fn parse_permissions(permissions: &str) -> Result<u32> {
    let chars: Vec<char> = permissions.chars().collect();
    if chars.len() != 9 {
        return Err(Error::InvalidPermissions {
            permissions: permissions.to_string(),
        });
    }

    let mut mode = 0u32;

    for (i, chunk) in chars.chunks(3).enumerate() {
        let mut bits = 0u32;
        match (chunk[0], chunk[1], chunk[2]) {
            (r, w, x)
                if (r == 'r' || r == '-') && (w == 'w' || w == '-') && (x == 'x' || x == '-') =>
            {
                if r == 'r' {
                    bits |= 0o4;
                }
                if w == 'w' {
                    bits |= 0o2;
                }
                if x == 'x' {
                    bits |= 0o1;
                }
            }
            _ => {
                return Err(Error::InvalidPermissions {
                    permissions: permissions.to_string(),
                })
            }
        }
        mode |= bits << ((2 - i) * 3);
    }

    Ok(mode)
}

#[cfg(unix)]
fn owner_and_group(metadata: &fs::Metadata) -> (String, String) {
    use std::os::unix::fs::MetadataExt;

    let uid = metadata.uid();
    let gid = metadata.gid();

    let owner = nix::unistd::User::from_uid(nix::unistd::Uid::from_raw(uid))
        .ok()
        .flatten()
        .map(|user| user.name)
        .unwrap_or_else(|| uid.to_string());

    let group = nix::unistd::Group::from_gid(nix::unistd::Gid::from_raw(gid))
        .ok()
        .flatten()
        .map(|group| group.name)
        .unwrap_or_else(|| gid.to_string());

    (owner, group)
}

#[cfg(not(unix))]
fn owner_and_group(_metadata: &fs::Metadata) -> (String, String) {
    ("unknown".to_string(), "unknown".to_string())
}

#[cfg(unix)]
fn permissions_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permissions_mode(metadata: &fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

/// Extracts the full metadata of an on-disk entity.
///
/// The checksum is computed for files only; `compression` is recorded as-is
/// in the resulting metadata. Symlinks are not followed.
pub fn extract_entity_metadata(
    path: &Path,
    checksum: ChecksumAlgorithm,
    compression: &str,
) -> Result<EntityMetadata> {
    let metadata = fs::symlink_metadata(path)?;

    let link = fs::read_link(path).ok();
    let is_hidden = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false);

    let updated = metadata.modified()?.into();
    let created = metadata.created().map(Into::into).unwrap_or(updated);

    let (owner, group) = owner_and_group(&metadata);
    let permissions = render_permissions(permissions_mode(&metadata));

    if metadata.is_dir() {
        Ok(EntityMetadata::Directory {
            path: path.to_path_buf(),
            link,
            is_hidden,
            created,
            updated,
            owner,
            group,
            permissions,
        })
    } else {
        let content_checksum = checksum.calculate_for_file(path)?;
        debug!(
            path = %path.display(),
            checksum = %content_checksum,
            "Extracted file metadata"
        );

        Ok(EntityMetadata::File {
            path: path.to_path_buf(),
            link,
            is_hidden,
            created,
            updated,
            owner,
            group,
            permissions,
            size: metadata.len(),
            checksum: content_checksum,
            crates: Default::default(),
            compression: compression.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_checksums_match_known_values() {
        let content = b"hello world";

        assert_eq!(
            ChecksumAlgorithm::Crc32.calculate_for_bytes(content).to_hex(),
            "0d4a1185"
        );
        assert_eq!(
            ChecksumAlgorithm::Sha256.calculate_for_bytes(content).to_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(
            ChecksumAlgorithm::Blake3.calculate_for_bytes(content).to_hex(),
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn test_file_checksums_match_in_memory_checksums() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file");
        fs::write(&path, b"hello world").unwrap();

        for algorithm in [
            ChecksumAlgorithm::Crc32,
            ChecksumAlgorithm::Sha256,
            ChecksumAlgorithm::Blake3,
        ] {
            assert_eq!(
                algorithm.calculate_for_file(&path).unwrap(),
                algorithm.calculate_for_bytes(b"hello world")
            );
        }
    }

    #[test]
    fn test_algorithms_are_selected_by_name() {
        assert_eq!(
            ChecksumAlgorithm::from_name("crc32").unwrap(),
            ChecksumAlgorithm::Crc32
        );
        assert_eq!(
            ChecksumAlgorithm::from_name("sha256").unwrap(),
            ChecksumAlgorithm::Sha256
        );
        assert_eq!(
            ChecksumAlgorithm::from_name("blake3").unwrap(),
            ChecksumAlgorithm::Blake3
        );
        assert!(matches!(
            ChecksumAlgorithm::from_name("md5"),
            Err(Error::UnsupportedChecksum { .. })
        ));
    }

    #[test]
    fn test_permissions_render_and_parse() {
        assert_eq!(render_permissions(0o644), "rw-r--r--");
        assert_eq!(render_permissions(0o700), "rwx------");
        assert_eq!(render_permissions(0o777), "rwxrwxrwx");

        assert_eq!(parse_permissions("rw-r--r--").unwrap(), 0o644);
        assert_eq!(parse_permissions("rwx------").unwrap(), 0o700);
        assert_eq!(parse_permissions("---------").unwrap(), 0);

        assert!(matches!(
            parse_permissions("not-valid"),
            Err(Error::InvalidPermissions { .. })
        ));
        assert!(matches!(
            parse_permissions("rw-"),
            Err(Error::InvalidPermissions { .. })
        ));
    }

    #[test]
    fn test_extraction_captures_files_and_directories() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join(".hidden");
        fs::write(&file, b"hello world").unwrap();

        let extracted =
            extract_entity_metadata(&file, ChecksumAlgorithm::Crc32, "gzip").unwrap();
        match &extracted {
            EntityMetadata::File {
                is_hidden,
                size,
                checksum,
                compression,
                ..
            } => {
                assert!(*is_hidden);
                assert_eq!(*size, 11);
                assert_eq!(checksum.to_hex(), "0d4a1185");
                assert_eq!(compression, "gzip");
            }
            other => panic!("Unexpected metadata: {:?}", other),
        }

        let extracted =
            extract_entity_metadata(dir.path(), ChecksumAlgorithm::Crc32, "gzip").unwrap();
        assert!(extracted.is_directory());
    }
}
