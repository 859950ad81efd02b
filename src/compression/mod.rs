//! Content compression, selected per entity by the tag stored in its
//! metadata.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{Read, Write};

use crate::error::{Error, Result};

/// One compression algorithm applied to crate content.
pub trait Compression: Send + Sync {
    fn name(&self) -> &'static str;
    fn compress(&self, content: &[u8]) -> Result<Vec<u8>>;
    fn decompress(&self, content: &[u8]) -> Result<Vec<u8>>;
}

/// Selects the algorithm matching the `compression` tag of an entity.
pub fn for_name(name: &str) -> Result<Box<dyn Compression>> {
    match name {
        "gzip" => Ok(Box::new(Gzip)),
        "none" => Ok(Box::new(Identity)),
        other => Err(Error::UnsupportedCompression {
            name: other.to_string(),
        }),
    }
}

pub struct Gzip;

impl Compression for Gzip {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn compress(&self, content: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(content)?;
        Ok(encoder.finish()?)
    }

    fn decompress(&self, content: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(content);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;
        Ok(decompressed)
    }
}

/// Pass-through for entities backed up without compression.
pub struct Identity;

impl Compression for Identity {
    fn name(&self) -> &'static str {
        "none"
    }

    fn compress(&self, content: &[u8]) -> Result<Vec<u8>> {
        Ok(content.to_vec())
    }

    fn decompress(&self, content: &[u8]) -> Result<Vec<u8>> {
        Ok(content.to_vec())
    }
}
