use std::io::{Read, Write};

use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression as FlateCompression;

use crate::error::{QuadMapError, QuadMapResult};

/// Payload codecs a chunk record can declare in its version byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    /// Version 1, a whole gzip stream
    Gzip,
    /// Version 2, a whole zlib stream
    Zlib,
}

impl CompressionType {
    /// Map a chunk record version byte to its codec
    pub fn from_version(version: u8) -> Option<Self> {
        match version {
            1 => Some(CompressionType::Gzip),
            2 => Some(CompressionType::Zlib),
            _ => None,
        }
    }

    /// Version byte written ahead of a payload using this codec
    pub fn version(&self) -> u8 {
        match self {
            CompressionType::Gzip => 1,
            CompressionType::Zlib => 2,
        }
    }
}

/// Handles compression and decompression of chunk payloads
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    compression_type: CompressionType,
}

impl Compressor {
    pub fn new(compression_type: CompressionType) -> Self {
        Self { compression_type }
    }

    pub fn compression_type(&self) -> CompressionType {
        self.compression_type
    }

    /// Compress data
    pub fn compress(&self, data: &[u8]) -> QuadMapResult<Vec<u8>> {
        match self.compression_type {
            CompressionType::Gzip => self.compress_gzip(data),
            CompressionType::Zlib => self.compress_zlib(data),
        }
    }

    /// Decompress data
    pub fn decompress(&self, data: &[u8]) -> QuadMapResult<Vec<u8>> {
        match self.compression_type {
            CompressionType::Gzip => self.decompress_gzip(data),
            CompressionType::Zlib => self.decompress_zlib(data),
        }
    }

    fn compress_gzip(&self, data: &[u8]) -> QuadMapResult<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), FlateCompression::default());
        encoder
            .write_all(data)
            .map_err(|e| QuadMapError::Compression(format!("Gzip compression failed: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| QuadMapError::Compression(format!("Gzip finalization failed: {}", e)))
    }

    fn decompress_gzip(&self, data: &[u8]) -> QuadMapResult<Vec<u8>> {
        let mut decoder = GzDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| QuadMapError::Compression(format!("Gzip decompression failed: {}", e)))?;
        Ok(decompressed)
    }

    fn compress_zlib(&self, data: &[u8]) -> QuadMapResult<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), FlateCompression::default());
        encoder
            .write_all(data)
            .map_err(|e| QuadMapError::Compression(format!("Zlib compression failed: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| QuadMapError::Compression(format!("Zlib finalization failed: {}", e)))
    }

    fn decompress_zlib(&self, data: &[u8]) -> QuadMapResult<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| QuadMapError::Compression(format!("Zlib decompression failed: {}", e)))?;
        Ok(decompressed)
    }
}
