use std::fs;
use std::path::Path;

use log::{debug, warn};

use super::compression::{CompressionType, Compressor};
use crate::error::{malformed, IoResultExt, QuadMapError, QuadMapResult};
use crate::quad::Coord;

/// Size of one sector in bytes
pub const SECTOR_BYTES: usize = 4096;

/// Chunks along one side of a region
pub const CHUNKS_PER_SIDE: usize = 32;

/// Chunks in one region
pub const CHUNKS_PER_REGION: usize = CHUNKS_PER_SIDE * CHUNKS_PER_SIDE;

/// Header size: one sector of locations followed by one of timestamps
pub const HEADER_BYTES: usize = SECTOR_BYTES * 2;

/// A packed header location word: sector number in the high 24 bits,
/// sector count in the low byte. Zero marks an absent chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location(u32);

impl Location {
    pub fn new(sector_number: u32, sector_count: u8) -> Self {
        Self(sector_number << 8 | sector_count as u32)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    pub fn sector_number(&self) -> usize {
        (self.0 >> 8) as usize
    }

    pub fn sector_count(&self) -> usize {
        (self.0 & 0xff) as usize
    }

    pub fn is_absent(&self) -> bool {
        self.0 == 0
    }
}

/// A decoded region container.
///
/// The whole file is held in memory; chunk payloads are located through the
/// header and decompressed on demand.
pub struct RegionFile {
    name: String,
    data: Vec<u8>,
    locations: Vec<Location>,
    timestamps: Vec<u32>,
}

impl RegionFile {
    /// Read and validate a region container from disk
    pub fn open(path: impl AsRef<Path>) -> QuadMapResult<Self> {
        let path = path.as_ref();
        let data = fs::read(path).with_path(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_bytes(name, data)
    }

    /// Validate the container layout and decode its header
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> QuadMapResult<Self> {
        let name = name.into();
        if data.len() < SECTOR_BYTES {
            return Err(malformed(name, format!("file length {} < {}", data.len(), SECTOR_BYTES)));
        }
        if data.len() % SECTOR_BYTES != 0 {
            return Err(malformed(
                name,
                format!("file length {} is not a multiple of {}", data.len(), SECTOR_BYTES),
            ));
        }

        let locations = read_words(&data, 0).map(Location).collect();
        // a single-sector file has no timestamp table
        let timestamps = if data.len() >= HEADER_BYTES {
            read_words(&data, SECTOR_BYTES).collect()
        } else {
            vec![0; CHUNKS_PER_REGION]
        };

        debug!(
            "[RegionFile::from_bytes] {} has {} sectors",
            name,
            data.len() / SECTOR_BYTES
        );

        Ok(Self {
            name,
            data,
            locations,
            timestamps,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of sectors in the file
    pub fn sector_total(&self) -> usize {
        self.data.len() / SECTOR_BYTES
    }

    /// Number of chunks whose location word is non-zero
    pub fn chunk_count(&self) -> usize {
        self.locations.iter().filter(|l| !l.is_absent()).count()
    }

    pub fn location_at(&self, x: usize, z: usize) -> Option<Location> {
        chunk_index(x, z).map(|i| self.locations[i])
    }

    pub fn has_chunk(&self, x: usize, z: usize) -> bool {
        self.location_at(x, z).map_or(false, |l| !l.is_absent())
    }

    /// Last-modified timestamp recorded in the header for a chunk
    pub fn timestamp_at(&self, x: usize, z: usize) -> u32 {
        chunk_index(x, z).map_or(0, |i| self.timestamps[i])
    }

    /// Locate, validate and decompress one chunk payload.
    ///
    /// Returns `Ok(None)` for an absent chunk; every structural problem with
    /// the chunk record is an error for that chunk alone.
    pub fn read_chunk(&self, x: usize, z: usize) -> QuadMapResult<Option<Vec<u8>>> {
        let cell = Coord::new(x as i32, z as i32);
        let location = match self.location_at(x, z) {
            Some(location) => location,
            None => return Err(malformed(&self.name, format!("chunk {} out of range", cell))),
        };
        if location.is_absent() {
            return Ok(None);
        }

        let sector_number = location.sector_number();
        let sector_count = location.sector_count();
        if sector_count == 0 {
            return Err(malformed(
                &self.name,
                format!("chunk {} at sector {} has no sectors", cell, sector_number),
            ));
        }
        if sector_number + sector_count > self.sector_total() {
            return Err(malformed(
                &self.name,
                format!(
                    "chunk {} spans sectors {}+{} beyond {}",
                    cell,
                    sector_number,
                    sector_count,
                    self.sector_total()
                ),
            ));
        }

        let offset = sector_number * SECTOR_BYTES;
        if offset + 5 > self.data.len() {
            return Err(malformed(
                &self.name,
                format!("chunk {} header at {} runs past the file", cell, offset),
            ));
        }
        let declared = read_u32(&self.data, offset) as usize;
        if declared > SECTOR_BYTES * sector_count {
            return Err(malformed(
                &self.name,
                format!(
                    "chunk {} declares {} bytes in {} sectors",
                    cell, declared, sector_count
                ),
            ));
        }
        if declared == 0 {
            return Err(malformed(&self.name, format!("chunk {} declares zero length", cell)));
        }

        let version = self.data[offset + 4];
        let compression_type = CompressionType::from_version(version).ok_or_else(|| {
            QuadMapError::UnsupportedCompressionVersion {
                file: self.name.clone(),
                cell,
                version,
            }
        })?;

        // the length counts the version byte but not itself
        let start = offset + 5;
        let end = (offset + 4 + declared).min(self.data.len());
        let payload = &self.data[start..end];

        Compressor::new(compression_type).decompress(payload).map(Some)
    }

    /// Like [`RegionFile::read_chunk`], but logs failures and reports the
    /// chunk as absent instead.
    pub fn open_chunk_stream(&self, x: usize, z: usize) -> Option<Vec<u8>> {
        match self.read_chunk(x, z) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("[RegionFile::open_chunk_stream] Skipping chunk: {}", e);
                None
            }
        }
    }
}

impl std::fmt::Debug for RegionFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionFile")
            .field("name", &self.name)
            .field("sectors", &self.sector_total())
            .field("chunks", &self.chunk_count())
            .finish()
    }
}

fn chunk_index(x: usize, z: usize) -> Option<usize> {
    (x < CHUNKS_PER_SIDE && z < CHUNKS_PER_SIDE).then(|| x + z * CHUNKS_PER_SIDE)
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn read_words(data: &[u8], offset: usize) -> impl Iterator<Item = u32> + '_ {
    data[offset..offset + SECTOR_BYTES]
        .chunks_exact(4)
        .map(|w| u32::from_be_bytes([w[0], w[1], w[2], w[3]]))
}
