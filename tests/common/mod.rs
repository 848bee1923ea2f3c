//! Helpers for building region files on disk

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use quadmap::chunk::{voxel_index, SECTION_VOLUME};
use quadmap::nbt::{self, Compound, Tag};
use quadmap::region::{
    region_file_name, CompressionType, Compressor, Location, CHUNKS_PER_SIDE, HEADER_BYTES,
    SECTOR_BYTES,
};
use quadmap::Coord;

/// Bedrock: fully opaque in the packaged table
pub const FLOOR: u8 = 0x07;

/// NBT payload of a chunk whose lowest section holds `FLOOR` up to `height`
pub fn floor_chunk(height: usize) -> Vec<u8> {
    let mut blocks = vec![0u8; SECTION_VOLUME];
    for y in 0..=height.min(15) {
        for z in 0..16 {
            for x in 0..16 {
                blocks[voxel_index(x, y, z)] = FLOOR;
            }
        }
    }
    let section = Compound::new()
        .with("Y", Tag::Byte(0))
        .with("Blocks", Tag::ByteArray(blocks))
        .with("Data", Tag::ByteArray(vec![0; SECTION_VOLUME / 2]));
    let level = Compound::new()
        .with("Biomes", Tag::ByteArray(vec![1; 256]))
        .with("Sections", Tag::List(vec![Tag::Compound(section)]));
    nbt::write_root("", &Tag::Compound(Compound::new().with("Level", Tag::Compound(level))))
}

/// One chunk record to place in a container
pub struct ChunkRecord {
    pub x: usize,
    pub z: usize,
    pub version: u8,
    pub payload: Vec<u8>,
    /// Replaces the length field written before the version byte
    pub declared_length: Option<u32>,
}

impl ChunkRecord {
    pub fn gzip(x: usize, z: usize, nbt: &[u8]) -> Self {
        Self::compressed(x, z, CompressionType::Gzip, nbt)
    }

    pub fn zlib(x: usize, z: usize, nbt: &[u8]) -> Self {
        Self::compressed(x, z, CompressionType::Zlib, nbt)
    }

    fn compressed(x: usize, z: usize, compression_type: CompressionType, nbt: &[u8]) -> Self {
        Self {
            x,
            z,
            version: compression_type.version(),
            payload: Compressor::new(compression_type).compress(nbt).unwrap(),
            declared_length: None,
        }
    }

    pub fn with_declared_length(mut self, length: u32) -> Self {
        self.declared_length = Some(length);
        self
    }
}

/// Container bytes holding `records` back to back from sector 2
pub fn container(records: &[ChunkRecord]) -> Vec<u8> {
    let mut data = vec![0u8; HEADER_BYTES];
    let mut sector = 2;
    for record in records {
        let length = record
            .declared_length
            .unwrap_or(record.payload.len() as u32 + 1);
        let mut bytes = length.to_be_bytes().to_vec();
        bytes.push(record.version);
        bytes.extend_from_slice(&record.payload);
        let count = (bytes.len() + SECTOR_BYTES - 1) / SECTOR_BYTES;
        bytes.resize(count * SECTOR_BYTES, 0);

        let index = record.x + record.z * CHUNKS_PER_SIDE;
        let location = Location::new(sector as u32, count as u8);
        data[index * 4..index * 4 + 4].copy_from_slice(&location.raw().to_be_bytes());
        data.extend_from_slice(&bytes);
        sector += count;
    }
    data
}

/// Write a region file of floor chunks at the given chunk positions
pub fn write_region(dir: &Path, coord: Coord, chunks: &[(usize, usize)]) -> PathBuf {
    let payload = floor_chunk(3);
    let records: Vec<ChunkRecord> = chunks
        .iter()
        .enumerate()
        .map(|(i, &(x, z))| {
            if i % 2 == 0 {
                ChunkRecord::gzip(x, z, &payload)
            } else {
                ChunkRecord::zlib(x, z, &payload)
            }
        })
        .collect();
    write_container(dir, coord, &records)
}

pub fn write_container(dir: &Path, coord: Coord, records: &[ChunkRecord]) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(region_file_name(coord));
    fs::write(&path, container(records)).unwrap();
    path
}

/// Overwrite one cell's location word in a region file on disk
pub fn patch_location(path: &Path, x: usize, z: usize, location: Location) {
    let mut data = fs::read(path).unwrap();
    let index = (x + z * CHUNKS_PER_SIDE) * 4;
    data[index..index + 4].copy_from_slice(&location.raw().to_be_bytes());
    fs::write(path, data).unwrap();
}

/// Number of sectors in a region file on disk
pub fn sector_total(path: &Path) -> u32 {
    (fs::metadata(path).unwrap().len() / SECTOR_BYTES as u64) as u32
}

/// Move a file's modification time forward
pub fn touch_later(path: &Path, by: Duration) {
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + by).unwrap();
}
