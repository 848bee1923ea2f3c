//! Region container decoding
//!
//! A region is a 32x32 grid of chunks stored in one sector-allocated file.
//! The header maps each chunk to a run of 4096-byte sectors; each chunk record
//! carries a compressed payload in one of two codecs.

mod compression;
mod region_file;
mod region_set;

pub use compression::{CompressionType, Compressor};
pub use region_file::{
    Location, RegionFile, CHUNKS_PER_REGION, CHUNKS_PER_SIDE, HEADER_BYTES, SECTOR_BYTES,
};
pub use region_set::{parse_region_file_name, region_file_name, Region, RegionSet};
