//! Chunk decoding
//!
//! Turns one chunk's decompressed NBT payload into per-voxel material ids
//! and per-column biome ids. Absent sections read as air.

mod section;

pub use section::{nibble, pack_nibbles, voxel_index, Section, SECTION_SIDE, SECTION_VOLUME};

use log::warn;

use crate::error::{nbt_error, QuadMapResult};
use crate::nbt::{self, Compound, Tag};
use crate::palette::{BiomeId, MaterialId};

/// Columns along each side of a chunk
pub const CHUNK_SIDE: usize = SECTION_SIDE;

/// Vertical sections in a chunk
pub const SECTIONS_PER_CHUNK: usize = 16;

/// Total voxel height of a chunk
pub const CHUNK_HEIGHT: usize = SECTIONS_PER_CHUNK * SECTION_SIDE;

const BIOME_BYTES: usize = CHUNK_SIDE * CHUNK_SIDE;

/// A decoded chunk
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    sections: [Option<Section>; SECTIONS_PER_CHUNK],
    biomes: Option<Vec<u8>>,
}

impl Chunk {
    /// Decode a decompressed chunk payload
    pub fn decode(payload: &[u8]) -> QuadMapResult<Self> {
        let root = nbt::read_root_compound(payload)?;
        Self::from_level(root.compound("Level")?)
    }

    /// Build a chunk from its `Level` compound
    pub fn from_level(level: &Compound) -> QuadMapResult<Self> {
        let mut chunk = Chunk::default();

        chunk.biomes = match level.byte_array("Biomes") {
            Some(biomes) if biomes.len() >= BIOME_BYTES => Some(biomes[..BIOME_BYTES].to_vec()),
            Some(biomes) => {
                warn!(
                    "[Chunk::from_level] Ignoring biome array of {} bytes",
                    biomes.len()
                );
                None
            }
            None => None,
        };

        for tag in level.list("Sections").unwrap_or_default() {
            let Tag::Compound(section_tag) = tag else {
                return Err(nbt_error("section entry is not a compound"));
            };
            let section = Section::from_nbt(section_tag)?;
            let index = section.index();
            chunk.sections[index] = Some(section);
        }

        Ok(chunk)
    }

    /// Place a section directly, replacing whatever was at its index
    pub fn with_section(mut self, section: Section) -> Self {
        let index = section.index();
        self.sections[index] = Some(section);
        self
    }

    pub fn with_biomes(mut self, biomes: Vec<u8>) -> Self {
        self.biomes = (biomes.len() >= BIOME_BYTES).then_some(biomes);
        self
    }

    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index).and_then(Option::as_ref)
    }

    /// Greatest section index holding any data
    pub fn highest_populated_section(&self) -> Option<usize> {
        self.sections.iter().rposition(Option::is_some)
    }

    /// Material at chunk-local coordinates; `None` inside an absent section
    pub fn material_at(&self, x: usize, y: usize, z: usize) -> Option<MaterialId> {
        self.section(y / SECTION_SIDE)
            .map(|s| s.material_at(x, y % SECTION_SIDE, z))
    }

    /// Biome of a column; `None` when the chunk carries no biome array
    pub fn biome_at(&self, x: usize, z: usize) -> Option<BiomeId> {
        self.biomes
            .as_ref()
            .map(|b| BiomeId::new(b[z * CHUNK_SIDE + x]))
    }

    /// One character per section, `#` present and `.` absent
    pub fn section_map(&self) -> String {
        self.sections
            .iter()
            .map(|s| if s.is_some() { '#' } else { '.' })
            .collect()
    }
}
