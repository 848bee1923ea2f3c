//! Material and biome color tables
//!
//! Both tables are loaded once per run and shared read-only by every
//! rasterizer thread. The only mutation after load is the record of ids that
//! fell back to a default row.

mod biome_colors;
mod block_colors;
mod ids;
mod record_store;

pub use biome_colors::{BiomeColors, BiomeRecord};
pub use block_colors::{BiomeInfluence, BlockColors, MaterialRecord};
pub use ids::{BiomeId, MaterialId, MaterialKey, MAX_MATERIAL_ID, VARIANTS_PER_MATERIAL};
pub use record_store::{RecordStore, TableRecord};

use std::path::Path;

use log::warn;

use crate::color::Color;
use crate::error::QuadMapResult;

/// Packaged material color table
pub const DEFAULT_BLOCK_COLORS: &str = include_str!("../../assets/block-colors.txt");

/// Packaged biome color table
pub const DEFAULT_BIOME_COLORS: &str = include_str!("../../assets/biome-colors.txt");

/// Both color tables together
pub struct Palette {
    blocks: BlockColors,
    biomes: BiomeColors,
}

impl Palette {
    pub fn new(blocks: BlockColors, biomes: BiomeColors) -> Self {
        Self { blocks, biomes }
    }

    /// The packaged tables
    pub fn packaged() -> QuadMapResult<Self> {
        Ok(Self::new(
            BlockColors::from_text(DEFAULT_BLOCK_COLORS)?,
            BiomeColors::from_text(DEFAULT_BIOME_COLORS)?,
        ))
    }

    /// Load tables, preferring the given files over the packaged ones
    pub fn load(block_colors: Option<&Path>, biome_colors: Option<&Path>) -> QuadMapResult<Self> {
        let blocks = match block_colors {
            Some(path) => BlockColors::from_store(RecordStore::from_file(path)?)?,
            None => BlockColors::from_text(DEFAULT_BLOCK_COLORS)?,
        };
        let biomes = match biome_colors {
            Some(path) => BiomeColors::from_store(RecordStore::from_file(path)?)?,
            None => BiomeColors::from_text(DEFAULT_BIOME_COLORS)?,
        };
        Ok(Self::new(blocks, biomes))
    }

    pub fn blocks(&self) -> &BlockColors {
        &self.blocks
    }

    pub fn biomes(&self) -> &BiomeColors {
        &self.biomes
    }

    /// Table color of a material tinted by its biome. A column without biome
    /// data uses the default biome row.
    pub fn effective_color(&self, material: MaterialId, biome: Option<BiomeId>) -> Color {
        let record = self.blocks.material(material);
        if record.influence == BiomeInfluence::None {
            return record.color;
        }
        let biome = match biome {
            Some(id) => self.biomes.biome(id),
            None => self.biomes.default_record(),
        };
        record.color.multiply_solid(biome.influence(record.influence))
    }

    pub fn is_fully_opaque(&self, material: MaterialId) -> bool {
        self.blocks.is_fully_opaque(material)
    }

    /// Log every id that fell back to a default row
    pub fn report_unmapped(&self) {
        let materials = self.blocks.unmapped();
        if !materials.is_empty() {
            let list: Vec<String> = materials.iter().map(ToString::to_string).collect();
            warn!(
                "[Palette::report_unmapped] {} unmapped material ids: {}",
                materials.len(),
                list.join(", ")
            );
        }
        let biomes = self.biomes.unmapped();
        if !biomes.is_empty() {
            let list: Vec<String> = biomes.iter().map(ToString::to_string).collect();
            warn!(
                "[Palette::report_unmapped] {} unmapped biome ids: {}",
                biomes.len(),
                list.join(", ")
            );
        }
    }
}
