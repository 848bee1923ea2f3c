use std::fmt;

use dashmap::DashSet;
use log::info;

use super::ids::{MaterialId, MaterialKey, MAX_MATERIAL_ID, VARIANTS_PER_MATERIAL};
use super::record_store::{parse_hex, split_comment, RecordStore, TableRecord, DEFAULT_KEY};
use crate::color::Color;
use crate::error::QuadMapResult;

/// Which biome color, if any, tints a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BiomeInfluence {
    #[default]
    None,
    /// The biome's primary (grass) color
    Grass,
    /// The biome's liquid (water) color
    Water,
    /// The biome's foliage color
    Foliage,
}

impl BiomeInfluence {
    fn parse(token: &str) -> Option<Self> {
        match token.strip_prefix("biome_")? {
            "grass" => Some(BiomeInfluence::Grass),
            "water" => Some(BiomeInfluence::Water),
            "foliage" => Some(BiomeInfluence::Foliage),
            _ => None,
        }
    }
}

/// One row of the material color table
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRecord {
    /// `None` for the default row
    pub key: Option<MaterialKey>,
    pub color: Color,
    pub influence: BiomeInfluence,
    pub comment: Option<String>,
}

impl MaterialRecord {
    pub fn is_fully_opaque(&self) -> bool {
        self.color.is_fully_opaque()
    }
}

impl TableRecord for MaterialRecord {
    const TABLE: &'static str = "block color";

    /// `id[:variant] 0xAARRGGBB [biome_grass|biome_water|biome_foliage] [# comment]`
    fn parse(line: &str) -> Option<Self> {
        let (data, comment) = split_comment(line);
        let mut tokens = data.split_whitespace();

        let key = match tokens.next()? {
            DEFAULT_KEY => None,
            raw => {
                let (id, variant) = match raw.split_once(':') {
                    Some((id, variant)) => (id, Some(variant)),
                    None => (raw, None),
                };
                let id = parse_hex(id).filter(|&id| id <= MAX_MATERIAL_ID as u32)? as u16;
                let variant = match variant {
                    Some(v) => Some(
                        parse_hex(v).filter(|&v| v < VARIANTS_PER_MATERIAL as u32)? as u8,
                    ),
                    None => None,
                };
                Some(MaterialKey { id, variant })
            }
        };
        let color = tokens.next()?.parse::<Color>().ok()?;
        let influence = match tokens.next() {
            Some(token) => BiomeInfluence::parse(token)?,
            None => BiomeInfluence::None,
        };
        if tokens.next().is_some() {
            return None;
        }

        Some(Self {
            key,
            color,
            influence,
            comment,
        })
    }

    fn is_default(&self) -> bool {
        self.key.is_none()
    }
}

const SLOTS: usize = (MAX_MATERIAL_ID as usize + 1) * VARIANTS_PER_MATERIAL as usize;

/// Material color lookup.
///
/// Rows without a variant are expanded to all 16 variants at load time, so a
/// lookup is a single slot index. Misses fall back to the default row and are
/// remembered for end-of-run reporting.
pub struct BlockColors {
    default: MaterialRecord,
    records: Vec<MaterialRecord>,
    slots: Vec<Option<u32>>,
    opaque: Vec<bool>,
    unmapped: DashSet<MaterialId>,
}

impl BlockColors {
    pub fn from_text(text: &str) -> QuadMapResult<Self> {
        Self::from_store(RecordStore::from_text(text)?)
    }

    pub fn from_store(store: RecordStore<MaterialRecord>) -> QuadMapResult<Self> {
        let (default, records) = store.split_default()?;
        let mut slots = vec![None; SLOTS];
        let mut opaque = vec![default.is_fully_opaque(); SLOTS];

        for (index, record) in records.iter().enumerate() {
            if let Some(key) = record.key {
                for id in key.expand() {
                    slots[id.slot()] = Some(index as u32);
                    opaque[id.slot()] = record.is_fully_opaque();
                }
            }
        }

        let colors = Self {
            default,
            records,
            slots,
            opaque,
            unmapped: DashSet::new(),
        };
        info!("[BlockColors::from_store] {}", colors);
        Ok(colors)
    }

    pub fn default_record(&self) -> &MaterialRecord {
        &self.default
    }

    /// Number of rows, excluding the default row
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of concrete ids with their own row
    pub fn mapped_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    fn lookup(&self, id: MaterialId) -> Option<&MaterialRecord> {
        self.slots[id.slot()].map(|index| &self.records[index as usize])
    }

    /// Record for a material, falling back to the default row
    pub fn material(&self, id: MaterialId) -> &MaterialRecord {
        match self.lookup(id) {
            Some(record) => record,
            None => {
                self.unmapped.insert(id);
                &self.default
            }
        }
    }

    /// Whether the material's table color has full alpha
    pub fn is_fully_opaque(&self, id: MaterialId) -> bool {
        self.opaque[id.slot()]
    }

    /// Material ids that fell back to the default row so far, sorted
    pub fn unmapped(&self) -> Vec<MaterialId> {
        let mut ids: Vec<MaterialId> = self.unmapped.iter().map(|id| *id).collect();
        ids.sort();
        ids
    }
}

impl fmt::Display for BlockColors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BlockColors{{size={}, #defaulted={}}}",
            self.mapped_count(),
            self.unmapped.len()
        )
    }
}
