use std::fmt;

use dashmap::DashSet;
use log::info;

use super::block_colors::BiomeInfluence;
use super::ids::BiomeId;
use super::record_store::{parse_hex, split_comment, RecordStore, TableRecord, DEFAULT_KEY};
use crate::color::Color;
use crate::error::QuadMapResult;

/// One row of the biome color table
#[derive(Debug, Clone, PartialEq)]
pub struct BiomeRecord {
    /// `None` for the default row
    pub id: Option<BiomeId>,
    pub grass: Color,
    pub foliage: Color,
    pub water: Color,
    pub comment: Option<String>,
}

impl BiomeRecord {
    /// Tint this biome applies for the given influence; WHITE is a no-op
    /// under `multiply_solid`.
    pub fn influence(&self, influence: BiomeInfluence) -> Color {
        match influence {
            BiomeInfluence::None => Color::WHITE,
            BiomeInfluence::Grass => self.grass,
            BiomeInfluence::Water => self.water,
            BiomeInfluence::Foliage => self.foliage,
        }
    }
}

impl TableRecord for BiomeRecord {
    const TABLE: &'static str = "biome color";

    /// `id 0xGRASS 0xFOLIAGE 0xWATER [# comment]`
    fn parse(line: &str) -> Option<Self> {
        let (data, comment) = split_comment(line);
        let tokens: Vec<&str> = data.split_whitespace().collect();
        let &[id, grass, foliage, water] = tokens.as_slice() else {
            return None;
        };

        let id = match id {
            DEFAULT_KEY => None,
            raw => Some(BiomeId::new(u8::try_from(parse_hex(raw)?).ok()?)),
        };
        Some(Self {
            id,
            grass: grass.parse().ok()?,
            foliage: foliage.parse().ok()?,
            water: water.parse().ok()?,
            comment,
        })
    }

    fn is_default(&self) -> bool {
        self.id.is_none()
    }
}

/// Biome color lookup with default fallback
pub struct BiomeColors {
    default: BiomeRecord,
    records: Vec<Option<BiomeRecord>>,
    unmapped: DashSet<BiomeId>,
}

impl BiomeColors {
    pub fn from_text(text: &str) -> QuadMapResult<Self> {
        Self::from_store(RecordStore::from_text(text)?)
    }

    pub fn from_store(store: RecordStore<BiomeRecord>) -> QuadMapResult<Self> {
        let (default, rows) = store.split_default()?;
        let mut records = vec![None; 256];
        for row in rows {
            if let Some(id) = row.id {
                records[id.id() as usize] = Some(row);
            }
        }

        let colors = Self {
            default,
            records,
            unmapped: DashSet::new(),
        };
        info!("[BiomeColors::from_store] {}", colors);
        Ok(colors)
    }

    pub fn default_record(&self) -> &BiomeRecord {
        &self.default
    }

    pub fn len(&self) -> usize {
        self.records.iter().filter(|r| r.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record for a biome, falling back to the default row
    pub fn biome(&self, id: BiomeId) -> &BiomeRecord {
        match &self.records[id.id() as usize] {
            Some(record) => record,
            None => {
                self.unmapped.insert(id);
                &self.default
            }
        }
    }

    /// Biome ids that fell back to the default row so far, sorted
    pub fn unmapped(&self) -> Vec<BiomeId> {
        let mut ids: Vec<BiomeId> = self.unmapped.iter().map(|id| *id).collect();
        ids.sort();
        ids
    }
}

impl fmt::Display for BiomeColors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BiomeColors{{size={}, #defaulted={}}}",
            self.len(),
            self.unmapped.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
default 0xff8eb971 0xff71a74d 0xff3f76e4
0 0xff8eb971 0xff71a74d 0xff3f76e4 # Ocean
2 0xffbfb755 0xffaea42a 0xff3f76e4 # Desert
";

    #[test]
    fn test_parse_rows() {
        let record = BiomeRecord::parse("2 0xffbfb755 0xffaea42a 0xff3f76e4 # Desert").unwrap();
        assert_eq!(record.id, Some(BiomeId::new(2)));
        assert_eq!(record.foliage, Color::from_argb(0xffae_a42a));
        assert_eq!(record.comment.as_deref(), Some("Desert"));
        assert!(BiomeRecord::parse("2 0xffbfb755 0xffaea42a").is_none());
        assert!(BiomeRecord::parse("100 0xff000000 0xff000000 0xff000000").is_none());
    }

    #[test]
    fn test_influence_selection() {
        let record = BiomeRecord::parse("2 0xff000001 0xff000002 0xff000003").unwrap();
        assert_eq!(record.influence(BiomeInfluence::None), Color::WHITE);
        assert_eq!(record.influence(BiomeInfluence::Grass).b, 1);
        assert_eq!(record.influence(BiomeInfluence::Foliage).b, 2);
        assert_eq!(record.influence(BiomeInfluence::Water).b, 3);
    }

    #[test]
    fn test_lookup_and_unmapped() {
        let colors = BiomeColors::from_text(TABLE).unwrap();
        assert_eq!(colors.len(), 2);
        assert_eq!(colors.biome(BiomeId::new(2)).comment.as_deref(), Some("Desert"));
        assert_eq!(colors.biome(BiomeId::new(0x7f)), colors.default_record());
        assert_eq!(colors.unmapped(), vec![BiomeId::new(0x7f)]);
    }

    #[test]
    fn test_missing_default_is_fatal() {
        assert!(BiomeColors::from_text("0 0xff000000 0xff000000 0xff000000\n").is_err());
    }
}
