use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::Local;
use log::{debug, warn};

use crate::error::QuadMapResult;
use crate::output::TextFile;
use crate::quad::Coord;

const HEADER: &str = "# Region Cache :";
const QUAD_SHIFT: &str = "quad-shift:";
const BASE_ZOOM: &str = "base-zoom:";

/// What the ledger remembers about one region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaRegion {
    pub coord: Coord,
    /// Remaining freshness budget
    pub ttl: u8,
    /// Source modification time (ms) seen at the last rebuild
    pub touched: u64,
}

impl MetaRegion {
    pub fn new(coord: Coord) -> Self {
        Self {
            coord,
            ttl: 0,
            touched: 0,
        }
    }

    /// Count one more run without change
    pub fn decay(&mut self) {
        self.ttl = self.ttl.saturating_sub(1);
    }

    /// Parse a `[x,z] ttl touched` record
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let coord = tokens.next()?.parse().ok()?;
        let ttl = tokens.next()?.parse().ok()?;
        let touched = tokens.next()?.parse().ok()?;
        if tokens.next().is_some() {
            return None;
        }
        Some(Self { coord, ttl, touched })
    }
}

impl fmt::Display for MetaRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.coord, self.ttl, self.touched)
    }
}

/// The persisted per-region records plus the geometry of the last run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    pub regions: BTreeMap<Coord, MetaRegion>,
    pub calibration: Option<Coord>,
    pub base_zoom: Option<u32>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a ledger file; `None` when no ledger has been written yet
    pub fn load(path: impl AsRef<Path>) -> QuadMapResult<Option<Self>> {
        let path = path.as_ref();
        if !path.is_file() {
            debug!("[Ledger::load] No ledger at {}", path.display());
            return Ok(None);
        }
        let lines = TextFile::read(path)?;
        Ok(Some(Self::parse(&lines)))
    }

    /// Build a ledger from comment-free lines, skipping any that do not parse
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut ledger = Self::new();
        for line in lines {
            let line = line.as_ref();
            if let Some(rest) = line.strip_prefix(QUAD_SHIFT) {
                match rest.trim().parse() {
                    Ok(coord) => ledger.calibration = Some(coord),
                    Err(e) => warn!("[Ledger::parse] Bad quad shift {:?}: {}", line, e),
                }
            } else if let Some(rest) = line.strip_prefix(BASE_ZOOM) {
                match rest.trim().parse() {
                    Ok(zoom) => ledger.base_zoom = Some(zoom),
                    Err(e) => warn!("[Ledger::parse] Bad base zoom {:?}: {}", line, e),
                }
            } else if let Some(record) = MetaRegion::parse(line) {
                ledger.regions.insert(record.coord, record);
            } else {
                warn!("[Ledger::parse] Failed to parse meta region {:?}", line);
            }
        }
        ledger
    }

    /// The full text of the ledger file
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.regions.len() + 5);
        lines.push(format!("{} {}", HEADER, Local::now().format("%Y-%m-%d %H:%M:%S")));
        lines.extend(self.regions.values().map(ToString::to_string));
        lines.push(format!(
            "# === end of region data === <{} regions>",
            self.regions.len()
        ));
        if let Some(calibration) = self.calibration {
            lines.push(format!("{} {}", QUAD_SHIFT, calibration));
        }
        if let Some(zoom) = self.base_zoom {
            lines.push(format!("{} {}", BASE_ZOOM, zoom));
        }
        lines.push("# === end of file ===".to_string());
        lines
    }

    /// Rewrite the whole ledger file
    pub fn save(&self, path: impl AsRef<Path>) -> QuadMapResult<()> {
        let path = path.as_ref();
        TextFile::write(path, &self.to_lines())?;
        debug!(
            "[Ledger::save] Wrote {} regions to {}",
            self.regions.len(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_meta_region_record() {
        let record = MetaRegion::parse("[-3,12] 7 1400000000123").unwrap();
        assert_eq!(record.coord, Coord::new(-3, 12));
        assert_eq!(record.ttl, 7);
        assert_eq!(record.touched, 1_400_000_000_123);
        assert_eq!(record.to_string(), "[-3,12] 7 1400000000123");

        assert!(MetaRegion::parse("[1,2] 3").is_none());
        assert!(MetaRegion::parse("[1,2] x 5").is_none());
        assert!(MetaRegion::parse("[1,2] 3 5 extra").is_none());
    }

    #[test]
    fn test_decay_floors_at_zero() {
        let mut record = MetaRegion::new(Coord::ORIGIN);
        record.ttl = 1;
        record.decay();
        record.decay();
        assert_eq!(record.ttl, 0);
    }

    #[test]
    fn test_parse_skips_junk() {
        let ledger = Ledger::parse(&[
            "[0,0] 15 100",
            "[0,-1] 3 90",
            "garbage",
            "quad-shift: [-1,2]",
            "base-zoom: 4",
        ]);
        assert_eq!(ledger.regions.len(), 2);
        assert_eq!(ledger.regions[&Coord::new(0, -1)].ttl, 3);
        assert_eq!(ledger.calibration, Some(Coord::new(-1, 2)));
        assert_eq!(ledger.base_zoom, Some(4));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meta").join("region-cache.txt");

        let mut ledger = Ledger::new();
        let mut record = MetaRegion::new(Coord::new(2, -5));
        record.ttl = 12;
        record.touched = 42;
        ledger.regions.insert(record.coord, record);
        ledger.calibration = Some(Coord::new(0, -2));
        ledger.base_zoom = Some(2);
        ledger.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# Region Cache : "));
        assert!(text.contains("quad-shift: [0,-2]\n"));

        assert_eq!(Ledger::load(&path).unwrap(), Some(ledger));
        assert_eq!(Ledger::load(dir.path().join("missing.txt")).unwrap(), None);
    }
}
