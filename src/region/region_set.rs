use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use log::{info, warn};

use super::RegionFile;
use crate::error::{IoResultExt, QuadMapError, QuadMapResult};
use crate::quad::{Bounds, Coord};

/// Parse a region file name of the form `r.<x>.<z>.mca`
pub fn parse_region_file_name(name: &str) -> Option<Coord> {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() == 4 && parts[0] == "r" && parts[3] == "mca" {
        let x = parts[1].parse().ok()?;
        let z = parts[2].parse().ok()?;
        Some(Coord::new(x, z))
    } else {
        None
    }
}

/// Canonical file name for a region
pub fn region_file_name(coord: Coord) -> String {
    format!("r.{}.{}.mca", coord.x, coord.z)
}

/// One region known to this run
#[derive(Debug, Clone)]
pub struct Region {
    coord: Coord,
    path: Option<PathBuf>,
    modified_ms: u64,
}

impl Region {
    /// A region backed by a container file
    pub fn new(coord: Coord, path: PathBuf, modified_ms: u64) -> Self {
        Self {
            coord,
            path: Some(path),
            modified_ms,
        }
    }

    /// A region with coordinates only, for geometry work without source data
    pub fn mock(coord: Coord) -> Self {
        Self {
            coord,
            path: None,
            modified_ms: 0,
        }
    }

    pub fn coord(&self) -> Coord {
        self.coord
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_mock(&self) -> bool {
        self.path.is_none()
    }

    /// Backing file modification time in milliseconds since the epoch
    pub fn modified_ms(&self) -> u64 {
        self.modified_ms
    }

    /// Decode the backing container; a mock region has none
    pub fn open(&self) -> QuadMapResult<Option<RegionFile>> {
        match &self.path {
            Some(path) => RegionFile::open(path).map(Some),
            None => Ok(None),
        }
    }
}

/// The regions discovered in a source directory, keyed by coordinate
#[derive(Debug, Clone, Default)]
pub struct RegionSet {
    regions: BTreeMap<Coord, Region>,
}

impl RegionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// List the region containers in `dir`. Names that do not follow the
    /// region naming convention are ignored.
    pub fn scan(dir: impl AsRef<Path>) -> QuadMapResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(QuadMapError::Config(format!(
                "Not a directory: {}",
                dir.display()
            )));
        }

        let mut set = Self::new();
        for entry in fs::read_dir(dir).with_path(dir)? {
            let entry = entry.with_path(dir)?;
            let name = entry.file_name();
            let Some(coord) = parse_region_file_name(&name.to_string_lossy()) else {
                continue;
            };

            let path = entry.path();
            match file_modified_ms(&path) {
                Ok(modified_ms) => set.insert(Region::new(coord, path, modified_ms)),
                Err(e) => warn!("[RegionSet::scan] Region file error: {}", e),
            }
        }

        if set.is_empty() {
            warn!("[RegionSet::scan] No matching region files in {}", dir.display());
        } else {
            info!(
                "[RegionSet::scan] Found {} regions in {}, bounds {}",
                set.len(),
                dir.display(),
                set.bounds()
            );
        }
        Ok(set)
    }

    /// Build a set of mock regions from bare coordinates
    pub fn mock(coords: impl IntoIterator<Item = Coord>) -> Self {
        let mut set = Self::new();
        for coord in coords {
            set.insert(Region::mock(coord));
        }
        set
    }

    pub fn insert(&mut self, region: Region) {
        self.regions.insert(region.coord(), region);
    }

    pub fn get(&self, coord: Coord) -> Option<&Region> {
        self.regions.get(&coord)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    pub fn coords(&self) -> impl Iterator<Item = &Coord> {
        self.regions.keys()
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_coords(self.regions.keys())
    }

    /// Keep only the regions for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&Region) -> bool) {
        self.regions.retain(|_, region| keep(region));
    }
}

fn file_modified_ms(path: &Path) -> QuadMapResult<u64> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).with_path(path)?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0))
}
