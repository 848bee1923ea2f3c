//! Incremental cache manager
//!
//! Tracks each region's modification time across runs and decides which
//! base tiles must be rebuilt. A run whose calibration or base zoom differs
//! from the ledger's rebuilds everything from an empty tile tree.

mod ledger;

pub use ledger::{Ledger, MetaRegion};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use log::{debug, info};

use crate::error::QuadMapResult;
use crate::pyramid::Scope;
use crate::quad::{Coord, QuadGeometry};
use crate::region::RegionSet;

/// Freshness budget given to a region when it changes
pub const MAX_FRESHNESS: u8 = 15;

/// How much of the pyramid a run rebuilds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildMode {
    Full { reason: String },
    Incremental,
}

impl BuildMode {
    pub fn is_full(&self) -> bool {
        matches!(self, BuildMode::Full { .. })
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Full { reason } => write!(f, "full ({})", reason),
            BuildMode::Incremental => write!(f, "incremental"),
        }
    }
}

/// The outcome of comparing the source regions against the ledger
#[derive(Debug, Clone)]
pub struct CachePlan {
    pub mode: BuildMode,
    /// Regions whose source changed since the last run
    pub stale: BTreeSet<Coord>,
    /// Regions recorded last run that have no source any more
    pub vanished: BTreeSet<Coord>,
}

impl CachePlan {
    /// Regions whose tiles must be rebuilt. A full build covers every
    /// occupied region.
    pub fn regions(&self, geometry: &QuadGeometry) -> BTreeSet<Coord> {
        if self.mode.is_full() {
            geometry.regions().copied().collect()
        } else {
            self.stale.union(&self.vanished).copied().collect()
        }
    }

    /// Base level scope implied by the plan
    pub fn base_scope(&self, geometry: &QuadGeometry) -> Scope {
        if self.mode.is_full() {
            return Scope::Full;
        }
        Scope::stale(
            self.regions(geometry)
                .into_iter()
                .flat_map(|region| geometry.region_tiles(region)),
        )
    }
}

/// Region ledger for one output tree
#[derive(Debug)]
pub struct RegionCache {
    ledger: Ledger,
    existed: bool,
    max_freshness: u8,
}

impl RegionCache {
    pub fn new(ledger: Option<Ledger>, max_freshness: u8) -> Self {
        Self {
            existed: ledger.is_some(),
            ledger: ledger.unwrap_or_default(),
            max_freshness,
        }
    }

    pub fn load(path: impl AsRef<Path>, max_freshness: u8) -> QuadMapResult<Self> {
        Ok(Self::new(Ledger::load(path)?, max_freshness))
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Fold this run's regions into the ledger and decide what to rebuild
    pub fn update(&mut self, regions: &RegionSet, geometry: &QuadGeometry) -> CachePlan {
        let mut stale = BTreeSet::new();
        for region in regions.regions() {
            let record = self
                .ledger
                .regions
                .entry(region.coord())
                .or_insert_with(|| MetaRegion::new(region.coord()));
            if region.modified_ms() > record.touched {
                record.touched = region.modified_ms();
                record.ttl = self.max_freshness;
                stale.insert(region.coord());
            } else {
                record.decay();
            }
        }

        let vanished: BTreeSet<Coord> = self
            .ledger
            .regions
            .keys()
            .filter(|coord| regions.get(**coord).is_none())
            .copied()
            .collect();
        for coord in &vanished {
            debug!("[RegionCache::update] Region {} has no source any more", coord);
            self.ledger.regions.remove(coord);
        }

        let mode = self.mode_for(geometry);
        self.ledger.calibration = Some(geometry.calibration());
        self.ledger.base_zoom = Some(geometry.base_zoom());

        match &mode {
            BuildMode::Full { reason } => info!("[RegionCache::update] full rebuild: {}", reason),
            BuildMode::Incremental => info!(
                "[RegionCache::update] Incremental run: {} stale, {} vanished of {} regions",
                stale.len(),
                vanished.len(),
                regions.len()
            ),
        }
        CachePlan {
            mode,
            stale,
            vanished,
        }
    }

    fn mode_for(&self, geometry: &QuadGeometry) -> BuildMode {
        if !self.existed {
            return BuildMode::Full {
                reason: "no previous region cache".to_string(),
            };
        }
        let calibration = geometry.calibration();
        if self.ledger.calibration != Some(calibration) {
            return BuildMode::Full {
                reason: format!(
                    "calibration changed {} -> {}",
                    describe(self.ledger.calibration),
                    calibration
                ),
            };
        }
        if self.ledger.base_zoom != Some(geometry.base_zoom()) {
            return BuildMode::Full {
                reason: format!(
                    "base zoom changed {} -> {}",
                    describe(self.ledger.base_zoom),
                    geometry.base_zoom()
                ),
            };
        }
        BuildMode::Incremental
    }

    /// Remaining freshness budget of every tracked region
    pub fn freshness(&self) -> BTreeMap<Coord, u8> {
        self.ledger
            .regions
            .values()
            .map(|record| (record.coord, record.ttl))
            .collect()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> QuadMapResult<()> {
        self.ledger.save(path)
    }
}

fn describe<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "none".to_string(), |v| v.to_string())
}
