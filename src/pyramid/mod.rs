//! Tile pyramid
//!
//! The base level is cut from rasterized regions, the two zoom-in levels are
//! pixel-doubled from it, and the zoom-out levels are composed bottom-up
//! down to zoom 1. Each level is finished before the next coarser one
//! starts.

mod builder;
mod level;
mod scope;
mod stats;
mod tile;
mod zoom_out;

pub use builder::{BaseBuilder, RegionJob};
pub use level::{discard_file, discard_subtree, Level};
pub use scope::Scope;
pub use stats::LevelStats;
pub use tile::{
    compose, downsample, is_blank, is_empty, pixel_double, sub_image, TileSource, TILE_PIXELS,
};
pub use zoom_out::ZoomOut;

use std::time::Instant;

use log::{debug, info};
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::error::QuadMapResult;
use crate::output::OutputLayout;
use crate::palette::Palette;
use crate::quad::QuadGeometry;

/// Lowest zoom level the pyramid is built down to
pub const MIN_ZOOM: u32 = 1;

/// Every level of one run, indexed by zoom
#[derive(Debug)]
pub struct Pyramid {
    geometry: QuadGeometry,
    levels: Vec<Level>,
    stats: Mutex<Vec<LevelStats>>,
}

impl Pyramid {
    pub fn new(geometry: QuadGeometry) -> Self {
        let levels = (0..=geometry.max_zoom()).map(Level::new).collect();
        Self {
            geometry,
            levels,
            stats: Mutex::new(Vec::new()),
        }
    }

    pub fn geometry(&self) -> &QuadGeometry {
        &self.geometry
    }

    pub fn level(&self, zoom: u32) -> Option<&Level> {
        self.levels.get(zoom as usize)
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Statistics of the levels built so far, deepest first
    pub fn stats(&self) -> Vec<LevelStats> {
        self.stats.lock().clone()
    }

    fn record(&self, zoom: u32, started: Instant) {
        let Some(level) = self.level(zoom) else { return };
        let stats = LevelStats::new(zoom, level.len(), level.blank_count(), started.elapsed());
        info!("[Pyramid::build] {}", stats);
        self.stats.lock().push(stats);
    }

    /// Build the base and zoom-in levels for `jobs`, then every zoom-out
    /// level. `scope` names the base tiles being rebuilt and must agree
    /// with the jobs.
    pub fn build(
        &self,
        jobs: &[RegionJob<'_>],
        scope: &Scope,
        palette: &Palette,
        layout: &OutputLayout,
        parallel: bool,
    ) -> QuadMapResult<()> {
        let base_zoom = self.geometry.base_zoom();
        let builder = BaseBuilder::new(
            &self.geometry,
            palette,
            layout,
            &self.levels,
            !scope.is_full(),
        );

        let started = Instant::now();
        if parallel {
            jobs.par_iter().try_for_each(|&job| builder.build_region(job))?;
        } else {
            jobs.iter().try_for_each(|&job| builder.build_region(job))?;
        }
        // the zoom-in levels are produced inside the same region jobs
        for zoom in (base_zoom..=self.geometry.max_zoom()).rev() {
            self.record(zoom, started);
        }
        debug!("[Pyramid::build] Base level:\n{}", self.levels[base_zoom as usize].schematic());

        let mut source_scope = scope.clone();
        for zoom in (MIN_ZOOM..base_zoom).rev() {
            let started = Instant::now();
            ZoomOut::new(
                &self.levels[zoom as usize + 1],
                &self.levels[zoom as usize],
                layout,
                &source_scope,
            )
            .build(parallel)?;
            self.record(zoom, started);
            source_scope = source_scope.coarser();
        }
        Ok(())
    }
}
