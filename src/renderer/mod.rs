//! Run orchestration
//!
//! One run scans the region directory, drops spurious regions, computes the
//! quad geometry, compares it with the ledger, builds the pyramid and writes
//! the ledger back.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::cache::{BuildMode, RegionCache};
use crate::config::RenderConfig;
use crate::error::{QuadMapError, QuadMapResult};
use crate::output::OutputLayout;
use crate::palette::Palette;
use crate::pyramid::{LevelStats, Pyramid, RegionJob};
use crate::quad::{Coord, QuadGeometry};
use crate::region::{Region, RegionSet};

/// Summary of one run, for logging and for the viewer-side generators
#[derive(Debug, Clone)]
pub struct RenderReport {
    pub base_zoom: u32,
    pub max_zoom: u32,
    pub calibration: Coord,
    pub mode: BuildMode,
    /// Regions used after the spurious-region filter
    pub regions: usize,
    /// Regions whose tiles were rebuilt
    pub rebuilt_regions: usize,
    /// Per level statistics, deepest level first
    pub levels: Vec<LevelStats>,
    /// Remaining freshness budget per region
    pub freshness: BTreeMap<Coord, u8>,
    pub unmapped_materials: usize,
    pub unmapped_biomes: usize,
    pub elapsed: Duration,
}

impl RenderReport {
    /// Tiles written across every level
    pub fn tiles_written(&self) -> usize {
        self.levels.iter().map(|level| level.tiles).sum()
    }

    pub fn level(&self, zoom: u32) -> Option<&LevelStats> {
        self.levels.iter().find(|level| level.zoom == zoom)
    }
}

impl fmt::Display for RenderReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} run: {} regions ({} rebuilt), zoom {}..={}, cal {}, {} tiles in {:.2}s",
            self.mode,
            self.regions,
            self.rebuilt_regions,
            self.base_zoom,
            self.max_zoom,
            self.calibration,
            self.tiles_written(),
            self.elapsed.as_secs_f64()
        )
    }
}

/// Converts one world's region directory into a tile tree
pub struct Renderer {
    config: RenderConfig,
    palette: Palette,
    layout: OutputLayout,
}

impl Renderer {
    /// Load the color tables named by the config, or the packaged ones
    pub fn new(config: RenderConfig) -> QuadMapResult<Self> {
        config.validate()?;
        let palette = Palette::load(config.block_colors.as_deref(), config.biome_colors.as_deref())?;
        Ok(Self::with_palette(config, palette))
    }

    pub fn with_palette(config: RenderConfig, palette: Palette) -> Self {
        let layout = OutputLayout::new(&config.output_dir);
        Self {
            config,
            palette,
            layout,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Scan the configured region directory and render it
    pub fn run(&self) -> QuadMapResult<RenderReport> {
        let regions = RegionSet::scan(&self.config.region_dir)?;
        self.render(regions)
    }

    /// Render an already discovered region set
    pub fn render(&self, regions: RegionSet) -> QuadMapResult<RenderReport> {
        let started = Instant::now();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(if self.config.parallel { self.config.threads } else { 1 })
            .thread_name(|idx| format!("quadmap-{}", idx))
            .build()
            .map_err(|e| QuadMapError::Config(format!("Failed to create thread pool: {}", e)))?;

        pool.install(|| self.render_in_pool(regions, started))
    }

    fn render_in_pool(&self, mut regions: RegionSet, started: Instant) -> QuadMapResult<RenderReport> {
        self.drop_spurious(&mut regions);
        if regions.is_empty() {
            return Err(QuadMapError::Config(format!(
                "No usable regions in {}",
                self.config.region_dir.display()
            )));
        }

        let geometry = QuadGeometry::new(regions.coords())?;
        info!("[Renderer::render] {}", geometry);
        debug!("[Renderer::render] Quad layout:\n{}", geometry.schematic());

        self.layout.ensure()?;
        let ledger_path = self.layout.ledger_path();
        let mut cache = RegionCache::load(&ledger_path, self.config.max_freshness)?;
        let plan = cache.update(&regions, &geometry);
        if plan.mode.is_full() {
            self.layout.reset_tiles()?;
        }

        let rebuild = plan.regions(&geometry);
        let jobs: Vec<RegionJob<'_>> = rebuild
            .iter()
            .map(|&coord| RegionJob::new(coord, regions.get(coord)))
            .collect();
        let scope = plan.base_scope(&geometry);

        let pyramid = Pyramid::new(geometry.clone());
        pyramid.build(&jobs, &scope, &self.palette, &self.layout, self.config.parallel)?;

        // the ledger is written only after every tile is on disk
        cache.save(&ledger_path)?;
        self.palette.report_unmapped();

        let report = RenderReport {
            base_zoom: geometry.base_zoom(),
            max_zoom: geometry.max_zoom(),
            calibration: geometry.calibration(),
            mode: plan.mode,
            regions: regions.len(),
            rebuilt_regions: jobs.iter().filter(|job| job.region.is_some()).count(),
            levels: pyramid.stats(),
            freshness: cache.freshness(),
            unmapped_materials: self.palette.blocks().unmapped().len(),
            unmapped_biomes: self.palette.biomes().unmapped().len(),
            elapsed: started.elapsed(),
        };
        info!("[Renderer::render] {}", report);
        Ok(report)
    }

    /// Discard regions with too few present chunks to be real terrain
    fn drop_spurious(&self, regions: &mut RegionSet) {
        let threshold = self.config.min_chunks_per_region;
        if threshold == 0 {
            return;
        }

        let spurious: Vec<Coord> = regions
            .regions()
            .collect::<Vec<&Region>>()
            .par_iter()
            .filter(|region| !region.is_mock())
            .filter_map(|region| match region.open() {
                Ok(Some(file)) if file.chunk_count() >= threshold => None,
                Ok(Some(file)) => {
                    info!(
                        "[Renderer::drop_spurious] Dropping region {} with {} chunks",
                        region.coord(),
                        file.chunk_count()
                    );
                    Some(region.coord())
                }
                Ok(None) => None,
                Err(e) => {
                    warn!("[Renderer::drop_spurious] Dropping region {}: {}", region.coord(), e);
                    Some(region.coord())
                }
            })
            .collect();

        if !spurious.is_empty() {
            regions.retain(|region| !spurious.contains(&region.coord()));
        }
    }
}
