use image::RgbaImage;
use log::{debug, warn};

use super::level::{discard_subtree, Level};
use super::tile::{is_blank, is_empty, pixel_double, sub_image, TileSource, TILE_PIXELS};
use crate::error::QuadMapResult;
use crate::output::OutputLayout;
use crate::palette::Palette;
use crate::quad::{Coord, QuadGeometry};
use crate::raster::rasterize_region;
use crate::region::Region;

/// One region whose base tiles must be rebuilt. A job without a region
/// clears the tiles of a region that no longer has source data.
#[derive(Debug, Clone, Copy)]
pub struct RegionJob<'a> {
    pub coord: Coord,
    pub region: Option<&'a Region>,
}

impl<'a> RegionJob<'a> {
    pub fn new(coord: Coord, region: Option<&'a Region>) -> Self {
        Self { coord, region }
    }
}

/// Builds the base level and the synthetic zoom-in levels, one region at
/// a time. Every image a region produces is written and released before
/// the job returns.
pub struct BaseBuilder<'a> {
    geometry: &'a QuadGeometry,
    palette: &'a Palette,
    layout: &'a OutputLayout,
    levels: &'a [Level],
    incremental: bool,
}

impl<'a> BaseBuilder<'a> {
    /// `levels` is indexed by zoom and must reach the geometry's max zoom
    pub fn new(
        geometry: &'a QuadGeometry,
        palette: &'a Palette,
        layout: &'a OutputLayout,
        levels: &'a [Level],
        incremental: bool,
    ) -> Self {
        debug_assert!(levels.len() > geometry.max_zoom() as usize);
        Self {
            geometry,
            palette,
            layout,
            levels,
            incremental,
        }
    }

    /// Rasterize one region and write its base tiles and their zoom-in
    /// descendants
    pub fn build_region(&self, job: RegionJob<'_>) -> QuadMapResult<()> {
        let image = job.region.and_then(|region| self.rasterize(region));
        let base_zoom = self.geometry.base_zoom();
        let base = &self.levels[base_zoom as usize];

        for (i, tile) in self.geometry.region_tiles(job.coord).into_iter().enumerate() {
            if !base.in_range(tile) {
                warn!("[BaseBuilder::build_region] Tile {} outside z{}", tile, base_zoom);
                continue;
            }

            let quadrant = image.as_ref().map(|image| {
                let (x, y) = quadrant_origin(i, TILE_PIXELS);
                sub_image(image, x, y, TILE_PIXELS)
            });

            match quadrant {
                Some(quadrant) if !is_blank(&quadrant) => {
                    self.zoom_in(base_zoom + 1, tile, &quadrant)?;
                    base.insert(tile, TileSource::Fresh(quadrant));
                    base.materialize_tile(tile, self.layout)?;
                }
                other => {
                    if other.is_some() {
                        base.note_blank();
                    }
                    self.discard(base_zoom, tile)?;
                }
            }
        }
        Ok(())
    }

    fn rasterize(&self, region: &Region) -> Option<RgbaImage> {
        match region.open() {
            Ok(Some(file)) => {
                let (image, surface) = rasterize_region(&file, self.palette);
                debug!(
                    "[BaseBuilder::rasterize] Region {} rasterized ({} chunks)",
                    region.coord(),
                    surface.chunk_count()
                );
                Some(image)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("[BaseBuilder::rasterize] Skipping region {}: {}", region.coord(), e);
                None
            }
        }
    }

    /// Write the four pixel-doubled children of `parent` at `zoom`, then
    /// their children, until the deepest level
    fn zoom_in(&self, zoom: u32, parent: Coord, image: &RgbaImage) -> QuadMapResult<()> {
        if zoom > self.geometry.max_zoom() {
            return Ok(());
        }
        let level = &self.levels[zoom as usize];
        let half = TILE_PIXELS / 2;

        for (i, coord) in parent.children().into_iter().enumerate() {
            let (x, y) = quadrant_origin(i, half);
            let child = pixel_double(&sub_image(image, x, y, half));
            if is_empty(&child) {
                level.note_blank();
                self.discard(zoom, coord)?;
                continue;
            }
            self.zoom_in(zoom + 1, coord, &child)?;
            level.insert(coord, TileSource::Fresh(child));
            level.materialize_tile(coord, self.layout)?;
        }
        Ok(())
    }

    /// Remove old files for an absent tile and its descendants. A full
    /// rebuild starts from an empty tree, so there is nothing to remove.
    fn discard(&self, zoom: u32, coord: Coord) -> QuadMapResult<()> {
        if self.incremental {
            discard_subtree(self.layout, zoom, coord, self.geometry.max_zoom())?;
        }
        Ok(())
    }
}

/// Pixel origin of quadrant `i` (top-left, top-right, bottom-left,
/// bottom-right) of a square with quadrants `size` wide
fn quadrant_origin(i: usize, size: u32) -> (u32, u32) {
    ((i as u32 % 2) * size, (i as u32 / 2) * size)
}
