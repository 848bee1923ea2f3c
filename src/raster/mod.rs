//! Surface rasterization
//!
//! Turns a region's chunks into one shaded 512x512 ARGB image: each column
//! is composited from its highest fully opaque voxel upward, then the whole
//! region is relief-shaded from the column heights.

mod column;

pub use column::{chunk_surface, ChunkSurface, SHADE_OPACITY_CUTOFF};

use image::RgbaImage;
use log::{debug, warn};

use crate::chunk::{Chunk, CHUNK_SIDE};
use crate::color::Color;
use crate::palette::Palette;
use crate::region::{RegionFile, CHUNKS_PER_SIDE};

/// Pixels along one side of a rasterized region
pub const REGION_PIXELS: usize = CHUNKS_PER_SIDE * CHUNK_SIDE;

const SHADE_CLIP: f32 = 10.0;
const SEA_LEVEL: i16 = 64;
const SEA_FACTOR: f32 = 7.0;
const SHADE_FACTOR: f32 = 8.0;

/// Brightness adjustment for a column from its height gradients and its
/// height relative to sea level.
pub fn shade_amount(dyx: f32, dyz: f32, height: i16) -> i32 {
    let slope = (dyx + dyz).clamp(-SHADE_CLIP, SHADE_CLIP);
    let depth = (height - SEA_LEVEL) as f32 / SEA_FACTOR;
    ((slope + depth) * SHADE_FACTOR) as i32
}

/// Colors and shading heights of every column of one region, row-major
#[derive(Debug, Clone)]
pub struct RegionSurface {
    colors: Vec<Color>,
    heights: Vec<i16>,
    chunks: usize,
}

impl Default for RegionSurface {
    fn default() -> Self {
        Self {
            colors: vec![Color::TRANSPARENT; REGION_PIXELS * REGION_PIXELS],
            heights: vec![0; REGION_PIXELS * REGION_PIXELS],
            chunks: 0,
        }
    }
}

impl RegionSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks that decoded and were stored
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    pub fn color_at(&self, x: usize, z: usize) -> Color {
        self.colors[z * REGION_PIXELS + x]
    }

    pub fn height_at(&self, x: usize, z: usize) -> i16 {
        self.heights[z * REGION_PIXELS + x]
    }

    /// Copy a chunk's columns into place
    pub fn store_chunk(&mut self, cx: usize, cz: usize, surface: &ChunkSurface) {
        for z in 0..CHUNK_SIDE {
            let offset = REGION_PIXELS * (CHUNK_SIDE * cz + z) + CHUNK_SIDE * cx;
            self.colors[offset..offset + CHUNK_SIDE].copy_from_slice(&surface.colors[z]);
            self.heights[offset..offset + CHUNK_SIDE].copy_from_slice(&surface.heights[z]);
        }
        self.chunks += 1;
    }

    /// Relief-shade every non-transparent column in place
    pub fn shade(&mut self) {
        let n = REGION_PIXELS;
        let h = |i: usize| self.heights[i] as f32;
        let mut shaded = self.colors.clone();

        for z in 0..n {
            for x in 0..n {
                let i = z * n + x;
                if self.colors[i].is_transparent() {
                    continue;
                }
                let dyx = match x {
                    0 => h(i + 1) - h(i),
                    _ if x == n - 1 => h(i) - h(i - 1),
                    _ => (h(i + 1) - h(i - 1)) * 2.0,
                };
                let dyz = match z {
                    0 => h(i + n) - h(i),
                    _ if z == n - 1 => h(i) - h(i - n),
                    _ => (h(i + n) - h(i - n)) * 2.0,
                };
                shaded[i] = self.colors[i].shade(shade_amount(dyx, dyz, self.heights[i]));
            }
        }
        self.colors = shaded;
    }

    /// Convert to an RGBA image
    pub fn to_image(&self) -> RgbaImage {
        let n = REGION_PIXELS as u32;
        RgbaImage::from_fn(n, n, |x, z| self.color_at(x as usize, z as usize).to_rgba())
    }
}

/// Rasterize every chunk of a region container into a shaded image.
///
/// Chunks that fail to decompress or decode are logged and left transparent.
pub fn rasterize_region(region: &RegionFile, palette: &Palette) -> (RgbaImage, RegionSurface) {
    let mut surface = RegionSurface::new();

    for cz in 0..CHUNKS_PER_SIDE {
        for cx in 0..CHUNKS_PER_SIDE {
            let Some(payload) = region.open_chunk_stream(cx, cz) else {
                continue;
            };
            match Chunk::decode(&payload) {
                Ok(chunk) => surface.store_chunk(cx, cz, &chunk_surface(&chunk, palette)),
                Err(e) => warn!(
                    "[raster::rasterize_region] {} chunk [{},{}]: {}",
                    region.name(),
                    cx,
                    cz,
                    e
                ),
            }
        }
    }

    surface.shade();
    debug!(
        "[raster::rasterize_region] {} rasterized {} chunks",
        region.name(),
        surface.chunk_count()
    );
    (surface.to_image(), surface)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shade_amount_at_sea_level_flat() {
        assert_eq!(shade_amount(0.0, 0.0, 64), 0);
    }

    #[test]
    fn test_shade_amount_truncates_toward_zero() {
        // (70 - 64) / 7 * 8 = 6.857..
        assert_eq!(shade_amount(0.0, 0.0, 70), 6);
        // (60 - 64) / 7 * 8 = -4.571..
        assert_eq!(shade_amount(0.0, 0.0, 60), -4);
    }

    #[test]
    fn test_shade_amount_clips_slope() {
        assert_eq!(shade_amount(30.0, 5.0, 64), 80);
        assert_eq!(shade_amount(-30.0, -5.0, 64), -80);
        assert_eq!(shade_amount(3.0, -1.0, 64), 16);
    }

    fn flat_surface(color: Color, height: i16) -> ChunkSurface {
        ChunkSurface {
            colors: [[color; CHUNK_SIDE]; CHUNK_SIDE],
            heights: [[height; CHUNK_SIDE]; CHUNK_SIDE],
        }
    }

    #[test]
    fn test_store_chunk_places_columns() {
        let mut surface = RegionSurface::new();
        surface.store_chunk(2, 1, &flat_surface(Color::RED, 64));
        assert_eq!(surface.chunk_count(), 1);
        assert_eq!(surface.color_at(32, 16), Color::RED);
        assert_eq!(surface.color_at(47, 31), Color::RED);
        assert_eq!(surface.color_at(48, 31), Color::TRANSPARENT);
        assert_eq!(surface.height_at(40, 20), 64);
    }

    #[test]
    fn test_shading_skips_transparent_and_brightens_high_ground() {
        let grey = Color::from_argb(0xff80_8080);
        let mut surface = RegionSurface::new();
        surface.store_chunk(0, 0, &flat_surface(grey, 71));
        surface.shade();

        // interior of a flat plateau: slope 0 inside, depth (71-64)/7 = 1
        assert_eq!(surface.color_at(5, 5), grey.shade(8));
        assert_eq!(surface.color_at(100, 100), Color::TRANSPARENT);
    }

    #[test]
    fn test_shading_uses_one_sided_edges() {
        let grey = Color::from_argb(0xff80_8080);
        let mut surface = RegionSurface::new();
        surface.store_chunk(0, 0, &flat_surface(grey, 64));
        // a step up at x=1 in row 3
        surface.heights[3 * REGION_PIXELS + 1] = 65;
        surface.shade();

        // x=0: one-sided difference h(1)-h(0) = 1 -> 8
        assert_eq!(surface.color_at(0, 3), grey.shade(8));
        // x=2: centered difference (h(3)-h(1))*2 = -2 -> -16
        assert_eq!(surface.color_at(2, 3), grey.shade(-16));
    }

    #[test]
    fn test_image_matches_surface() {
        let mut surface = RegionSurface::new();
        surface.store_chunk(31, 31, &flat_surface(Color::BLUE, 64));
        let image = surface.to_image();
        assert_eq!(image.width(), 512);
        assert_eq!(*image.get_pixel(511, 511), Color::BLUE.to_rgba());
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 0]);
    }
}
