use std::path::PathBuf;

use image::{Rgba, RgbaImage};
use log::warn;

use crate::color::Color;
use crate::error::QuadMapResult;
use crate::output::read_png;

/// Pixels along one side of a tile
pub const TILE_PIXELS: u32 = 256;

/// Where a tile's image comes from. Sources are resolved to pixels only
/// when the tile is written.
#[derive(Debug)]
pub enum TileSource {
    /// Pixels held in memory
    Fresh(RgbaImage),
    /// A tile already written to disk
    OnDisk(PathBuf),
    /// A parent tile assembled from its four children, in top-left,
    /// top-right, bottom-left, bottom-right order
    Composite(Box<[Option<TileSource>; 4]>),
}

impl TileSource {
    /// Composite of the given children; `None` when every child is absent
    pub fn composite(children: [Option<TileSource>; 4]) -> Option<Self> {
        children
            .iter()
            .any(Option::is_some)
            .then(|| TileSource::Composite(Box::new(children)))
    }

    pub fn is_on_disk(&self) -> bool {
        matches!(self, TileSource::OnDisk(_))
    }

    /// Resolve to pixels, consuming the source
    pub fn into_image(self) -> QuadMapResult<RgbaImage> {
        match self {
            TileSource::Fresh(image) => Ok(image),
            TileSource::OnDisk(path) => read_png(path),
            TileSource::Composite(children) => {
                let [tl, tr, bl, br] = *children;
                let images = [tl, tr, bl, br].map(|child| {
                    child.and_then(|source| match source.into_image() {
                        Ok(image) => Some(image),
                        Err(e) => {
                            warn!("[TileSource::into_image] Leaving quadrant empty: {}", e);
                            None
                        }
                    })
                });
                Ok(compose(images))
            }
        }
    }
}

/// True when every pixel has zero alpha
pub fn is_blank(image: &RgbaImage) -> bool {
    image.pixels().all(|p| p.0[3] == 0)
}

/// True when the OR of every pixel value is zero
pub fn is_empty(image: &RgbaImage) -> bool {
    image.as_raw().iter().fold(0u8, |acc, &b| acc | b) == 0
}

/// Copy out a square block of `size` pixels starting at `(x, y)`
pub fn sub_image(image: &RgbaImage, x: u32, y: u32, size: u32) -> RgbaImage {
    RgbaImage::from_fn(size, size, |px, py| *image.get_pixel(x + px, y + py))
}

/// Nearest-neighbor upscale: every pixel becomes a 2x2 block
pub fn pixel_double(image: &RgbaImage) -> RgbaImage {
    let (w, h) = image.dimensions();
    let mut out = RgbaImage::new(w * 2, h * 2);
    for (x, y, pixel) in image.enumerate_pixels() {
        for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            out.put_pixel(x * 2 + dx, y * 2 + dy, *pixel);
        }
    }
    out
}

/// Halve an image by averaging each 2x2 block of ARGB values
pub fn downsample(image: &RgbaImage) -> RgbaImage {
    let (w, h) = image.dimensions();
    let packed = |x: u32, y: u32| Color::from_rgba(image.get_pixel(x, y)).to_argb();
    RgbaImage::from_fn(w / 2, h / 2, |x, y| {
        let (sx, sy) = (x * 2, y * 2);
        Color::average(&[
            packed(sx, sy),
            packed(sx + 1, sy),
            packed(sx, sy + 1),
            packed(sx + 1, sy + 1),
        ])
        .to_rgba()
    })
}

/// Build a parent tile from up to four full-size children. Absent
/// quadrants stay transparent.
pub fn compose(children: [Option<RgbaImage>; 4]) -> RgbaImage {
    let half = TILE_PIXELS / 2;
    let mut canvas = RgbaImage::from_pixel(TILE_PIXELS, TILE_PIXELS, Rgba([0, 0, 0, 0]));
    for (i, child) in children.iter().enumerate() {
        let Some(child) = child else { continue };
        let small = downsample(child);
        let (ox, oy) = ((i as u32 % 2) * half, (i as u32 / 2) * half);
        for (x, y, pixel) in small.enumerate_pixels() {
            canvas.put_pixel(ox + x, oy + y, *pixel);
        }
    }
    canvas
}
