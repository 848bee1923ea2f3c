//! Quadmap
//!
//! Converts a voxel world's region files into a pyramid of 256x256 PNG map
//! tiles and keeps that pyramid current across runs by re-rendering only
//! the regions whose source changed.

pub mod cache;
pub mod chunk;
pub mod color;
pub mod config;
pub mod error;
pub mod nbt;
pub mod output;
pub mod palette;
pub mod pyramid;
pub mod quad;
pub mod raster;
pub mod region;
pub mod renderer;

pub use cache::{BuildMode, RegionCache};
pub use color::Color;
pub use config::RenderConfig;
pub use error::{QuadMapError, QuadMapResult};
pub use palette::Palette;
pub use quad::{Coord, QuadGeometry};
pub use region::{RegionFile, RegionSet};
pub use renderer::{RenderReport, Renderer};
