//! Quad coordinate system
//!
//! Maps the unbounded region grid onto a power-of-two grid of base tiles and
//! derives the zoom-level geometry from it.

mod coords;
mod geometry;

pub use coords::{Bounds, Coord, ParseCoordError};
pub use geometry::{QuadGeometry, MAX_REGION_COORD, SYNTHETIC_ZOOM_LEVELS, TILES_PER_REGION_SIDE};
