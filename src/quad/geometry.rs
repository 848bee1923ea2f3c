use std::collections::BTreeSet;
use std::fmt;

use super::{Bounds, Coord};
use crate::error::{QuadMapError, QuadMapResult};

/// Base tiles along one side of a region.
pub const TILES_PER_REGION_SIDE: i32 = 2;

/// Zoom-in levels synthesized on top of the base level.
pub const SYNTHETIC_ZOOM_LEVELS: u32 = 2;

/// Largest region coordinate magnitude whose tiles still fit the `i32` grid
pub const MAX_REGION_COORD: i32 = 1 << 27;

/// Geometry of the tile quad built over a set of occupied regions.
///
/// Everything here is a pure function of the occupied coordinates, so the
/// same region set always produces the same calibration regardless of the
/// order in which regions were discovered.
#[derive(Debug, Clone)]
pub struct QuadGeometry {
    occupied: BTreeSet<Coord>,
    bounds: Bounds,
    quad_side: i32,
    base_zoom: u32,
    calibration: Coord,
}

impl QuadGeometry {
    /// Lay out the quad over the given regions.
    ///
    /// Fails when a region lies so far out that its tile coordinates would not
    /// fit, which only happens for hand-made or corrupt file names.
    pub fn new<'a>(regions: impl IntoIterator<Item = &'a Coord>) -> QuadMapResult<Self> {
        let occupied: BTreeSet<Coord> = regions.into_iter().copied().collect();
        if let Some(far) = occupied.iter().find(|c| !in_mappable_range(**c)) {
            return Err(QuadMapError::Layout(format!(
                "region {} lies beyond the mappable range of {} regions",
                far, MAX_REGION_COORD
            )));
        }

        let bounds = Bounds::from_coords(&occupied);
        let quad_side = compute_quad_side(bounds.max_dim()).ok_or_else(|| {
            QuadMapError::Layout(format!("quad side for {} regions overflows", bounds.max_dim()))
        })?;
        let base_zoom = quad_side.trailing_zeros();
        let calibration = Coord::new(
            bounds.min_x() * TILES_PER_REGION_SIDE - centering_pad(quad_side, bounds.nx()),
            bounds.min_z() * TILES_PER_REGION_SIDE - centering_pad(quad_side, bounds.nz()),
        );

        Ok(Self {
            occupied,
            bounds,
            quad_side,
            base_zoom,
            calibration,
        })
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Number of base tiles along one side of the quad
    pub fn quad_side(&self) -> i32 {
        self.quad_side
    }

    /// Zoom level at which one tile pixel is one voxel column
    pub fn base_zoom(&self) -> u32 {
        self.base_zoom
    }

    /// Deepest zoom level, including the synthetic zoom-in levels
    pub fn max_zoom(&self) -> u32 {
        self.base_zoom + SYNTHETIC_ZOOM_LEVELS
    }

    /// Offset between doubled region coordinates and base tile coordinates
    pub fn calibration(&self) -> Coord {
        self.calibration
    }

    pub fn region_count(&self) -> usize {
        self.occupied.len()
    }

    pub fn regions(&self) -> impl Iterator<Item = &Coord> {
        self.occupied.iter()
    }

    pub fn contains_region(&self, region: Coord) -> bool {
        self.occupied.contains(&region)
    }

    /// Base tile holding the top-left quadrant of the given region
    pub fn region_to_tile(&self, region: Coord) -> Coord {
        region.scale(TILES_PER_REGION_SIDE).offset(-self.calibration.x, -self.calibration.z)
    }

    /// The four base tiles covered by a region, top-left first
    pub fn region_tiles(&self, region: Coord) -> [Coord; 4] {
        let tl = self.region_to_tile(region);
        [tl, tl.offset(1, 0), tl.offset(0, 1), tl.offset(1, 1)]
    }

    /// Region covering the given base tile, whether occupied or not
    pub fn tile_to_region(&self, tile: Coord) -> Coord {
        tile.offset(self.calibration.x, self.calibration.z).div2()
    }

    /// Occupied region covering base tile `[a,b]`, if any
    pub fn region_at(&self, a: i32, b: i32) -> Option<Coord> {
        let region = self.tile_to_region(Coord::new(a, b));
        self.occupied.contains(&region).then_some(region)
    }

    /// Text map of the quad, one character pair per base tile
    pub fn schematic(&self) -> String {
        let mut out = String::new();
        for b in 0..self.quad_side {
            for a in 0..self.quad_side {
                out.push_str(match self.region_at(a, b) {
                    None => " .",
                    Some(Coord::ORIGIN) => " O",
                    Some(_) => " #",
                });
            }
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for QuadGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "QuadGeometry{{regions={}, quadSide={}, baseZoom={}, maxZoom={}, cal={}}}",
            self.occupied.len(),
            self.quad_side,
            self.base_zoom,
            self.max_zoom(),
            self.calibration
        )
    }
}

fn in_mappable_range(region: Coord) -> bool {
    region.x.unsigned_abs() <= MAX_REGION_COORD as u32
        && region.z.unsigned_abs() <= MAX_REGION_COORD as u32
}

/// Smallest power of two that fits twice the larger region dimension
fn compute_quad_side(max_dim: i32) -> Option<i32> {
    let needed = max_dim.checked_mul(TILES_PER_REGION_SIDE)?;
    let mut side: i32 = 1;
    while side < needed {
        side = side.checked_mul(2)?;
    }
    Some(side)
}

/// Slack (in tiles) placed before the occupied area on one axis.
///
/// Halves the slack in whole regions and converts back to tiles, so odd
/// region slack rounds down to the nearest whole region.
fn centering_pad(quad_side: i32, regions_on_axis: i32) -> i32 {
    let slack = quad_side / TILES_PER_REGION_SIDE - regions_on_axis;
    slack / 2 * TILES_PER_REGION_SIDE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(raw: &[(i32, i32)]) -> QuadGeometry {
        let coords: Vec<Coord> = raw.iter().map(|&(x, z)| Coord::new(x, z)).collect();
        QuadGeometry::new(&coords).unwrap()
    }

    fn check_row(q: &QuadGeometry, row: i32, expected: &[Option<(i32, i32)>]) {
        for (i, exp) in expected.iter().enumerate() {
            let exp = exp.map(|(x, z)| Coord::new(x, z));
            for a in [2 * i as i32, 2 * i as i32 + 1] {
                for b in [2 * row, 2 * row + 1] {
                    assert_eq!(q.region_at(a, b), exp, "tile [{},{}]", a, b);
                }
            }
        }
    }

    #[test]
    fn test_two_regions_stacked() {
        let q = geometry(&[(0, 0), (0, -1)]);
        assert_eq!(q.base_zoom(), 2);
        assert_eq!(q.max_zoom(), 4);
        assert_eq!(q.quad_side(), 4);
        check_row(&q, 0, &[Some((0, -1)), None]);
        check_row(&q, 1, &[Some((0, 0)), None]);
    }

    #[test]
    fn test_dogleg() {
        let q = geometry(&[(-1, -1), (-1, 0), (0, 0), (0, 1)]);
        assert_eq!(q.base_zoom(), 3);
        assert_eq!(q.max_zoom(), 5);
        check_row(&q, 0, &[None, Some((-1, -1)), None, None]);
        check_row(&q, 1, &[None, Some((-1, 0)), Some((0, 0)), None]);
        check_row(&q, 2, &[None, None, Some((0, 1)), None]);
        check_row(&q, 3, &[None, None, None, None]);
    }

    #[test]
    fn test_snake() {
        let q = geometry(&[
            (-3, -3), (-3, -2), (-2, -2), (-2, -1), (-1, -1), (-1, 0),
            (0, 0), (0, 1), (1, 1), (1, 0), (1, -1), (1, -2), (2, -2),
        ]);
        assert_eq!(q.base_zoom(), 4);
        assert_eq!(q.max_zoom(), 6);
        check_row(&q, 1, &[None, Some((-3, -3)), None, None, None, None, None, None]);
        check_row(&q, 2, &[None, Some((-3, -2)), Some((-2, -2)), None, None, Some((1, -2)), Some((2, -2)), None]);
        check_row(&q, 5, &[None, None, None, None, Some((0, 1)), Some((1, 1)), None, None]);
        check_row(&q, 7, &[None; 8]);
    }

    #[test]
    fn test_line_rounds_odd_slack_down() {
        let q = geometry(&[(-1, 0), (0, 0), (1, 0), (2, 0), (3, 0)]);
        assert_eq!(q.base_zoom(), 4);
        // 7 regions of slack on z: 3 before, 4 after
        assert_eq!(q.calibration(), Coord::new(-4, -6));
        check_row(&q, 3, &[None, Some((-1, 0)), Some((0, 0)), Some((1, 0)), Some((2, 0)), Some((3, 0)), None, None]);
        check_row(&q, 4, &[None; 8]);
    }

    #[test]
    fn test_out_of_footprint_is_absent() {
        let q = geometry(&[(-1, -1), (-1, 0), (0, 0), (0, 1)]);
        assert_eq!(q.region_at(-100, 7), None);
        assert_eq!(q.region_at(i32::MAX / 4, i32::MIN / 4), None);
        assert_eq!(q.region_at(7, 7), None);
    }

    #[test]
    fn test_calibration_independent_of_order() {
        let a = geometry(&[(3, 1), (-2, 4), (0, 0)]);
        let b = geometry(&[(0, 0), (3, 1), (-2, 4)]);
        assert_eq!(a.calibration(), b.calibration());
        assert_eq!(a.base_zoom(), b.base_zoom());
    }

    #[test]
    fn test_region_tile_round_trip() {
        let q = geometry(&[(5, -7), (6, -7)]);
        for region in [Coord::new(5, -7), Coord::new(6, -7)] {
            for tile in q.region_tiles(region) {
                assert_eq!(q.tile_to_region(tile), region);
                assert!(tile.x >= 0 && tile.x < q.quad_side());
                assert!(tile.z >= 0 && tile.z < q.quad_side());
            }
        }
    }

    #[test]
    fn test_empty_geometry() {
        let q = geometry(&[]);
        assert_eq!(q.quad_side(), 1);
        assert_eq!(q.base_zoom(), 0);
        assert_eq!(q.calibration(), Coord::ORIGIN);
    }

    #[test]
    fn test_far_regions_are_rejected() {
        for far in [(i32::MAX, 0), (0, i32::MIN), (MAX_REGION_COORD + 1, 0)] {
            let coords = [Coord::ORIGIN, Coord::new(far.0, far.1)];
            assert!(matches!(
                QuadGeometry::new(&coords),
                Err(QuadMapError::Layout(_))
            ));
        }
    }

    #[test]
    fn test_widest_mappable_span() {
        let q = geometry(&[(-MAX_REGION_COORD, 0), (MAX_REGION_COORD, 0)]);
        assert_eq!(q.quad_side(), 1 << 30);
        assert_eq!(q.base_zoom(), 30);
        for region in [Coord::new(-MAX_REGION_COORD, 0), Coord::new(MAX_REGION_COORD, 0)] {
            let tile = q.region_to_tile(region);
            assert!(tile.x >= 0 && tile.x < q.quad_side());
            assert_eq!(q.tile_to_region(tile), region);
        }
    }

    #[test]
    fn test_quad_side_overflow() {
        assert_eq!(compute_quad_side(3), Some(8));
        assert_eq!(compute_quad_side(1 << 29), Some(1 << 30));
        assert_eq!(compute_quad_side((1 << 29) + 1), None);
        assert_eq!(compute_quad_side(i32::MAX), None);
    }

    #[test]
    fn test_schematic_marks_origin() {
        let q = geometry(&[(0, 0), (0, -1)]);
        let schematic = q.schematic();
        assert_eq!(schematic.lines().count(), 4);
        assert!(schematic.contains(" O"));
        assert!(schematic.contains(" #"));
    }
}
