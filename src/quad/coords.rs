use std::fmt;
use std::str::FromStr;

/// Integer grid key used for regions, tiles and calibration offsets.
///
/// Ordering is by `x`, then `z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Coord {
    pub x: i32,
    pub z: i32,
}

impl Coord {
    pub const ORIGIN: Coord = Coord { x: 0, z: 0 };

    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// `[-x, -z]`
    pub fn negation(&self) -> Self {
        Self::new(-self.x, -self.z)
    }

    /// `[x*s, z*s]`
    pub fn scale(&self, s: i32) -> Self {
        Self::new(self.x * s, self.z * s)
    }

    /// Both axes halved with floor division
    pub fn div2(&self) -> Self {
        Self::new(self.x.div_euclid(2), self.z.div_euclid(2))
    }

    /// Create a new coordinate offset by the given amounts
    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.z + dz)
    }

    /// The four children of this coordinate one level finer, in
    /// top-left, top-right, bottom-left, bottom-right order.
    pub fn children(&self) -> [Coord; 4] {
        let base = self.scale(2);
        [
            base,
            base.offset(1, 0),
            base.offset(0, 1),
            base.offset(1, 1),
        ]
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.x, self.z)
    }
}

/// Error returned when a `[x,z]` string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Not a coordinate: {0:?}")]
pub struct ParseCoordError(pub String);

impl FromStr for Coord {
    type Err = ParseCoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = || ParseCoordError(s.to_string());
        let inner = s
            .trim()
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(fail)?;
        let (x, z) = inner.split_once(',').ok_or_else(fail)?;
        let x = x.trim().parse().map_err(|_| fail())?;
        let z = z.trim().parse().map_err(|_| fail())?;
        Ok(Coord::new(x, z))
    }
}

/// Minimum and maximum x/z values over a set of coordinates.
///
/// An empty bounds reports zero for every accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    min_x: i32,
    max_x: i32,
    min_z: i32,
    max_z: i32,
    empty: bool,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min_x: i32::MAX,
            max_x: i32::MIN,
            min_z: i32::MAX,
            max_z: i32::MIN,
            empty: true,
        }
    }
}

impl Bounds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build bounds covering every given coordinate
    pub fn from_coords<'a>(coords: impl IntoIterator<Item = &'a Coord>) -> Self {
        let mut bounds = Self::new();
        for coord in coords {
            bounds.add(*coord);
        }
        bounds
    }

    /// Expand the bounds to include the given point
    pub fn add(&mut self, coord: Coord) {
        self.empty = false;
        self.min_x = self.min_x.min(coord.x);
        self.max_x = self.max_x.max(coord.x);
        self.min_z = self.min_z.min(coord.z);
        self.max_z = self.max_z.max(coord.z);
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Width along x
    pub fn nx(&self) -> i32 {
        if self.empty { 0 } else { self.max_x - self.min_x + 1 }
    }

    /// Depth along z
    pub fn nz(&self) -> i32 {
        if self.empty { 0 } else { self.max_z - self.min_z + 1 }
    }

    /// The larger of the two dimensions
    pub fn max_dim(&self) -> i32 {
        self.nx().max(self.nz())
    }

    pub fn min_x(&self) -> i32 {
        if self.empty { 0 } else { self.min_x }
    }

    pub fn max_x(&self) -> i32 {
        if self.empty { 0 } else { self.max_x }
    }

    pub fn min_z(&self) -> i32 {
        if self.empty { 0 } else { self.min_z }
    }

    pub fn max_z(&self) -> i32 {
        if self.empty { 0 } else { self.max_z }
    }

    pub fn min(&self) -> Coord {
        Coord::new(self.min_x(), self.min_z())
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bounds{{[{},{}]x[{},{}] w={}, h={}, dim={}}}",
            self.min_x(),
            self.min_z(),
            self.max_x(),
            self.max_z(),
            self.nx(),
            self.nz(),
            self.max_dim()
        )
    }
}
