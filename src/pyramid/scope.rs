use std::collections::BTreeSet;

use crate::quad::Coord;

/// Which tiles of one level must be rebuilt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every tile
    Full,
    /// Only the listed tile coordinates
    Stale(BTreeSet<Coord>),
}

impl Scope {
    pub fn stale(coords: impl IntoIterator<Item = Coord>) -> Self {
        Scope::Stale(coords.into_iter().collect())
    }

    pub fn is_full(&self) -> bool {
        matches!(self, Scope::Full)
    }

    pub fn includes(&self, coord: Coord) -> bool {
        match self {
            Scope::Full => true,
            Scope::Stale(coords) => coords.contains(&coord),
        }
    }

    /// Number of stale coordinates; `None` for a full rebuild
    pub fn len(&self) -> Option<usize> {
        match self {
            Scope::Full => None,
            Scope::Stale(coords) => Some(coords.len()),
        }
    }

    /// True for an incremental scope with nothing to rebuild
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Scope of the next coarser level: every stale coordinate halved
    pub fn coarser(&self) -> Scope {
        match self {
            Scope::Full => Scope::Full,
            Scope::Stale(coords) => Scope::Stale(coords.iter().map(Coord::div2).collect()),
        }
    }

    /// Scope of the next finer level: the four children of every stale
    /// coordinate
    pub fn finer(&self) -> Scope {
        match self {
            Scope::Full => Scope::Full,
            Scope::Stale(coords) => {
                Scope::Stale(coords.iter().flat_map(Coord::children).collect())
            }
        }
    }

    pub fn coords(&self) -> Option<&BTreeSet<Coord>> {
        match self {
            Scope::Full => None,
            Scope::Stale(coords) => Some(coords),
        }
    }
}
