use std::collections::BTreeSet;

use log::debug;
use rayon::prelude::*;

use super::level::{discard_file, Level};
use super::scope::Scope;
use super::tile::TileSource;
use crate::error::QuadMapResult;
use crate::output::OutputLayout;
use crate::quad::Coord;

/// Builds one coarser level from the level below it
pub struct ZoomOut<'a> {
    source: &'a Level,
    target: &'a Level,
    layout: &'a OutputLayout,
    source_scope: &'a Scope,
}

impl<'a> ZoomOut<'a> {
    /// `source_scope` is the set of source tiles rebuilt in this run. The
    /// target scope is always its coarser projection.
    pub fn new(
        source: &'a Level,
        target: &'a Level,
        layout: &'a OutputLayout,
        source_scope: &'a Scope,
    ) -> Self {
        debug_assert_eq!(source.zoom(), target.zoom() + 1);
        Self {
            source,
            target,
            layout,
            source_scope,
        }
    }

    /// Parent coordinates to rebuild
    pub fn parents(&self) -> Vec<Coord> {
        let parents: BTreeSet<Coord> = match self.source_scope {
            Scope::Full => self.source.coords().iter().map(Coord::div2).collect(),
            Scope::Stale(coords) => coords.iter().map(Coord::div2).collect(),
        };
        parents.into_iter().filter(|&c| self.target.in_range(c)).collect()
    }

    /// Where child `coord` of the source level comes from: the tile written
    /// this run, or in an incremental run an untouched tile from an
    /// earlier run
    fn child_source(&self, coord: Coord) -> Option<TileSource> {
        if let Some(path) = self.source.disk_path(coord) {
            return Some(TileSource::OnDisk(path));
        }
        if self.source_scope.includes(coord) {
            return None;
        }
        let path = self.layout.tile_path(self.source.zoom(), coord);
        path.is_file().then_some(TileSource::OnDisk(path))
    }

    /// Compose and write one parent tile
    pub fn build_tile(&self, parent: Coord) -> QuadMapResult<()> {
        let children = parent.children().map(|child| self.child_source(child));
        match TileSource::composite(children) {
            Some(source) => {
                self.target.insert(parent, source);
                self.target.materialize_tile(parent, self.layout)?;
            }
            None => {
                if !self.source_scope.is_full() {
                    discard_file(&self.layout.tile_path(self.target.zoom(), parent))?;
                }
            }
        }
        Ok(())
    }

    pub fn build(&self, parallel: bool) -> QuadMapResult<()> {
        let parents = self.parents();
        debug!(
            "[ZoomOut::build] z{} -> z{}: {} parents",
            self.source.zoom(),
            self.target.zoom(),
            parents.len()
        );
        if parallel {
            parents.par_iter().try_for_each(|&parent| self.build_tile(parent))
        } else {
            parents.iter().try_for_each(|&parent| self.build_tile(parent))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    use crate::output::{read_png, write_png};
    use crate::pyramid::TILE_PIXELS;

    fn solid(rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(TILE_PIXELS, TILE_PIXELS, Rgba(rgba))
    }

    #[test]
    fn test_full_zoom_out_composes_children() {
        let dir = TempDir::new().unwrap();
        let layout = OutputLayout::new(dir.path());
        let source = Level::new(2);
        let target = Level::new(1);
        source.insert(Coord::new(2, 0), TileSource::Fresh(solid([255, 0, 0, 255])));
        source.insert(Coord::new(1, 1), TileSource::Fresh(solid([0, 0, 255, 255])));
        source.materialize(&layout, false).unwrap();

        let scope = Scope::Full;
        let zoom_out = ZoomOut::new(&source, &target, &layout, &scope);
        assert_eq!(zoom_out.parents(), vec![Coord::new(0, 0), Coord::new(1, 0)]);
        zoom_out.build(false).unwrap();

        assert_eq!(target.coords(), vec![Coord::new(0, 0), Coord::new(1, 0)]);
        let image = read_png(layout.tile_path(1, Coord::new(0, 0))).unwrap();
        assert_eq!(image.get_pixel(200, 200).0, [0, 0, 255, 255]);
        assert_eq!(image.get_pixel(10, 10).0, [0, 0, 0, 0]);
        let image = read_png(layout.tile_path(1, Coord::new(1, 0))).unwrap();
        assert_eq!(image.get_pixel(10, 10).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_incremental_zoom_out_reuses_untouched_siblings() {
        let dir = TempDir::new().unwrap();
        let layout = OutputLayout::new(dir.path());

        // an earlier run left a green tile at [1,0]
        write_png(layout.tile_path(2, Coord::new(1, 0)), &solid([0, 255, 0, 255])).unwrap();
        // and a tile at [0,1] that has since become absent
        write_png(layout.tile_path(2, Coord::new(0, 1)), &solid([9, 9, 9, 255])).unwrap();

        let source = Level::new(2);
        let target = Level::new(1);
        source.insert(Coord::new(0, 0), TileSource::Fresh(solid([255, 0, 0, 255])));
        source.materialize(&layout, false).unwrap();

        let scope = Scope::stale([Coord::new(0, 0), Coord::new(0, 1)]);
        let zoom_out = ZoomOut::new(&source, &target, &layout, &scope);
        assert_eq!(zoom_out.parents(), vec![Coord::new(0, 0)]);
        zoom_out.build(false).unwrap();

        let image = read_png(layout.tile_path(1, Coord::new(0, 0))).unwrap();
        assert_eq!(image.get_pixel(10, 10).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(200, 10).0, [0, 255, 0, 255]);
        // stale child with no fresh tile stays transparent
        assert_eq!(image.get_pixel(10, 200).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_absent_parent_removes_old_file() {
        let dir = TempDir::new().unwrap();
        let layout = OutputLayout::new(dir.path());
        let old = layout.tile_path(1, Coord::new(1, 1));
        write_png(&old, &solid([1, 1, 1, 255])).unwrap();

        let source = Level::new(2);
        let target = Level::new(1);
        let scope = Scope::stale([Coord::new(2, 2)]);
        ZoomOut::new(&source, &target, &layout, &scope).build(true).unwrap();

        assert!(target.is_empty());
        assert!(!old.exists());
    }
}
