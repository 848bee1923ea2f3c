use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use log::debug;
use rayon::prelude::*;

use super::tile::{is_blank, TileSource};
use crate::error::{IoResultExt, QuadMapResult};
use crate::output::{write_png, OutputLayout};
use crate::quad::Coord;

/// All tiles of one zoom level, keyed by tile coordinate
#[derive(Debug)]
pub struct Level {
    zoom: u32,
    tiles: DashMap<Coord, TileSource>,
    blank: AtomicUsize,
}

impl Level {
    pub fn new(zoom: u32) -> Self {
        Self {
            zoom,
            tiles: DashMap::new(),
            blank: AtomicUsize::new(0),
        }
    }

    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    /// Tiles along one side of the level
    pub fn side(&self) -> i32 {
        1 << self.zoom
    }

    pub fn in_range(&self, coord: Coord) -> bool {
        (0..self.side()).contains(&coord.x) && (0..self.side()).contains(&coord.z)
    }

    pub fn insert(&self, coord: Coord, source: TileSource) {
        debug_assert!(self.in_range(coord), "tile {} outside z{}", coord, self.zoom);
        self.tiles.insert(coord, source);
    }

    pub fn contains(&self, coord: Coord) -> bool {
        self.tiles.contains_key(&coord)
    }

    /// Path of a written tile, if the tile is present and on disk
    pub fn disk_path(&self, coord: Coord) -> Option<PathBuf> {
        self.tiles.get(&coord).and_then(|entry| match entry.value() {
            TileSource::OnDisk(path) => Some(path.clone()),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Rebuilt tiles that came out blank and were dropped
    pub fn blank_count(&self) -> usize {
        self.blank.load(Ordering::Relaxed)
    }

    pub fn note_blank(&self) {
        self.blank.fetch_add(1, Ordering::Relaxed);
    }

    /// Present tile coordinates in (x, z) order
    pub fn coords(&self) -> Vec<Coord> {
        let mut coords: Vec<Coord> = self.tiles.iter().map(|entry| *entry.key()).collect();
        coords.sort();
        coords
    }

    /// Resolve one tile to pixels and write it. A blank result is dropped
    /// from the level and any older file at its path removed. Returns
    /// whether the tile is present afterwards.
    pub fn materialize_tile(&self, coord: Coord, layout: &OutputLayout) -> QuadMapResult<bool> {
        let Some((_, source)) = self.tiles.remove(&coord) else {
            return Ok(false);
        };
        if source.is_on_disk() {
            self.tiles.insert(coord, source);
            return Ok(true);
        }

        let image = source.into_image()?;
        let path = layout.tile_path(self.zoom, coord);
        if is_blank(&image) {
            self.note_blank();
            discard_file(&path)?;
            return Ok(false);
        }
        write_png(&path, &image)?;
        self.tiles.insert(coord, TileSource::OnDisk(path));
        Ok(true)
    }

    /// Materialize every tile still held in memory
    pub fn materialize(&self, layout: &OutputLayout, parallel: bool) -> QuadMapResult<()> {
        let pending: Vec<Coord> = self
            .tiles
            .iter()
            .filter(|entry| !entry.value().is_on_disk())
            .map(|entry| *entry.key())
            .collect();
        debug!("[Level::materialize] z{} writing {} tiles", self.zoom, pending.len());

        if parallel {
            pending
                .par_iter()
                .try_for_each(|&coord| self.materialize_tile(coord, layout).map(|_| ()))
        } else {
            pending
                .iter()
                .try_for_each(|&coord| self.materialize_tile(coord, layout).map(|_| ()))
        }
    }

    /// Text map of the level, `#` for present tiles
    pub fn schematic(&self) -> String {
        let mut out = String::new();
        for z in 0..self.side() {
            for x in 0..self.side() {
                out.push_str(if self.contains(Coord::new(x, z)) { " #" } else { " ." });
            }
            out.push('\n');
        }
        out
    }
}

/// Remove a previously written tile, if any
pub fn discard_file(path: &std::path::Path) -> QuadMapResult<()> {
    if path.is_file() {
        debug!("[pyramid::discard_file] Removing {}", path.display());
        fs::remove_file(path).with_path(path)?;
    }
    Ok(())
}

/// Remove the written tile at `coord` and every finer tile below it, down
/// to `max_zoom`
pub fn discard_subtree(
    layout: &OutputLayout,
    zoom: u32,
    coord: Coord,
    max_zoom: u32,
) -> QuadMapResult<()> {
    discard_file(&layout.tile_path(zoom, coord))?;
    if zoom < max_zoom {
        for child in coord.children() {
            discard_subtree(layout, zoom + 1, child, max_zoom)?;
        }
    }
    Ok(())
}
