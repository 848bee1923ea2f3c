//! Output tree and file helpers
//!
//! Tiles land at `<out>/tiles/z<zoom>/x<x>/t.<z>.png`, run metadata under
//! `<out>/meta/`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use log::debug;

use crate::error::{IoResultExt, QuadMapError, QuadMapResult};
use crate::quad::Coord;

const TILES_DIR: &str = "tiles";
const META_DIR: &str = "meta";
const LEDGER_FILE: &str = "region-cache.txt";

/// Create a directory and its parents if missing
pub fn ensure_dir(path: impl AsRef<Path>) -> QuadMapResult<()> {
    let path = path.as_ref();
    if !path.is_dir() {
        debug!("[output::ensure_dir] Creating {}", path.display());
        fs::create_dir_all(path).with_path(path)?;
    }
    Ok(())
}

/// Delete a directory tree if it exists
pub fn remove_dir_if_exists(path: impl AsRef<Path>) -> QuadMapResult<()> {
    let path = path.as_ref();
    if path.exists() {
        fs::remove_dir_all(path).with_path(path)?;
    }
    Ok(())
}

/// Write an image as a lossless PNG, creating parent directories
pub fn write_png(path: impl AsRef<Path>, image: &RgbaImage) -> QuadMapResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|source| QuadMapError::Image {
            path: path.to_path_buf(),
            source,
        })
}

/// Read a PNG back as RGBA
pub fn read_png(path: impl AsRef<Path>) -> QuadMapResult<RgbaImage> {
    let path = path.as_ref();
    image::open(path)
        .map(|image| image.to_rgba8())
        .map_err(|source| QuadMapError::Image {
            path: path.to_path_buf(),
            source,
        })
}

/// Directory layout of one output tree
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tiles_dir(&self) -> PathBuf {
        self.root.join(TILES_DIR)
    }

    pub fn meta_dir(&self) -> PathBuf {
        self.root.join(META_DIR)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.meta_dir().join(LEDGER_FILE)
    }

    pub fn level_dir(&self, zoom: u32) -> PathBuf {
        self.tiles_dir().join(format!("z{}", zoom))
    }

    pub fn tile_path(&self, zoom: u32, coord: Coord) -> PathBuf {
        self.level_dir(zoom)
            .join(format!("x{}", coord.x))
            .join(format!("t.{}.png", coord.z))
    }

    /// Create the tile and meta directories
    pub fn ensure(&self) -> QuadMapResult<()> {
        ensure_dir(self.tiles_dir())?;
        ensure_dir(self.meta_dir())
    }

    /// Wipe and recreate the tile tree
    pub fn reset_tiles(&self) -> QuadMapResult<()> {
        remove_dir_if_exists(self.tiles_dir())?;
        ensure_dir(self.tiles_dir())
    }
}

/// Line-oriented text file access. Reads drop `#` comment lines and blank
/// lines; writes replace the whole file.
pub struct TextFile;

impl TextFile {
    /// Meaningful lines of `text`, trimmed
    pub fn filter_lines(text: &str) -> Vec<String> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect()
    }

    /// Read and filter a file
    pub fn read(path: impl AsRef<Path>) -> QuadMapResult<Vec<String>> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_path(path)?;
        Ok(Self::filter_lines(&text))
    }

    /// Replace a file with the given lines. The content goes to a sibling
    /// temporary file first and is renamed into place.
    pub fn write<S: AsRef<str>>(path: impl AsRef<Path>, lines: &[S]) -> QuadMapResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        let temp_path = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&temp_path).with_path(&temp_path)?;
            for line in lines {
                writeln!(file, "{}", line.as_ref()).with_path(&temp_path)?;
            }
            file.sync_all().with_path(&temp_path)?;
        }
        fs::rename(&temp_path, path).with_path(path)
    }
}
