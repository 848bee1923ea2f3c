//! Crate-wide error type
//!
//! Per-cell decoding problems are reported through this type too, but callers
//! in the region and chunk layers log them and carry on with the cell treated
//! as absent. Only table loading and output writes are allowed to abort a run.

use std::path::{Path, PathBuf};

use crate::quad::Coord;

/// Result type for quad map operations
pub type QuadMapResult<T> = Result<T, QuadMapError>;

/// Errors that can occur while converting a world into a tile pyramid
#[derive(Debug, thiserror::Error)]
pub enum QuadMapError {
    #[error("Malformed container {file}: {reason}")]
    MalformedContainer { file: String, reason: String },

    #[error("Unsupported compression version {version} for chunk {cell} in {file}")]
    UnsupportedCompressionVersion {
        file: String,
        cell: Coord,
        version: u8,
    },

    #[error("No default record found in the {table} table")]
    MissingDefaultRecord { table: &'static str },

    #[error("Invalid {table} record: {line:?}")]
    InvalidRecord { table: &'static str, line: String },

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("NBT error: {0}")]
    Nbt(String),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image error on {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Region layout error: {0}")]
    Layout(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Attach a path to an IO result, the way every file touching call site wants it
pub trait IoResultExt<T> {
    fn with_path(self, path: impl AsRef<Path>) -> QuadMapResult<T>;
}

impl<T> IoResultExt<T> for Result<T, std::io::Error> {
    fn with_path(self, path: impl AsRef<Path>) -> QuadMapResult<T> {
        self.map_err(|source| QuadMapError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        })
    }
}

/// Create a malformed container error
pub fn malformed(file: impl Into<String>, reason: impl Into<String>) -> QuadMapError {
    QuadMapError::MalformedContainer {
        file: file.into(),
        reason: reason.into(),
    }
}

/// Create an NBT decoding error
pub fn nbt_error(reason: impl std::fmt::Display) -> QuadMapError {
    QuadMapError::Nbt(reason.to_string())
}
