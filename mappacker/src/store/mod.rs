//! Tile store readers and writers
//!
//! Backends for the resolver and the archive assembler:
//!
//! - [`mbtiles`] - SQLite container (read per call, single writer)
//! - [`pmtiles`] - range-addressed single file, local or over HTTP
//! - [`directory`] - `{z}/{x}/{y}.{ext}` tree on disk
//! - [`geojson`] - a single document returned verbatim
//! - [`remote`] - network passthrough for glyphs and sprites
//!
//! A tile that is legitimately absent reads as `Ok(None)`, never an error.

pub mod directory;
pub mod geojson;
pub mod mbtiles;
pub mod pmtiles;
pub mod remote;
mod tilejson;

pub use directory::DirectoryStore;
pub use mbtiles::{ArchiveStats, MbtilesReader, MbtilesWriter};
pub use pmtiles::{HttpRangeSource, LocalRangeSource, PmtilesHeader, PmtilesReader, RangeSource};
pub use tilejson::TileJson;

use crate::provider::ProviderError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by tile store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File open or read failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// SQLite failure in an MBTiles container
    #[error("MBTiles error on {path}: {source}")]
    Sqlite {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Container contents do not follow the expected format
    #[error("invalid archive {0}")]
    InvalidArchive(String),

    /// Compressed payload could not be inflated
    #[error("decompression failed: {0}")]
    Decompress(String),

    /// Network read failed
    #[error("remote read failed: {0}")]
    Remote(#[from] ProviderError),

    /// Blocking task panicked or was cancelled
    #[error("background task failed: {0}")]
    Task(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn sqlite(path: impl Into<PathBuf>, source: rusqlite::Error) -> Self {
        Self::Sqlite {
            path: path.into(),
            source,
        }
    }
}
