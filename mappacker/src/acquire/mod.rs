//! Online acquisition
//!
//! Populates a local directory store from an imagery provider. For each zoom
//! level in ascending order the tile range is computed and validated, tiles
//! already on disk are skipped, and the rest are fetched under a shared
//! [`DownloadLimiter`]. Per-tile failures are logged and counted; the job
//! fails only when no tile at all was obtained.
//!
//! After the fetch loop the provider's attribution is written as
//! `metadata.json`, plus any companion document the provider needs.

mod downloader;
mod limiter;
mod report;

pub use downloader::{acquire, Acquisition, TileAcquirer};
pub use limiter::{DownloadLimiter, DownloadPermit};
pub use report::{AcquisitionReport, TileOutcome, ZoomSummary};

use crate::coord::CoordError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors that end an acquisition.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// Tile range for a zoom level is invalid
    #[error(transparent)]
    Coord(#[from] CoordError),

    /// No tile was obtained for any zoom level
    #[error("acquisition from {provider} failed: no tiles obtained ({failed} failed)")]
    AcquisitionFailed { provider: String, failed: u64 },

    /// Writing the attribution or companion document failed
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to encode attribution: {0}")]
    Metadata(#[from] serde_json::Error),
}
