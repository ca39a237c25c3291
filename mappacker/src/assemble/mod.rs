//! Archive assembly
//!
//! Drives one render per tile over the whole bounds and zoom range and
//! commits the results to a new MBTiles container:
//!
//! ```text
//! opened → metadata-written → {per zoom: range → per tile: render → write} → finalized → published
//! ```
//!
//! A single tile's render failure is logged and skipped. Container writes go
//! through one [`ContainerSink`] so they stay strictly ordered. Any failure
//! before the container is finalized aborts the job.

mod metadata;
mod sink;

pub use metadata::{default_metadata, merge_source_metadata};
pub use sink::ContainerSink;

use crate::config::RenderConfig;
use crate::coord::{tile_range_for_bounds, BoundingBox, CoordError, TileCoord, ZoomRange};
use crate::render::{encode, RenderEngine, RenderError, RenderParams, MAX_PIXEL_SIZE};
use crate::resolver::ResourceLoader;
use crate::store::StoreError;
use crate::style::StyleDocument;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, trace, warn};

/// File name of the container while it is being written.
const WORKING_ARCHIVE: &str = "archive.mbtiles";

/// Errors that abort an assembly.
#[derive(Debug, Error)]
pub enum AssembleError {
    /// Container open, write or finalize failed
    #[error("storage failed: {0}")]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Coord(#[from] CoordError),

    /// The engine rejected the style up front
    #[error(transparent)]
    Style(#[from] RenderError),

    /// Tile size times ratio is larger than any render may produce
    #[error("tile size {tile_size} at ratio {ratio} exceeds {max} pixels")]
    ImageTooLarge { tile_size: u32, ratio: u32, max: u32 },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The container writer stopped without reporting an error
    #[error("container writer closed unexpectedly")]
    WriterClosed,

    #[error("background task failed: {0}")]
    Task(String),
}

impl AssembleError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Inputs for one archive.
#[derive(Debug, Clone, Copy)]
pub struct AssembleRequest<'a> {
    pub style: &'a StyleDocument,
    /// Directory holding the style's local sources and `metadata.json`
    pub source_dir: Option<&'a Path>,
    pub bounds: &'a BoundingBox,
    pub zooms: ZoomRange,
    /// Scratch directory for the working container
    pub workspace: &'a Path,
    /// Final archive path
    pub destination: &'a Path,
}

/// Render totals for one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZoomRenderSummary {
    pub zoom: u8,
    pub written: u64,
    /// Tiles outside every source's coverage
    pub empty: u64,
    pub failed: u64,
}

/// A published archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveOutput {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub tile_count: u64,
    pub zooms: Vec<ZoomRenderSummary>,
}

/// Renders tiles with `engine`, resolving resources through `loader`.
pub struct ArchiveAssembler<E: RenderEngine, L: ResourceLoader> {
    engine: E,
    loader: L,
    config: RenderConfig,
}

impl<E: RenderEngine, L: ResourceLoader> ArchiveAssembler<E, L> {
    pub fn new(engine: E, loader: L, config: RenderConfig) -> Self {
        Self {
            engine,
            loader,
            config,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Builds, finalizes and publishes the archive described by `request`.
    #[instrument(skip_all, fields(destination = %request.destination.display()))]
    pub async fn assemble(
        &self,
        request: &AssembleRequest<'_>,
    ) -> Result<ArchiveOutput, AssembleError> {
        if self.config.checked_pixel_size().is_none() {
            return Err(AssembleError::ImageTooLarge {
                tile_size: self.config.tile_size(),
                ratio: self.config.ratio(),
                max: MAX_PIXEL_SIZE,
            });
        }
        self.engine.check_style(request.style)?;

        tokio::fs::create_dir_all(request.workspace)
            .await
            .map_err(|e| AssembleError::io(request.workspace, e))?;
        let working = request.workspace.join(WORKING_ARCHIVE);

        let mut sink = ContainerSink::create(working.clone()).await?;

        let name = request
            .destination
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let defaults = default_metadata(&name, self.config.format(), request.zooms, request.bounds);
        sink.write_metadata(merge_source_metadata(defaults, request.source_dir).await)
            .await?;

        let mut zooms = Vec::new();
        for zoom in request.zooms.levels() {
            let summary = self.assemble_zoom(request, zoom, &mut sink).await?;
            info!(
                zoom,
                written = summary.written,
                empty = summary.empty,
                failed = summary.failed,
                "Zoom level rendered"
            );
            zooms.push(summary);
        }

        let stats = sink.finish().await?;
        publish(&working, request.destination).await?;

        info!(
            tiles = stats.tile_count,
            bytes = stats.size_bytes,
            "Archive published"
        );
        Ok(ArchiveOutput {
            path: request.destination.to_path_buf(),
            size_bytes: stats.size_bytes,
            tile_count: stats.tile_count,
            zooms,
        })
    }

    async fn assemble_zoom(
        &self,
        request: &AssembleRequest<'_>,
        zoom: u8,
        sink: &mut ContainerSink,
    ) -> Result<ZoomRenderSummary, AssembleError> {
        let range = tile_range_for_bounds(request.bounds, zoom)?;
        debug!(zoom, tiles = range.count(), "Rendering zoom level");

        let mut summary = ZoomRenderSummary {
            zoom,
            written: 0,
            empty: 0,
            failed: 0,
        };

        for tile in range.tiles() {
            match self.render_tile(request.style, tile).await {
                Ok(bytes) => {
                    sink.put_tile(tile, bytes).await?;
                    summary.written += 1;
                }
                Err(RenderError::NoData) => {
                    trace!(tile = %tile, "No source data");
                    summary.empty += 1;
                }
                Err(e) => {
                    warn!(tile = %tile, error = %e, "Tile render failed");
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    async fn render_tile(
        &self,
        style: &StyleDocument,
        tile: TileCoord,
    ) -> Result<Vec<u8>, RenderError> {
        let params = RenderParams::for_tile(tile, self.config.tile_size(), self.config.ratio());
        let buffer = self.engine.render(style, &self.loader, &params).await?;

        let format = self.config.format();
        tokio::task::spawn_blocking(move || encode(&buffer, format))
            .await
            .map_err(|e| RenderError::RenderFailed(format!("encode task failed: {}", e)))?
    }
}

/// Moves the finished container to `destination`, copying across filesystems.
async fn publish(working: &Path, destination: &Path) -> Result<(), AssembleError> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AssembleError::io(parent, e))?;
    }

    if tokio::fs::rename(working, destination).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(working, destination)
        .await
        .map_err(|e| AssembleError::io(destination, e))?;
    tokio::fs::remove_file(working)
        .await
        .map_err(|e| AssembleError::io(working, e))
}
