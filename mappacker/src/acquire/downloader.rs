//! Zoom-by-zoom tile download into a directory store.

use super::{AcquireError, AcquisitionReport, DownloadLimiter, TileOutcome, ZoomSummary};
use crate::config::DownloadConfig;
use crate::coord::{tile_range_for_bounds, BoundingBox, TileCoord, ZoomRange};
use crate::provider::{redact_url, AsyncProvider, Attribution, TileFormat};
use crate::store::directory::METADATA_FILE;
use crate::store::DirectoryStore;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Result of a successful acquisition.
#[derive(Debug, Clone)]
pub struct Acquisition {
    /// Record written to `metadata.json`
    pub attribution: Attribution,
    pub report: AcquisitionReport,
}

/// Downloads a bounding box from one provider.
pub struct TileAcquirer<P: AsyncProvider> {
    provider: P,
    limiter: Arc<DownloadLimiter>,
}

impl<P: AsyncProvider> TileAcquirer<P> {
    /// Creates an acquirer sharing `limiter` with other downloads.
    pub fn new(provider: P, limiter: Arc<DownloadLimiter>) -> Self {
        Self { provider, limiter }
    }

    /// Creates an acquirer with its own limiter of `parallel` permits.
    pub fn with_parallelism(provider: P, parallel: usize) -> Self {
        Self::new(provider, Arc::new(DownloadLimiter::new(parallel)))
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Fetches every tile of `bounds` over `zooms` into `destination`.
    ///
    /// Zoom levels run in ascending order. A level that yields nothing is a
    /// warning; only a job with zero tiles obtained overall fails with
    /// [`AcquireError::AcquisitionFailed`].
    #[instrument(skip_all, fields(provider = self.provider.name()))]
    pub async fn acquire(
        &self,
        bounds: &BoundingBox,
        zooms: ZoomRange,
        destination: &DirectoryStore,
    ) -> Result<Acquisition, AcquireError> {
        let mut report = AcquisitionReport::default();

        for zoom in zooms.levels() {
            let summary = self.acquire_zoom(bounds, zoom, destination).await?;
            if summary.obtained() == 0 {
                warn!(
                    zoom,
                    failed = summary.failed,
                    "No tiles obtained for zoom level"
                );
            } else {
                info!(
                    zoom,
                    fetched = summary.fetched,
                    skipped = summary.skipped,
                    failed = summary.failed,
                    peak_in_flight = self.limiter.peak_in_flight(),
                    "Zoom level acquired"
                );
            }
            report.push(summary);
        }

        if report.obtained() == 0 {
            return Err(AcquireError::AcquisitionFailed {
                provider: self.provider.name().to_string(),
                failed: report.failed(),
            });
        }

        let attribution = self.provider.attribution();
        destination
            .write_document(METADATA_FILE, &serde_json::to_vec_pretty(&attribution)?)
            .await?;

        match self.provider.download_companion().await {
            Ok(Some(doc)) => {
                destination.write_document(&doc.file_name, &doc.data).await?;
                debug!(file = %doc.file_name, "Companion document written");
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Companion document fetch failed"),
        }

        Ok(Acquisition {
            attribution,
            report,
        })
    }

    async fn acquire_zoom(
        &self,
        bounds: &BoundingBox,
        zoom: u8,
        destination: &DirectoryStore,
    ) -> Result<ZoomSummary, AcquireError> {
        if !self.provider.supports_zoom(zoom) {
            warn!(zoom, max = self.provider.max_zoom(), "Provider does not serve zoom level");
            return Ok(ZoomSummary::new(zoom));
        }

        let range = tile_range_for_bounds(bounds, zoom)?;
        let format = self.provider.format();
        debug!(zoom, tiles = range.count(), "Acquiring zoom level");

        let outcomes: Vec<TileOutcome> = stream::iter(range.tiles())
            .map(|tile| self.fetch_tile(tile, format, destination))
            .buffer_unordered(self.limiter.max_concurrent())
            .collect()
            .await;

        Ok(ZoomSummary::from_outcomes(zoom, outcomes))
    }

    async fn fetch_tile(
        &self,
        tile: TileCoord,
        format: TileFormat,
        destination: &DirectoryStore,
    ) -> TileOutcome {
        if destination.contains(tile, format).await {
            return TileOutcome::Skipped;
        }

        let Some(_permit) = self.limiter.acquire().await else {
            return TileOutcome::Failed;
        };

        let data = match self.provider.download_tile(tile).await {
            Ok(data) => data,
            Err(e) => {
                let url = self.provider.tile_url(tile);
                warn!(tile = %tile, url = %redact_url(&url), error = %e, "Tile fetch failed");
                return TileOutcome::Failed;
            }
        };

        match destination.write_tile(tile, format, &data).await {
            Ok(_) => TileOutcome::Fetched,
            Err(e) => {
                warn!(tile = %tile, error = %e, "Tile write failed");
                TileOutcome::Failed
            }
        }
    }
}

/// Acquires `bounds` over `zooms` from `provider` into `destination`.
pub async fn acquire<P: AsyncProvider>(
    provider: P,
    bounds: &BoundingBox,
    zooms: ZoomRange,
    destination: &DirectoryStore,
    config: &DownloadConfig,
) -> Result<Acquisition, AcquireError> {
    TileAcquirer::with_parallelism(provider, config.parallel_downloads())
        .acquire(bounds, zooms, destination)
        .await
}
