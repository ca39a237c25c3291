//! Per-tile outcomes folded into per-zoom and per-job totals.

use serde::Serialize;

/// What happened to one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOutcome {
    /// Downloaded and written
    Fetched,
    /// Already present at the destination
    Skipped,
    /// Download or write failed
    Failed,
}

/// Totals for one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZoomSummary {
    pub zoom: u8,
    pub fetched: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl ZoomSummary {
    pub fn new(zoom: u8) -> Self {
        Self {
            zoom,
            fetched: 0,
            skipped: 0,
            failed: 0,
        }
    }

    /// Folds a list of outcomes into a summary.
    pub fn from_outcomes(zoom: u8, outcomes: impl IntoIterator<Item = TileOutcome>) -> Self {
        outcomes.into_iter().fold(Self::new(zoom), |mut s, outcome| {
            match outcome {
                TileOutcome::Fetched => s.fetched += 1,
                TileOutcome::Skipped => s.skipped += 1,
                TileOutcome::Failed => s.failed += 1,
            }
            s
        })
    }

    /// Tiles available at the destination after this level ran.
    pub fn obtained(&self) -> u64 {
        self.fetched + self.skipped
    }
}

/// Totals for a whole acquisition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AcquisitionReport {
    zooms: Vec<ZoomSummary>,
}

impl AcquisitionReport {
    pub fn push(&mut self, summary: ZoomSummary) {
        self.zooms.push(summary);
    }

    pub fn zooms(&self) -> &[ZoomSummary] {
        &self.zooms
    }

    pub fn fetched(&self) -> u64 {
        self.zooms.iter().map(|z| z.fetched).sum()
    }

    pub fn skipped(&self) -> u64 {
        self.zooms.iter().map(|z| z.skipped).sum()
    }

    pub fn failed(&self) -> u64 {
        self.zooms.iter().map(|z| z.failed).sum()
    }

    pub fn obtained(&self) -> u64 {
        self.fetched() + self.skipped()
    }

    /// Zoom levels that ended with no tiles at all.
    pub fn empty_levels(&self) -> Vec<u8> {
        self.zooms
            .iter()
            .filter(|z| z.obtained() == 0)
            .map(|z| z.zoom)
            .collect()
    }
}
