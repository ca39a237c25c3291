//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;
use crate::render::ImageFormat;

// =============================================================================
// Download defaults
// =============================================================================

/// Default timeout for provider HTTP requests in seconds.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Default number of tile fetches in flight per acquisition.
///
/// Kept low to stay under provider rate limits.
pub const DEFAULT_PARALLEL_DOWNLOADS: usize = 5;

// =============================================================================
// Render defaults
// =============================================================================

/// Rendered tile edge in logical pixels.
pub const DEFAULT_TILE_SIZE: u32 = 512;

/// Default device pixel ratio.
pub const DEFAULT_RATIO: u32 = 1;

/// Default encoded tile format.
pub const DEFAULT_IMAGE_FORMAT: ImageFormat = ImageFormat::Jpg;

// =============================================================================
// Queue defaults
// =============================================================================

/// Seconds the worker sleeps when the queue is empty.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Default directory for published archives.
pub fn default_output_dir() -> PathBuf {
    config_directory().join("maps")
}

/// Default parent of per-job temporary workspaces.
pub fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("mappacker")
}

impl Default for ConfigFile {
    fn default() -> Self {
        let config_dir = config_directory();

        Self {
            output: OutputSettings {
                directory: default_output_dir(),
            },
            workspace: WorkspaceSettings {
                temp_dir: default_temp_dir(),
            },
            download: DownloadSettings {
                timeout: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
                parallel: DEFAULT_PARALLEL_DOWNLOADS,
            },
            render: RenderSettings {
                tile_size: DEFAULT_TILE_SIZE,
                ratio: DEFAULT_RATIO,
                format: DEFAULT_IMAGE_FORMAT,
            },
            provider: ProviderSettings::default(),
            queue: QueueSettings {
                spool_dir: config_dir.join("queue"),
                status_dir: config_dir.join("status"),
                destination_dir: None,
                poll_interval: DEFAULT_POLL_INTERVAL_SECS,
            },
            logging: LoggingSettings {
                file: config_dir.join("mappacker.log"),
            },
        }
    }
}
