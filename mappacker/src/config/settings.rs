//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use crate::render::ImageFormat;
use std::path::PathBuf;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// Where published archives land
    pub output: OutputSettings,
    /// Per-job scratch space
    pub workspace: WorkspaceSettings,
    /// Provider download settings
    pub download: DownloadSettings,
    /// Tile rendering settings
    pub render: RenderSettings,
    /// Provider credentials
    pub provider: ProviderSettings,
    /// Queue worker settings
    pub queue: QueueSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Output configuration.
#[derive(Debug, Clone)]
pub struct OutputSettings {
    /// Default directory for finished archives
    pub directory: PathBuf,
}

/// Workspace configuration.
#[derive(Debug, Clone)]
pub struct WorkspaceSettings {
    /// Parent directory of per-job temporary workspaces
    pub temp_dir: PathBuf,
}

/// Download configuration.
#[derive(Debug, Clone)]
pub struct DownloadSettings {
    /// Timeout in seconds for HTTP requests.
    pub timeout: u64,
    /// Tile fetches in flight at once.
    pub parallel: usize,
}

/// Render configuration.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Tile edge in logical pixels
    pub tile_size: u32,
    /// Device pixel ratio
    pub ratio: u32,
    /// Encoded output format
    pub format: ImageFormat,
}

/// Provider credentials used when a job carries none.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub mapbox_access_token: Option<String>,
    pub planet_api_key: Option<String>,
    pub protomaps_api_key: Option<String>,
    pub esri_token: Option<String>,
}

/// Queue worker configuration.
#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// Directory of pending message files
    pub spool_dir: PathBuf,
    /// Directory of per-request status records
    pub status_dir: PathBuf,
    /// Optional directory receiving completion signals
    pub destination_dir: Option<PathBuf>,
    /// Seconds to sleep when the queue is empty
    pub poll_interval: u64,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
