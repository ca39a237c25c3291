//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization and construction of
//! the job pipeline so command handlers stay small.

use crate::error::CliError;
use mappacker::config::{ConfigFile, DownloadConfig, RenderConfig};
use mappacker::job::JobRunner;
use mappacker::logging::{init_logging, split_log_path, LoggingGuard};
use mappacker::provider::AsyncReqwestClient;
use mappacker::render::RasterCompositor;
use tokio::runtime::Runtime;
use tracing::info;

/// Job runner wired with the production HTTP client and compositor.
pub type CliJobRunner = JobRunner<AsyncReqwestClient, RasterCompositor>;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Create a new CLI runner, loading config and initializing logging.
    ///
    /// # Arguments
    ///
    /// * `stdout` - Also log to stdout (the log file is always written)
    pub fn new(stdout: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?;

        let (log_dir, log_file) = split_log_path(&config.logging.file);
        let logging_guard = init_logging(&log_dir, &log_file, stdout)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("mappacker v{}", mappacker::VERSION);
        info!("mappacker CLI: {} command", command);
    }

    /// Build the job runner from the `[download]`, `[render]` and
    /// `[workspace]` settings.
    pub fn job_runner(&self) -> Result<CliJobRunner, CliError> {
        let download = DownloadConfig::from(&self.config.download);
        let http_client = AsyncReqwestClient::with_timeout(download.timeout_secs())
            .map_err(CliError::HttpClient)?;

        Ok(JobRunner::new(
            http_client,
            RasterCompositor::new(),
            self.config.workspace.temp_dir.clone(),
        )
        .with_download_config(&download)
        .with_render_config(RenderConfig::from(&self.config.render)))
    }

    /// Multi-threaded tokio runtime for the async pipeline.
    pub fn runtime(&self) -> Result<Runtime, CliError> {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)
    }
}
