//! Acquisition download configuration.

use super::defaults::{DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_PARALLEL_DOWNLOADS};

/// Configuration for provider tile downloads.
///
/// # Example
///
/// ```
/// use mappacker::config::DownloadConfig;
///
/// let config = DownloadConfig::default();
/// assert_eq!(config.timeout_secs(), 30);
/// assert_eq!(config.parallel_downloads(), 5);
///
/// let config = DownloadConfig::new()
///     .with_timeout_secs(60)
///     .with_parallel_downloads(2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadConfig {
    /// Maximum time to spend on one HTTP request (in seconds)
    timeout_secs: u64,
    /// Maximum number of concurrent tile fetches
    parallel_downloads: usize,
}

impl DownloadConfig {
    /// Create a new download configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout in seconds. Default: 30 seconds.
    pub fn with_timeout_secs(mut self, timeout: u64) -> Self {
        self.timeout_secs = timeout;
        self
    }

    /// Set the maximum number of parallel fetches.
    ///
    /// Providers rate limit aggressively; the default of 5 is safe for all of
    /// them. Zero is raised to one.
    pub fn with_parallel_downloads(mut self, parallel: usize) -> Self {
        self.parallel_downloads = parallel.max(1);
        self
    }

    /// Get the request timeout in seconds.
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Get the maximum number of parallel fetches.
    pub fn parallel_downloads(&self) -> usize {
        self.parallel_downloads
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            parallel_downloads: DEFAULT_PARALLEL_DOWNLOADS,
        }
    }
}

impl From<&super::DownloadSettings> for DownloadConfig {
    fn from(settings: &super::DownloadSettings) -> Self {
        Self::new()
            .with_timeout_secs(settings.timeout)
            .with_parallel_downloads(settings.parallel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DownloadConfig::default();
        assert_eq!(config.timeout_secs(), DEFAULT_DOWNLOAD_TIMEOUT_SECS);
        assert_eq!(config.parallel_downloads(), DEFAULT_PARALLEL_DOWNLOADS);
    }

    #[test]
    fn test_builder_chain() {
        let config = DownloadConfig::new()
            .with_timeout_secs(45)
            .with_parallel_downloads(3);

        assert_eq!(config.timeout_secs(), 45);
        assert_eq!(config.parallel_downloads(), 3);
    }

    #[test]
    fn test_zero_parallel_raised_to_one() {
        assert_eq!(DownloadConfig::new().with_parallel_downloads(0).parallel_downloads(), 1);
    }

    #[test]
    fn test_from_settings() {
        let settings = crate::config::DownloadSettings {
            timeout: 9,
            parallel: 2,
        };
        let config = DownloadConfig::from(&settings);
        assert_eq!(config.timeout_secs(), 9);
        assert_eq!(config.parallel_downloads(), 2);
    }
}
