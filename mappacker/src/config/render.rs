//! Archive render configuration.

use super::defaults::{DEFAULT_IMAGE_FORMAT, DEFAULT_RATIO, DEFAULT_TILE_SIZE};
use crate::render::{checked_pixel_size, ImageFormat, MAX_PIXEL_SIZE, MAX_RATIO};

/// Per-job rendering parameters.
///
/// # Example
///
/// ```
/// use mappacker::config::RenderConfig;
/// use mappacker::render::ImageFormat;
///
/// let config = RenderConfig::new()
///     .with_ratio(2)
///     .with_format(ImageFormat::Png);
/// assert_eq!(config.tile_size(), 512);
/// assert_eq!(config.pixel_size(), 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderConfig {
    tile_size: u32,
    ratio: u32,
    format: ImageFormat,
}

impl RenderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tile edge in logical pixels. Default: 512.
    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size.max(1);
        self
    }

    /// Set the device pixel ratio, clamped to 1..=4. Default: 1.
    pub fn with_ratio(mut self, ratio: u32) -> Self {
        self.ratio = ratio.clamp(1, MAX_RATIO);
        self
    }

    /// Set the encoded tile format. Default: jpg.
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn ratio(&self) -> u32 {
        self.ratio
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Edge of the encoded image in device pixels, capped at
    /// [`MAX_PIXEL_SIZE`].
    pub fn pixel_size(&self) -> u32 {
        self.checked_pixel_size().unwrap_or(MAX_PIXEL_SIZE)
    }

    /// Edge of the encoded image, or `None` when the tile size is too large
    /// to render at this ratio.
    pub fn checked_pixel_size(&self) -> Option<u32> {
        checked_pixel_size(self.tile_size, self.ratio)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            ratio: DEFAULT_RATIO,
            format: DEFAULT_IMAGE_FORMAT,
        }
    }
}

impl From<&super::RenderSettings> for RenderConfig {
    fn from(settings: &super::RenderSettings) -> Self {
        Self::new()
            .with_tile_size(settings.tile_size)
            .with_ratio(settings.ratio)
            .with_format(settings.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.tile_size(), 512);
        assert_eq!(config.ratio(), 1);
        assert_eq!(config.format(), ImageFormat::Jpg);
        assert_eq!(config.pixel_size(), 512);
    }

    #[test]
    fn test_zero_ratio_raised_to_one() {
        assert_eq!(RenderConfig::new().with_ratio(0).ratio(), 1);
    }

    #[test]
    fn test_ratio_clamped_and_size_checked() {
        let config = RenderConfig::new().with_ratio(1_000_000_000);
        assert_eq!(config.ratio(), MAX_RATIO);
        assert_eq!(config.checked_pixel_size(), Some(2048));

        let oversized = RenderConfig::new().with_tile_size(u32::MAX).with_ratio(2);
        assert_eq!(oversized.checked_pixel_size(), None);
        assert_eq!(oversized.pixel_size(), MAX_PIXEL_SIZE);
    }
}
