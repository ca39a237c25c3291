//! Google satellite imagery provider.
//!
//! Uses Google's public tile server without an API key. Coordinates are
//! passed as query parameters: `https://mt0.google.com/vt?lyrs=s&x={x}&y={y}&z={z}`.
//!
//! This endpoint is not an official API and may have usage limits.

use crate::coord::TileCoord;
use crate::provider::{AsyncHttpClient, AsyncProvider, Attribution, ProviderError, TileFormat};

/// Async Google satellite imagery provider.
pub struct GoogleProvider<C: AsyncHttpClient> {
    http_client: C,
}

impl<C: AsyncHttpClient> GoogleProvider<C> {
    /// Creates a new Google provider. No authentication is required.
    pub fn new(http_client: C) -> Self {
        Self { http_client }
    }
}

impl<C: AsyncHttpClient> AsyncProvider for GoogleProvider<C> {
    async fn download_tile(&self, tile: TileCoord) -> Result<Vec<u8>, ProviderError> {
        if !self.supports_zoom(tile.zoom) {
            return Err(ProviderError::UnsupportedZoom(tile.zoom));
        }

        let url = self.tile_url(tile);
        self.http_client.get(&url).await
    }

    fn tile_url(&self, tile: TileCoord) -> String {
        format!(
            "https://mt0.google.com/vt?lyrs=s&x={}&y={}&z={}",
            tile.x, tile.y, tile.zoom
        )
    }

    fn name(&self) -> &str {
        "google"
    }

    fn format(&self) -> TileFormat {
        TileFormat::Jpg
    }

    fn attribution(&self) -> Attribution {
        Attribution::overlay(
            "Google Maps",
            "Satellite imagery from Google Maps",
            "© Google",
            TileFormat::Jpg,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockAsyncHttpClient;

    #[test]
    fn test_url_construction() {
        let provider = GoogleProvider::new(MockAsyncHttpClient::ok(vec![]));
        assert_eq!(
            provider.tile_url(TileCoord::new(10, 301, 385)),
            "https://mt0.google.com/vt?lyrs=s&x=301&y=385&z=10"
        );
    }

    #[tokio::test]
    async fn test_download_requests_built_url() {
        let mock = MockAsyncHttpClient::ok(vec![9]);
        let provider = GoogleProvider::new(mock.clone());
        let bytes = provider.download_tile(TileCoord::new(2, 1, 1)).await.unwrap();
        assert_eq!(bytes, vec![9]);
        assert_eq!(
            mock.urls(),
            vec!["https://mt0.google.com/vt?lyrs=s&x=1&y=1&z=2".to_string()]
        );
    }
}
