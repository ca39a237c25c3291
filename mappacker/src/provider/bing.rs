//! Bing Maps satellite imagery provider

use super::http::AsyncHttpClient;
use super::types::{AsyncProvider, Attribution, ProviderError, TileFormat};
use crate::coord::{quadkey, TileCoord};

const BING_URL_TEMPLATE: &str = "http://ecn.t3.tiles.virtualearth.net/tiles/a{quadkey}.jpeg?g=1";

/// Async Bing Maps imagery provider.
///
/// Downloads satellite imagery from Bing Maps using quadkey-based URLs.
/// Bing has no zoom 0 tile; a zoom 0 request is served from the zoom 1
/// quadkey of the same x/y.
pub struct BingMapsProvider<C: AsyncHttpClient> {
    http_client: C,
    base_url: String,
}

impl<C: AsyncHttpClient> BingMapsProvider<C> {
    /// Creates a new BingMapsProvider with the given HTTP client.
    pub fn new(http_client: C) -> Self {
        Self {
            http_client,
            base_url: BING_URL_TEMPLATE.to_string(),
        }
    }

    /// Creates a new BingMapsProvider with a custom base URL.
    ///
    /// The base URL should contain `{quadkey}` as a placeholder.
    pub fn with_base_url(http_client: C, base_url: String) -> Self {
        Self {
            http_client,
            base_url,
        }
    }
}

impl<C: AsyncHttpClient> AsyncProvider for BingMapsProvider<C> {
    async fn download_tile(&self, tile: TileCoord) -> Result<Vec<u8>, ProviderError> {
        if !self.supports_zoom(tile.zoom) {
            return Err(ProviderError::UnsupportedZoom(tile.zoom));
        }

        let url = self.tile_url(tile);
        self.http_client.get(&url).await
    }

    fn tile_url(&self, tile: TileCoord) -> String {
        self.base_url
            .replace("{quadkey}", &quadkey(tile.x, tile.y, tile.zoom))
    }

    fn name(&self) -> &str {
        "bing"
    }

    fn format(&self) -> TileFormat {
        TileFormat::Jpg
    }

    fn attribution(&self) -> Attribution {
        Attribution::overlay(
            "Bing Maps",
            "Satellite imagery from Bing Maps",
            "© Microsoft (Bing Maps)",
            TileFormat::Jpg,
        )
    }

    fn max_zoom(&self) -> u8 {
        19
    }
}
