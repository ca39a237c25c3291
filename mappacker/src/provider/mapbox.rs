//! MapBox imagery providers.
//!
//! Two endpoints share the same access-token convention (query parameter):
//!
//! - Style raster tiles: `https://api.mapbox.com/styles/v1/{user}/{style}/tiles/{z}/{x}/{y}?access_token={token}`
//!   delivered as 512 px PNG.
//! - Satellite: `https://api.mapbox.com/v4/mapbox.satellite/{z}/{x}/{y}.jpg?access_token={token}`
//!
//! # Usage Limits
//!
//! Free tier includes 200,000 tile requests per month.
//! See <https://www.mapbox.com/pricing/> for details.

use crate::coord::TileCoord;
use crate::provider::{AsyncHttpClient, AsyncProvider, Attribution, ProviderError, TileFormat};

const MAPBOX_STYLES_URL: &str = "https://api.mapbox.com/styles/v1";
const MAPBOX_SATELLITE_URL: &str = "https://api.mapbox.com/v4/mapbox.satellite";

const MAPBOX_ATTRIBUTION: &str = "© Mapbox © OpenStreetMap";

/// Tile size of MapBox style raster tiles in pixels.
pub const MAPBOX_STYLE_TILE_SIZE: u32 = 512;

/// MapBox style raster tile provider.
///
/// Renders a user's MapBox style (`user/style`) to raster tiles.
pub struct MapBoxStyleProvider<C: AsyncHttpClient> {
    http_client: C,
    access_token: String,
    style: String,
}

impl<C: AsyncHttpClient> MapBoxStyleProvider<C> {
    /// Creates a new provider for the `user/style` style id.
    pub fn new(http_client: C, access_token: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            http_client,
            access_token: access_token.into(),
            style: style.into(),
        }
    }
}

impl<C: AsyncHttpClient> AsyncProvider for MapBoxStyleProvider<C> {
    async fn download_tile(&self, tile: TileCoord) -> Result<Vec<u8>, ProviderError> {
        if !self.supports_zoom(tile.zoom) {
            return Err(ProviderError::UnsupportedZoom(tile.zoom));
        }

        let url = self.tile_url(tile);
        self.http_client.get(&url).await
    }

    fn tile_url(&self, tile: TileCoord) -> String {
        format!(
            "{}/{}/tiles/{}/{}/{}?access_token={}",
            MAPBOX_STYLES_URL,
            self.style,
            tile.zoom,
            tile.x,
            tile.y,
            urlencoding::encode(&self.access_token)
        )
    }

    fn name(&self) -> &str {
        "mapbox"
    }

    fn format(&self) -> TileFormat {
        TileFormat::Png
    }

    fn attribution(&self) -> Attribution {
        Attribution::overlay(
            "Mapbox Maps",
            "Map tiles from Mapbox style",
            MAPBOX_ATTRIBUTION,
            TileFormat::Png,
        )
    }
}

/// MapBox satellite imagery provider.
pub struct MapBoxSatelliteProvider<C: AsyncHttpClient> {
    http_client: C,
    access_token: String,
}

impl<C: AsyncHttpClient> MapBoxSatelliteProvider<C> {
    /// Creates a new MapBox satellite provider with the given access token.
    pub fn new(http_client: C, access_token: impl Into<String>) -> Self {
        Self {
            http_client,
            access_token: access_token.into(),
        }
    }
}

impl<C: AsyncHttpClient> AsyncProvider for MapBoxSatelliteProvider<C> {
    async fn download_tile(&self, tile: TileCoord) -> Result<Vec<u8>, ProviderError> {
        if !self.supports_zoom(tile.zoom) {
            return Err(ProviderError::UnsupportedZoom(tile.zoom));
        }

        let url = self.tile_url(tile);
        self.http_client.get(&url).await
    }

    fn tile_url(&self, tile: TileCoord) -> String {
        format!(
            "{}/{}/{}/{}.jpg?access_token={}",
            MAPBOX_SATELLITE_URL,
            tile.zoom,
            tile.x,
            tile.y,
            urlencoding::encode(&self.access_token)
        )
    }

    fn name(&self) -> &str {
        "mapbox-satellite"
    }

    fn format(&self) -> TileFormat {
        TileFormat::Jpg
    }

    fn attribution(&self) -> Attribution {
        Attribution::overlay(
            "Mapbox Satellite",
            "Satellite imagery from Mapbox",
            MAPBOX_ATTRIBUTION,
            TileFormat::Jpg,
        )
    }
}
