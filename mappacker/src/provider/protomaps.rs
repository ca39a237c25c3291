//! Protomaps vector basemap provider.
//!
//! Downloads Mapbox Vector Tiles from the hosted Protomaps API
//! (`https://api.protomaps.com/tiles/v3/{z}/{x}/{y}.mvt?key={key}`) and
//! persists the companion TileJSON (`v3.json`) as `tiles.json` so the
//! generated vector style can describe the source layers.

use crate::coord::TileCoord;
use crate::provider::{
    AsyncHttpClient, AsyncProvider, Attribution, CompanionDocument, ProviderError, TileFormat,
};

const PROTOMAPS_BASE_URL: &str = "https://api.protomaps.com/tiles";

/// File name of the persisted tile index.
pub const PROTOMAPS_TILE_INDEX: &str = "tiles.json";

/// Async Protomaps provider.
pub struct ProtomapsProvider<C: AsyncHttpClient> {
    http_client: C,
    api_key: String,
}

impl<C: AsyncHttpClient> ProtomapsProvider<C> {
    /// Creates a new Protomaps provider with the given API key.
    pub fn new(http_client: C, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
        }
    }

    fn tile_index_url(&self) -> String {
        format!(
            "{}/v3.json?key={}",
            PROTOMAPS_BASE_URL,
            urlencoding::encode(&self.api_key)
        )
    }
}

impl<C: AsyncHttpClient> AsyncProvider for ProtomapsProvider<C> {
    async fn download_tile(&self, tile: TileCoord) -> Result<Vec<u8>, ProviderError> {
        if !self.supports_zoom(tile.zoom) {
            return Err(ProviderError::UnsupportedZoom(tile.zoom));
        }

        let url = self.tile_url(tile);
        self.http_client.get(&url).await
    }

    fn tile_url(&self, tile: TileCoord) -> String {
        format!(
            "{}/v3/{}/{}/{}.mvt?key={}",
            PROTOMAPS_BASE_URL,
            tile.zoom,
            tile.x,
            tile.y,
            urlencoding::encode(&self.api_key)
        )
    }

    fn name(&self) -> &str {
        "protomaps"
    }

    fn format(&self) -> TileFormat {
        TileFormat::Pbf
    }

    fn attribution(&self) -> Attribution {
        Attribution::overlay(
            "Protomaps",
            "Vector basemap tiles from Protomaps",
            "© Protomaps © OpenStreetMap",
            TileFormat::Pbf,
        )
    }

    fn max_zoom(&self) -> u8 {
        15
    }

    async fn download_companion(&self) -> Result<Option<CompanionDocument>, ProviderError> {
        let data = self.http_client.get(&self.tile_index_url()).await?;
        serde_json::from_slice::<serde_json::Value>(&data).map_err(|e| {
            ProviderError::InvalidResponse(format!("tile index is not JSON: {}", e))
        })?;

        Ok(Some(CompanionDocument {
            file_name: PROTOMAPS_TILE_INDEX.to_string(),
            data,
        }))
    }
}
