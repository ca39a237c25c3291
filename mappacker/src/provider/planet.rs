//! Planet monthly basemap provider.
//!
//! Tiles come from the medium-resolution visual mosaic for one month:
//! `https://tiles.planet.com/basemaps/v1/planet-tiles/planet_medres_visual_{YYYY-MM}_mosaic/gmap/{z}/{x}/{y}.png`
//!
//! Authentication is HTTP basic auth with the API key as the user name and
//! an empty password.

use crate::coord::TileCoord;
use crate::provider::{AsyncHttpClient, AsyncProvider, Attribution, ProviderError, TileFormat};

const PLANET_BASE_URL: &str = "https://tiles.planet.com/basemaps/v1/planet-tiles";

/// Async Planet basemap provider.
pub struct PlanetProvider<C: AsyncHttpClient> {
    http_client: C,
    api_key: String,
    month_year: String,
}

impl<C: AsyncHttpClient> PlanetProvider<C> {
    /// Creates a provider for the mosaic of `month_year` (`YYYY-MM`).
    pub fn new(http_client: C, api_key: impl Into<String>, month_year: impl Into<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            month_year: month_year.into(),
        }
    }
}

impl<C: AsyncHttpClient> AsyncProvider for PlanetProvider<C> {
    async fn download_tile(&self, tile: TileCoord) -> Result<Vec<u8>, ProviderError> {
        if !self.supports_zoom(tile.zoom) {
            return Err(ProviderError::UnsupportedZoom(tile.zoom));
        }

        let url = self.tile_url(tile);
        self.http_client
            .get_with_basic_auth(&url, &self.api_key, "")
            .await
    }

    fn tile_url(&self, tile: TileCoord) -> String {
        format!(
            "{}/planet_medres_visual_{}_mosaic/gmap/{}/{}/{}.png",
            PLANET_BASE_URL, self.month_year, tile.zoom, tile.x, tile.y
        )
    }

    fn name(&self) -> &str {
        "planet"
    }

    fn format(&self) -> TileFormat {
        TileFormat::Png
    }

    fn attribution(&self) -> Attribution {
        Attribution::overlay(
            "Planet Maps",
            &format!("Satellite imagery from Planet ({})", self.month_year),
            "© Planet Labs PBC",
            TileFormat::Png,
        )
    }

    fn max_zoom(&self) -> u8 {
        18
    }
}
