//! Esri World Imagery provider.
//!
//! # URL Pattern
//!
//! `https://services.arcgisonline.com/arcgis/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}`
//!
//! Note the row-before-column ordering. Public access needs no token; an
//! optional ArcGIS token is sent as a bearer header.

use crate::coord::TileCoord;
use crate::provider::{AsyncHttpClient, AsyncProvider, Attribution, ProviderError, TileFormat};

const ESRI_BASE_URL: &str =
    "https://services.arcgisonline.com/arcgis/rest/services/World_Imagery/MapServer/tile";

const MAX_ZOOM: u8 = 19;

/// Async Esri World Imagery provider.
pub struct EsriProvider<C: AsyncHttpClient> {
    http_client: C,
    token: Option<String>,
}

impl<C: AsyncHttpClient> EsriProvider<C> {
    /// Creates a new Esri provider, optionally authenticating with a token.
    pub fn new(http_client: C, token: Option<String>) -> Self {
        Self {
            http_client,
            token: token.filter(|t| !t.is_empty()),
        }
    }
}

impl<C: AsyncHttpClient> AsyncProvider for EsriProvider<C> {
    async fn download_tile(&self, tile: TileCoord) -> Result<Vec<u8>, ProviderError> {
        if !self.supports_zoom(tile.zoom) {
            return Err(ProviderError::UnsupportedZoom(tile.zoom));
        }

        let url = self.tile_url(tile);
        match &self.token {
            Some(token) => self.http_client.get_with_bearer(&url, token).await,
            None => self.http_client.get(&url).await,
        }
    }

    fn tile_url(&self, tile: TileCoord) -> String {
        format!("{}/{}/{}/{}", ESRI_BASE_URL, tile.zoom, tile.y, tile.x)
    }

    fn name(&self) -> &str {
        "esri"
    }

    fn format(&self) -> TileFormat {
        TileFormat::Jpg
    }

    fn attribution(&self) -> Attribution {
        Attribution::overlay(
            "Esri Maps",
            "Satellite imagery from Esri Maps",
            "© ESRI",
            TileFormat::Jpg,
        )
    }

    fn max_zoom(&self) -> u8 {
        MAX_ZOOM
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockAsyncHttpClient;

    #[test]
    fn test_url_orders_row_before_column() {
        let provider = EsriProvider::new(MockAsyncHttpClient::ok(vec![]), None);
        assert_eq!(
            provider.tile_url(TileCoord::new(5, 8, 12)),
            format!("{}/5/12/8", ESRI_BASE_URL)
        );
    }

    #[tokio::test]
    async fn test_token_sent_as_bearer() {
        let mock = MockAsyncHttpClient::ok(vec![1]);
        let provider = EsriProvider::new(mock.clone(), Some("tok".to_string()));
        provider.download_tile(TileCoord::new(1, 0, 0)).await.unwrap();
        assert_eq!(
            mock.last_headers(),
            vec![("Authorization".to_string(), "Bearer tok".to_string())]
        );
    }

    #[tokio::test]
    async fn test_empty_token_is_anonymous() {
        let mock = MockAsyncHttpClient::ok(vec![1]);
        let provider = EsriProvider::new(mock.clone(), Some(String::new()));
        provider.download_tile(TileCoord::new(1, 0, 0)).await.unwrap();
        assert!(mock.last_headers().is_empty());
    }
}
