//! Provider factory for centralized provider creation.
//!
//! Maps a style shorthand (`bing`, `esri`, ...) plus credentials to a
//! [`ProviderConfig`], and a config to a concrete provider behind the
//! [`AsyncProviderType`] enum.

use super::bing::BingMapsProvider;
use super::esri::EsriProvider;
use super::google::GoogleProvider;
use super::http::AsyncHttpClient;
use super::mapbox::{MapBoxSatelliteProvider, MapBoxStyleProvider};
use super::planet::PlanetProvider;
use super::protomaps::ProtomapsProvider;
use super::types::{AsyncProvider, Attribution, CompanionDocument, ProviderError, TileFormat};
use crate::coord::TileCoord;

/// Style shorthands that select an online provider.
pub const PROVIDER_NAMES: &[&str] = &[
    "bing",
    "esri",
    "google",
    "mapbox",
    "mapbox-satellite",
    "planet",
    "protomaps",
];

/// Credentials and provider parameters supplied with a job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderCredentials {
    pub api_key: Option<String>,
    /// MapBox style id, `user/style`
    pub mapbox_style: Option<String>,
    /// Planet mosaic month, `YYYY-MM`
    pub month_year: Option<String>,
}

/// Configuration for creating a provider.
///
/// New providers are added as new enum variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderConfig {
    /// Bing Maps satellite imagery. No API key required.
    Bing,

    /// Esri World Imagery. Token optional.
    Esri { token: Option<String> },

    /// Google satellite imagery. No API key required.
    Google,

    /// MapBox style rendered to raster tiles.
    MapBox { access_token: String, style: String },

    /// MapBox satellite imagery.
    MapBoxSatellite { access_token: String },

    /// Planet monthly visual mosaic.
    Planet { api_key: String, month_year: String },

    /// Protomaps vector basemap.
    Protomaps { api_key: String },
}

impl ProviderConfig {
    /// Builds a provider configuration from a style shorthand and credentials.
    pub fn from_style(
        style: &str,
        credentials: &ProviderCredentials,
    ) -> Result<Self, ProviderError> {
        let api_key = |provider: &'static str| {
            credentials
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .ok_or(ProviderError::MissingCredential {
                    provider,
                    field: "an API key",
                })
        };

        match style {
            "bing" => Ok(Self::Bing),
            "esri" => Ok(Self::Esri {
                token: credentials.api_key.clone(),
            }),
            "google" => Ok(Self::Google),
            "mapbox" => Ok(Self::MapBox {
                access_token: api_key("mapbox")?,
                style: credentials.mapbox_style.clone().ok_or(
                    ProviderError::MissingCredential {
                        provider: "mapbox",
                        field: "a mapbox style (user/style)",
                    },
                )?,
            }),
            "mapbox-satellite" => Ok(Self::MapBoxSatellite {
                access_token: api_key("mapbox-satellite")?,
            }),
            "planet" => Ok(Self::Planet {
                api_key: api_key("planet")?,
                month_year: credentials.month_year.clone().ok_or(
                    ProviderError::MissingCredential {
                        provider: "planet",
                        field: "a mosaic month (YYYY-MM)",
                    },
                )?,
            }),
            "protomaps" => Ok(Self::Protomaps {
                api_key: api_key("protomaps")?,
            }),
            other => Err(ProviderError::UnknownProvider(other.to_string())),
        }
    }

    /// Returns the catalogue identifier for this configuration.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bing => "bing",
            Self::Esri { .. } => "esri",
            Self::Google => "google",
            Self::MapBox { .. } => "mapbox",
            Self::MapBoxSatellite { .. } => "mapbox-satellite",
            Self::Planet { .. } => "planet",
            Self::Protomaps { .. } => "protomaps",
        }
    }

    /// Returns whether this provider requires an API key or access token.
    pub fn requires_api_key(&self) -> bool {
        requires_api_key(self.name())
    }

    /// Returns the format of tiles this provider serves.
    pub fn format(&self) -> TileFormat {
        match self {
            Self::MapBox { .. } | Self::Planet { .. } => TileFormat::Png,
            Self::Protomaps { .. } => TileFormat::Pbf,
            _ => TileFormat::Jpg,
        }
    }

    /// Returns the pixel size of the provider's tiles.
    pub fn tile_size(&self) -> u32 {
        match self {
            Self::MapBox { .. } => super::mapbox::MAPBOX_STYLE_TILE_SIZE,
            _ => 256,
        }
    }
}

/// Returns whether the named provider needs an API key.
pub fn requires_api_key(name: &str) -> bool {
    matches!(
        name,
        "mapbox" | "mapbox-satellite" | "planet" | "protomaps"
    )
}

/// Enum to hold different async provider types.
///
/// This allows the factory to return different concrete provider types
/// while maintaining a common interface.
pub enum AsyncProviderType<C: AsyncHttpClient> {
    Bing(BingMapsProvider<C>),
    Esri(EsriProvider<C>),
    Google(GoogleProvider<C>),
    MapBox(MapBoxStyleProvider<C>),
    MapBoxSatellite(MapBoxSatelliteProvider<C>),
    Planet(PlanetProvider<C>),
    Protomaps(ProtomapsProvider<C>),
}

macro_rules! dispatch {
    ($self:ident, $p:ident => $body:expr) => {
        match $self {
            AsyncProviderType::Bing($p) => $body,
            AsyncProviderType::Esri($p) => $body,
            AsyncProviderType::Google($p) => $body,
            AsyncProviderType::MapBox($p) => $body,
            AsyncProviderType::MapBoxSatellite($p) => $body,
            AsyncProviderType::Planet($p) => $body,
            AsyncProviderType::Protomaps($p) => $body,
        }
    };
}

impl<C: AsyncHttpClient> AsyncProvider for AsyncProviderType<C> {
    async fn download_tile(&self, tile: TileCoord) -> Result<Vec<u8>, ProviderError> {
        dispatch!(self, p => p.download_tile(tile).await)
    }

    fn tile_url(&self, tile: TileCoord) -> String {
        dispatch!(self, p => p.tile_url(tile))
    }

    fn name(&self) -> &str {
        dispatch!(self, p => p.name())
    }

    fn format(&self) -> TileFormat {
        dispatch!(self, p => p.format())
    }

    fn attribution(&self) -> Attribution {
        dispatch!(self, p => p.attribution())
    }

    fn min_zoom(&self) -> u8 {
        dispatch!(self, p => p.min_zoom())
    }

    fn max_zoom(&self) -> u8 {
        dispatch!(self, p => p.max_zoom())
    }

    async fn download_companion(&self) -> Result<Option<CompanionDocument>, ProviderError> {
        dispatch!(self, p => p.download_companion().await)
    }
}

/// Factory for creating async provider instances.
///
/// # Example
///
/// ```ignore
/// use mappacker::provider::{AsyncProviderFactory, ProviderConfig, AsyncReqwestClient};
///
/// let factory = AsyncProviderFactory::new(AsyncReqwestClient::new()?);
/// let provider = factory.create(&ProviderConfig::Bing);
/// ```
pub struct AsyncProviderFactory<C: AsyncHttpClient> {
    http_client: C,
}

impl<C: AsyncHttpClient> AsyncProviderFactory<C> {
    /// Create a new async provider factory with the given HTTP client.
    pub fn new(http_client: C) -> Self {
        Self { http_client }
    }

    /// Create an async provider from the given configuration.
    pub fn create(self, config: &ProviderConfig) -> AsyncProviderType<C> {
        let client = self.http_client;
        match config {
            ProviderConfig::Bing => AsyncProviderType::Bing(BingMapsProvider::new(client)),
            ProviderConfig::Esri { token } => {
                AsyncProviderType::Esri(EsriProvider::new(client, token.clone()))
            }
            ProviderConfig::Google => AsyncProviderType::Google(GoogleProvider::new(client)),
            ProviderConfig::MapBox {
                access_token,
                style,
            } => AsyncProviderType::MapBox(MapBoxStyleProvider::new(
                client,
                access_token.clone(),
                style.clone(),
            )),
            ProviderConfig::MapBoxSatellite { access_token } => AsyncProviderType::MapBoxSatellite(
                MapBoxSatelliteProvider::new(client, access_token.clone()),
            ),
            ProviderConfig::Planet {
                api_key,
                month_year,
            } => AsyncProviderType::Planet(PlanetProvider::new(
                client,
                api_key.clone(),
                month_year.clone(),
            )),
            ProviderConfig::Protomaps { api_key } => {
                AsyncProviderType::Protomaps(ProtomapsProvider::new(client, api_key.clone()))
            }
        }
    }
}
