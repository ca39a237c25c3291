//! Online tile provider abstraction
//!
//! This module provides traits and implementations for downloading tiles
//! from the supported online sources (Bing Maps, Esri, Google, MapBox,
//! Planet, Protomaps).
//!
//! # Factory Pattern
//!
//! For centralized provider creation, use the [`AsyncProviderFactory`]:
//!
//! ```ignore
//! use mappacker::provider::{AsyncProviderFactory, ProviderConfig, AsyncReqwestClient};
//!
//! let http_client = AsyncReqwestClient::new()?;
//! let provider = AsyncProviderFactory::new(http_client).create(&ProviderConfig::Bing);
//! ```

mod bing;
mod esri;
mod factory;
mod google;
mod http;
mod mapbox;
mod planet;
mod protomaps;
mod types;

pub use bing::BingMapsProvider;
pub use esri::EsriProvider;
pub use factory::{
    requires_api_key, AsyncProviderFactory, AsyncProviderType, ProviderConfig,
    ProviderCredentials, PROVIDER_NAMES,
};
pub use google::GoogleProvider;
pub use http::{
    basic_auth_header, redact_url, AsyncHttpClient, AsyncReqwestClient, DEFAULT_TIMEOUT_SECS,
};
pub use mapbox::{MapBoxSatelliteProvider, MapBoxStyleProvider, MAPBOX_STYLE_TILE_SIZE};
pub use planet::PlanetProvider;
pub use protomaps::{ProtomapsProvider, PROTOMAPS_TILE_INDEX};
pub use types::{AsyncProvider, Attribution, CompanionDocument, ProviderError, TileFormat};

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;
