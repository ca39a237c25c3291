//! Provider types and traits

use crate::coord::TileCoord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

/// Errors that can occur during provider operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// HTTP request failed
    HttpError(String),
    /// Zoom level not supported by this provider
    UnsupportedZoom(u8),
    /// Invalid response data from provider
    InvalidResponse(String),
    /// Provider name is not in the catalogue
    UnknownProvider(String),
    /// Provider requires a credential or parameter that was not supplied
    MissingCredential {
        provider: &'static str,
        field: &'static str,
    },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::HttpError(msg) => write!(f, "HTTP error: {}", msg),
            ProviderError::UnsupportedZoom(zoom) => {
                write!(f, "Zoom level {} not supported by provider", zoom)
            }
            ProviderError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            ProviderError::UnknownProvider(name) => write!(f, "Unknown provider: {}", name),
            ProviderError::MissingCredential { provider, field } => {
                write!(f, "Provider '{}' requires {}", provider, field)
            }
        }
    }
}

impl std::error::Error for ProviderError {}

/// Encoding of the tiles a provider serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileFormat {
    Jpg,
    Png,
    Webp,
    /// Gzip-or-plain Mapbox Vector Tile
    Pbf,
}

impl TileFormat {
    /// File extension used for directory stores and metadata records.
    pub fn extension(&self) -> &'static str {
        match self {
            TileFormat::Jpg => "jpg",
            TileFormat::Png => "png",
            TileFormat::Webp => "webp",
            TileFormat::Pbf => "pbf",
        }
    }

    /// Parses an extension or metadata `format` value.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(TileFormat::Jpg),
            "png" => Some(TileFormat::Png),
            "webp" => Some(TileFormat::Webp),
            "pbf" | "mvt" => Some(TileFormat::Pbf),
            _ => None,
        }
    }

    /// True for vector payloads.
    pub fn is_vector(&self) -> bool {
        matches!(self, TileFormat::Pbf)
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Terms-of-use record persisted next to acquired tiles as `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub name: String,
    pub description: String,
    pub version: String,
    pub attribution: String,
    pub format: TileFormat,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Attribution {
    /// Builds the standard overlay record for a provider.
    pub fn overlay(name: &str, description: &str, attribution: &str, format: TileFormat) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            version: "1.0.0".to_string(),
            attribution: attribution.to_string(),
            format,
            kind: "overlay".to_string(),
        }
    }
}

/// Extra document a provider requires next to its tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanionDocument {
    /// File name relative to the tile directory root
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Async trait for online tile providers.
///
/// Implementors know how to address one upstream tile service (URL template,
/// authentication convention, payload format) and fetch a single tile.
pub trait AsyncProvider: Send + Sync {
    /// Downloads one tile asynchronously.
    fn download_tile(
        &self,
        tile: TileCoord,
    ) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send;

    /// Builds the upstream URL for a tile.
    fn tile_url(&self, tile: TileCoord) -> String;

    /// Returns the provider's catalogue identifier (e.g. `bing`).
    fn name(&self) -> &str;

    /// Returns the payload format of downloaded tiles.
    fn format(&self) -> TileFormat;

    /// Returns the attribution record required by the provider's terms.
    fn attribution(&self) -> Attribution;

    /// Returns the minimum supported zoom level.
    fn min_zoom(&self) -> u8 {
        0
    }

    /// Returns the maximum supported zoom level.
    fn max_zoom(&self) -> u8 {
        22
    }

    /// Checks if this provider supports the given zoom level.
    fn supports_zoom(&self, zoom: u8) -> bool {
        zoom >= self.min_zoom() && zoom <= self.max_zoom()
    }

    /// Fetches a companion document (such as a tile index) if the provider needs one.
    fn download_companion(
        &self,
    ) -> impl Future<Output = Result<Option<CompanionDocument>, ProviderError>> + Send {
        async { Ok(None) }
    }
}
