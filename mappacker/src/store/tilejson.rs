//! TileJSON-like source descriptor

use serde::{Deserialize, Serialize};

/// Source metadata handed to the rendering engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileJson {
    pub tilejson: String,
    pub tiles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<u8>,
    /// `[lon, lat, zoom]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<[f64; 3]>,
    /// `[west, south, east, north]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl TileJson {
    pub fn new(tiles: Vec<String>) -> Self {
        Self {
            tilejson: "1.0.0".to_string(),
            tiles,
            minzoom: None,
            maxzoom: None,
            center: None,
            bounds: None,
            format: None,
        }
    }

    /// Serializes to the JSON bytes returned through the resolver.
    pub fn to_bytes(&self) -> Vec<u8> {
        // Plain data struct; serialization cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}
