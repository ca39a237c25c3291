//! Style documents
//!
//! A [`StyleDocument`] is the tree of source and layer definitions handed to
//! the rendering engine. Jobs either supply one (`self` style) or name a
//! provider, in which case [`generate_style`] builds one around the acquired
//! tile directory.
//!
//! Unknown members are kept in `extra` so a user style round-trips through
//! the engine untouched.

mod generate;

pub use generate::{generate_style, OVERLAY_FILE, IMAGERY_TEMPLATE_PREFIX};

use crate::resolver::{container_name, CONTAINER_SCHEME};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or checking a style.
#[derive(Debug, Error)]
pub enum StyleError {
    #[error("failed to read style {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("style is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The style references `mbtiles://` sources but no source directory was given
    #[error("style references local containers but no source directory was given")]
    MissingSourceDir,

    /// A referenced container does not exist on disk
    #[error("container '{name}' not found at {}", path.display())]
    MissingContainer { name: String, path: PathBuf },
}

/// A source definition (`sources.<id>`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDef {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiles: Option<Vec<String>>,
    #[serde(rename = "tileSize", default, skip_serializing_if = "Option::is_none")]
    pub tile_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<u8>,
    /// GeoJSON sources: inline object or a URL string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SourceDef {
    /// Every URL this source may pull through the resolver.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        let data = match &self.data {
            Some(Value::String(url)) => Some(url.as_str()),
            _ => None,
        };
        self.url
            .as_deref()
            .into_iter()
            .chain(self.tiles.iter().flatten().map(String::as_str))
            .chain(data)
    }
}

/// A layer definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDef {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(rename = "source-layer", default, skip_serializing_if = "Option::is_none")]
    pub source_layer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paint: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LayerDef {
    /// Reads a string paint property.
    pub fn paint_str(&self, key: &str) -> Option<&str> {
        self.paint.as_ref()?.get(key)?.as_str()
    }

    /// Reads a numeric paint property.
    pub fn paint_f64(&self, key: &str) -> Option<f64> {
        self.paint.as_ref()?.get(key)?.as_f64()
    }
}

fn default_version() -> u8 {
    8
}

/// Style document consumed by the rendering engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDocument {
    #[serde(default = "default_version")]
    pub version: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub sources: BTreeMap<String, SourceDef>,
    #[serde(default)]
    pub layers: Vec<LayerDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glyphs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprite: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StyleDocument {
    /// Parses a style from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, StyleError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Reads and parses a style file.
    pub async fn load(path: &Path) -> Result<Self, StyleError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| StyleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(&bytes)
    }

    /// Serializes the style as JSON.
    pub fn to_json(&self) -> Result<Vec<u8>, StyleError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Every source URL the style references, in source-id order.
    pub fn source_references(&self) -> Vec<&str> {
        self.sources.values().flat_map(|s| s.references()).collect()
    }

    /// Names of the `mbtiles://` containers the style references, deduplicated.
    pub fn container_references(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .source_references()
            .into_iter()
            .filter(|url| url.starts_with(CONTAINER_SCHEME))
            .map(container_name)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Checks that every referenced container exists as `<source_dir>/<name>.mbtiles`.
    pub async fn check_containers(&self, source_dir: Option<&Path>) -> Result<(), StyleError> {
        let names = self.container_references();
        if names.is_empty() {
            return Ok(());
        }
        let source_dir = source_dir.ok_or(StyleError::MissingSourceDir)?;

        for name in names {
            let path = source_dir.join(format!("{}.mbtiles", name));
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(StyleError::MissingContainer {
                    name: name.to_string(),
                    path,
                });
            }
        }
        Ok(())
    }
}
