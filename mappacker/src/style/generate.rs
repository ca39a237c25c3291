//! Styles generated for provider shorthands.

use super::{LayerDef, SourceDef, StyleDocument};
use crate::provider::ProviderConfig;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Overlay document written into the source directory.
pub const OVERLAY_FILE: &str = "overlay.geojson";

/// Scheme of tile templates that point at the acquired directory store.
pub const IMAGERY_TEMPLATE_PREFIX: &str = "xyz://";

const OVERLAY_COLOR: &str = "#ff0000";

fn layer(id: &str, kind: &str, source: Option<&str>, paint: Value) -> LayerDef {
    LayerDef {
        id: id.to_string(),
        kind: kind.to_string(),
        source: source.map(String::from),
        source_layer: None,
        paint: Some(paint),
        extra: Map::new(),
    }
}

fn vector_layer(id: &str, kind: &str, source_layer: &str, paint: Value) -> LayerDef {
    LayerDef {
        source_layer: Some(source_layer.to_string()),
        ..layer(id, kind, Some("protomaps"), paint)
    }
}

fn tile_source(kind: &str, ext: &str, tile_size: u32, maxzoom: Option<u8>) -> SourceDef {
    SourceDef {
        kind: kind.to_string(),
        url: None,
        tiles: Some(vec![format!("{}{{z}}/{{x}}/{{y}}.{}", IMAGERY_TEMPLATE_PREFIX, ext)]),
        tile_size: Some(tile_size),
        minzoom: None,
        maxzoom,
        data: None,
        extra: Map::new(),
    }
}

/// Builds the style for a provider shorthand.
///
/// Raster providers get a background plus one raster layer over the acquired
/// tiles; Protomaps gets a small vector basemap. When `with_overlay` is set, a
/// GeoJSON source reading [`OVERLAY_FILE`] is drawn on top as a translucent
/// red fill with a red outline.
pub fn generate_style(provider: &ProviderConfig, with_overlay: bool) -> StyleDocument {
    let mut sources = BTreeMap::new();
    let mut layers = vec![layer(
        "background",
        "background",
        None,
        json!({"background-color": "#000000"}),
    )];

    match provider {
        ProviderConfig::Protomaps { .. } => {
            sources.insert(
                "protomaps".to_string(),
                tile_source("vector", provider.format().extension(), 512, Some(15)),
            );
            layers[0] = layer(
                "background",
                "background",
                None,
                json!({"background-color": "#cccccc"}),
            );
            layers.push(vector_layer("earth", "fill", "earth", json!({"fill-color": "#e2dfda"})));
            layers.push(vector_layer("water", "fill", "water", json!({"fill-color": "#80deea"})));
            layers.push(vector_layer("roads", "line", "roads", json!({"line-color": "#ffffff", "line-width": 1})));
        }
        _ => {
            sources.insert(
                "imagery".to_string(),
                tile_source(
                    "raster",
                    provider.format().extension(),
                    provider.tile_size(),
                    None,
                ),
            );
            layers.push(layer("imagery", "raster", Some("imagery"), json!({})));
        }
    }

    if with_overlay {
        sources.insert(
            "overlay".to_string(),
            SourceDef {
                kind: "geojson".to_string(),
                url: None,
                tiles: None,
                tile_size: None,
                minzoom: None,
                maxzoom: None,
                data: Some(Value::String(OVERLAY_FILE.to_string())),
                extra: Map::new(),
            },
        );
        layers.push(layer(
            "overlay-fill",
            "fill",
            Some("overlay"),
            json!({"fill-color": OVERLAY_COLOR, "fill-opacity": 0.5}),
        ));
        layers.push(layer(
            "overlay-line",
            "line",
            Some("overlay"),
            json!({"line-color": OVERLAY_COLOR, "line-width": 2}),
        ));
    }

    StyleDocument {
        version: 8,
        name: Some(provider.name().to_string()),
        sources,
        layers,
        glyphs: None,
        sprite: None,
        extra: Map::new(),
    }
}
