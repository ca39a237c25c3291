//! Built-in raster compositor.
//!
//! Paints `background` layers and composites `raster` layers by pulling
//! source tiles through the resolver and scaling them to the output size.
//! Vector and GeoJSON layers are left to a full engine.

use super::{parse_color, PixelBuffer, RenderEngine, RenderError, RenderParams};
use crate::coord::TileCoord;
use crate::resolver::{expand_template, RequestKind, ResourceLoader, ResourceRequest};
use crate::store::TileJson;
use crate::style::{LayerDef, SourceDef, StyleDocument};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use std::collections::BTreeSet;
use tracing::{trace, warn};

/// Layer types the compositor paints.
const DRAWN_LAYER_TYPES: &[&str] = &["background", "raster"];

/// Minimal [`RenderEngine`] for raster styles.
///
/// Fails with [`RenderError::NoData`] when no raster layer found a source
/// tile, so tiles outside source coverage are skipped instead of written blank.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterCompositor;

impl RasterCompositor {
    pub fn new() -> Self {
        Self
    }

    /// Tile templates and max zoom for a raster source, following `url` to
    /// its TileJSON when the source has no inline templates.
    async fn templates<L: ResourceLoader>(
        source: &SourceDef,
        loader: &L,
    ) -> Result<(Vec<String>, Option<u8>), RenderError> {
        if let Some(tiles) = &source.tiles {
            return Ok((tiles.clone(), source.maxzoom));
        }
        let Some(url) = &source.url else {
            return Ok((Vec::new(), source.maxzoom));
        };

        let request = ResourceRequest::new(url.clone(), RequestKind::SourceMetadata);
        let Some(bytes) = loader.load(&request).await? else {
            return Ok((Vec::new(), source.maxzoom));
        };
        let tilejson: TileJson = serde_json::from_slice(&bytes)
            .map_err(|e| RenderError::RenderFailed(format!("bad TileJSON from {}: {}", url, e)))?;
        Ok((tilejson.tiles, source.maxzoom.or(tilejson.maxzoom)))
    }

    /// Fetches the source tile covering `tile`, cropped and scaled to `size`.
    ///
    /// Above the source's max zoom the ancestor tile is cropped to the
    /// requested quadrant.
    async fn source_image<L: ResourceLoader>(
        source: &SourceDef,
        loader: &L,
        tile: TileCoord,
        size: u32,
    ) -> Result<Option<RgbaImage>, RenderError> {
        let (templates, maxzoom) = Self::templates(source, loader).await?;
        let Some(template) = templates.first() else {
            return Ok(None);
        };

        let dz = match maxzoom {
            Some(max) if tile.zoom > max => (tile.zoom - max) as u32,
            _ => 0,
        };
        let ancestor = TileCoord::new(tile.zoom - dz as u8, tile.x >> dz, tile.y >> dz);

        let request = ResourceRequest::new(expand_template(template, ancestor), RequestKind::Tile);
        let Some(bytes) = loader.load(&request).await? else {
            trace!(url = %request.url, "No source tile");
            return Ok(None);
        };

        let mut image = image::load_from_memory(&bytes)
            .map_err(|e| RenderError::RenderFailed(format!("decode {}: {}", request.url, e)))?
            .to_rgba8();

        if dz > 0 {
            let span = (image.width() >> dz).max(1);
            let mask = (1u32 << dz) - 1;
            let (ox, oy) = ((tile.x & mask) * span, (tile.y & mask) * span);
            image = imageops::crop_imm(&image, ox, oy, span, span).to_image();
        }

        if image.dimensions() != (size, size) {
            image = imageops::resize(&image, size, size, FilterType::Triangle);
        }
        Ok(Some(image))
    }
}

fn paint_background(canvas: &mut RgbaImage, layer: &LayerDef) {
    let mut color = layer
        .paint_str("background-color")
        .and_then(parse_color)
        .unwrap_or([0, 0, 0, 255]);
    if let Some(opacity) = layer.paint_f64("background-opacity") {
        color[3] = (color[3] as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
    }
    let fill = RgbaImage::from_pixel(canvas.width(), canvas.height(), Rgba(color));
    imageops::overlay(canvas, &fill, 0, 0);
}

impl RenderEngine for RasterCompositor {
    fn check_style(&self, style: &StyleDocument) -> Result<(), RenderError> {
        let skipped: BTreeSet<&str> = style
            .layers
            .iter()
            .map(|layer| layer.kind.as_str())
            .filter(|kind| !DRAWN_LAYER_TYPES.contains(kind))
            .collect();
        if !skipped.is_empty() {
            warn!(skipped = ?skipped, "Layer types not drawn by the raster compositor");
        }

        // background alone yields no data for every tile
        if !style.layers.iter().any(|layer| layer.kind == "raster") {
            let skipped: Vec<&str> = skipped.into_iter().collect();
            return Err(RenderError::UnsupportedStyle(format!(
                "no raster layers (not drawn: {})",
                if skipped.is_empty() {
                    "none".to_string()
                } else {
                    skipped.join(", ")
                }
            )));
        }
        Ok(())
    }

    async fn render<L: ResourceLoader>(
        &self,
        style: &StyleDocument,
        loader: &L,
        params: &RenderParams,
    ) -> Result<PixelBuffer, RenderError> {
        let size = params.pixel_size();
        let mut canvas = RgbaImage::new(size, size);
        let mut painted = false;

        for layer in &style.layers {
            match layer.kind.as_str() {
                "background" => paint_background(&mut canvas, layer),
                "raster" => {
                    let Some(source) = layer.source.as_ref().and_then(|id| style.sources.get(id))
                    else {
                        continue;
                    };
                    let Some(mut image) =
                        Self::source_image(source, loader, params.tile, size).await?
                    else {
                        continue;
                    };
                    if let Some(opacity) = layer.paint_f64("raster-opacity") {
                        let opacity = opacity.clamp(0.0, 1.0);
                        for px in image.pixels_mut() {
                            px.0[3] = (px.0[3] as f64 * opacity).round() as u8;
                        }
                    }
                    imageops::overlay(&mut canvas, &image, 0, 0);
                    painted = true;
                }
                other => trace!(layer = %layer.id, kind = other, "Layer type not composited"),
            }
        }

        if !painted {
            return Err(RenderError::NoData);
        }
        Ok(PixelBuffer::from_straight(canvas))
    }
}
