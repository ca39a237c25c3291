//! Rendering engine seam
//!
//! The engine turns a [`StyleDocument`] into pixels for one tile, pulling
//! every resource it needs through a [`ResourceLoader`]. The assembler only
//! sees the [`RenderEngine`] trait; [`RasterCompositor`] is the built-in
//! engine used by the CLI and the queue worker.
//!
//! Engines return premultiplied RGBA in a [`PixelBuffer`]; [`encode`] turns
//! that into the archive's tile format.

mod compositor;
mod encode;

pub use compositor::RasterCompositor;
pub use encode::{encode, parse_color};

use crate::coord::{point_for_tile, TileCoord};
use crate::resolver::{ResolveError, ResourceLoader};
use crate::style::StyleDocument;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use thiserror::Error;

/// Highest device pixel ratio a job may request.
pub const MAX_RATIO: u32 = 4;

/// Largest image edge, in device pixels, any render may produce.
pub const MAX_PIXEL_SIZE: u32 = 4096;

/// Errors from a single tile render.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No layer produced any pixels for this tile
    #[error("no source data for tile")]
    NoData,

    /// The engine failed to render the tile
    #[error("render failed: {0}")]
    RenderFailed(String),

    /// The engine returned a buffer of the wrong size
    #[error("pixel buffer has {actual} bytes, expected {expected}")]
    InvalidBuffer { expected: usize, actual: usize },

    /// Encoding the pixels into the tile format failed
    #[error("encoding failed: {0}")]
    Encode(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The engine cannot draw any layer of the style
    #[error("style cannot be rendered: {0}")]
    UnsupportedStyle(String),
}

/// Encoded tile image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpg,
    Png,
    Webp,
}

impl ImageFormat {
    /// Value of the archive's `format` metadata key.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(ImageFormat::Jpg),
            "png" => Ok(ImageFormat::Png),
            "webp" => Ok(ImageFormat::Webp),
            other => Err(format!("unsupported image format '{}'", other)),
        }
    }
}

/// Parameters for rendering one tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    pub tile: TileCoord,
    /// `(lon, lat)` of the tile centre
    pub center: (f64, f64),
    /// Tile edge in logical pixels
    pub tile_size: u32,
    pub ratio: u32,
}

impl RenderParams {
    /// Parameters for `tile`, centred with [`point_for_tile`].
    pub fn for_tile(tile: TileCoord, tile_size: u32, ratio: u32) -> Self {
        Self {
            tile,
            center: point_for_tile(tile.x, tile.y, tile.zoom),
            tile_size,
            ratio,
        }
    }

    /// Edge of the output image in device pixels, never above
    /// [`MAX_PIXEL_SIZE`].
    pub fn pixel_size(&self) -> u32 {
        checked_pixel_size(self.tile_size, self.ratio).unwrap_or(MAX_PIXEL_SIZE)
    }
}

/// `tile_size * ratio`, or `None` when it overflows or exceeds
/// [`MAX_PIXEL_SIZE`].
pub fn checked_pixel_size(tile_size: u32, ratio: u32) -> Option<u32> {
    tile_size
        .checked_mul(ratio)
        .filter(|size| *size <= MAX_PIXEL_SIZE)
}

/// Premultiplied RGBA pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wraps premultiplied RGBA bytes, checking the length.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RenderError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(RenderError::InvalidBuffer {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A buffer of one opaque or premultiplied colour.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            width,
            height,
            data: rgba.repeat(width as usize * height as usize),
        }
    }

    /// Premultiplies straight-alpha RGBA pixels.
    pub fn from_straight(image: image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let mut data = image.into_raw();
        for px in data.chunks_exact_mut(4) {
            let a = px[3] as u32;
            if a < 255 {
                for c in &mut px[..3] {
                    *c = ((*c as u32 * a + 127) / 255) as u8;
                }
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// A rendering engine: one style, one tile, one pixel buffer.
///
/// Resource requests go through `loader` one at a time; the engine awaits
/// each before issuing the next.
pub trait RenderEngine: Send + Sync {
    fn render<L: ResourceLoader>(
        &self,
        style: &StyleDocument,
        loader: &L,
        params: &RenderParams,
    ) -> impl Future<Output = Result<PixelBuffer, RenderError>> + Send;

    /// Checked once per archive before any tile is rendered. Engines that
    /// draw only some layer types reject styles they would render blank.
    fn check_style(&self, _style: &StyleDocument) -> Result<(), RenderError> {
        Ok(())
    }
}
