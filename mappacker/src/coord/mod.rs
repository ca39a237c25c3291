//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (longitude/latitude)
//! and Web Mercator slippy-map tile coordinates, tile ranges for bounding
//! boxes, and the quadkey addressing used by Bing Maps.

mod types;

pub use types::{
    BoundingBox, CoordError, TileCoord, TileRange, ZoomRange, MAX_LAT, MAX_LON, MAX_ZOOM,
    MIN_LAT, MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;

/// Fractional (floored) tile position before integer conversion.
///
/// Latitude is clamped to the Web Mercator range so the tangent stays finite.
/// The result is clamped to `[0, 2^zoom - 1]` on both axes.
fn tile_position(lon: f64, lat: f64, zoom: u8) -> (f64, f64) {
    let n = 2.0_f64.powi(zoom as i32);
    let lat = lat.clamp(MIN_LAT, MAX_LAT);

    let x = ((lon + 180.0) / 360.0 * n).floor();

    let lat_rad = lat.to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor();

    (x.clamp(0.0, n - 1.0), y.clamp(0.0, n - 1.0))
}

/// Converts a geographic point to the tile containing it.
#[inline]
pub fn tile_for_point(lon: f64, lat: f64, zoom: u8) -> TileCoord {
    let (x, y) = tile_position(lon, lat, zoom);
    TileCoord {
        zoom,
        x: x as u32,
        y: y as u32,
    }
}

/// Returns the `(lon, lat)` of the tile's north-west corner.
#[inline]
pub fn tile_corner(x: f64, y: f64, zoom: u8) -> (f64, f64) {
    let n = 2.0_f64.powi(zoom as i32);
    let lon = x / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees();
    (lon, lat)
}

/// Returns the render centre `(lon, lat)` of a tile.
///
/// The latitude is taken halfway between the corners in Mercator space, not
/// the arithmetic mean of the corner latitudes.
#[inline]
pub fn point_for_tile(x: u32, y: u32, zoom: u8) -> (f64, f64) {
    tile_corner(x as f64 + 0.5, y as f64 + 0.5, zoom)
}

/// Computes the validated tile range covering `bounds` at `zoom`.
///
/// The south-west corner yields `(min_x, max_y)` and the north-east corner
/// yields `(max_x, min_y)` because tile y grows southward.
pub fn tile_range_for_bounds(bounds: &BoundingBox, zoom: u8) -> Result<TileRange, CoordError> {
    let (min_x, max_y) = tile_position(bounds.west(), bounds.south(), zoom);
    let (max_x, min_y) = tile_position(bounds.east(), bounds.north(), zoom);
    validate_tile_range(zoom, min_x, min_y, max_x, max_y)
}

/// Rejects non-finite or inverted tile ranges.
pub fn validate_tile_range(
    zoom: u8,
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
) -> Result<TileRange, CoordError> {
    let finite = [min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite());
    if !finite || min_x > max_x || min_y > max_y || min_x < 0.0 || min_y < 0.0 {
        return Err(CoordError::InvalidRange {
            min_x,
            min_y,
            max_x,
            max_y,
        });
    }

    Ok(TileRange {
        zoom,
        min_x: min_x as u32,
        min_y: min_y as u32,
        max_x: max_x as u32,
        max_y: max_y as u32,
    })
}

/// Encodes tile coordinates as a Bing Maps quadkey.
///
/// Bing has no zoom 0 tile, so zoom 0 is treated as zoom 1.
pub fn quadkey(x: u32, y: u32, zoom: u8) -> String {
    let zoom = zoom.max(1);
    let mut key = String::with_capacity(zoom as usize);

    for i in (1..=zoom).rev() {
        let mask = 1u32 << (i - 1);
        let mut digit = b'0';
        if x & mask != 0 {
            digit += 1;
        }
        if y & mask != 0 {
            digit += 2;
        }
        key.push(digit as char);
    }

    key
}

#[cfg(test)]
mod tests;
