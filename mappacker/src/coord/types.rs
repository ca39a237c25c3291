//! Coordinate type definitions

use std::fmt;
use std::str::FromStr;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Zoom levels accepted for packaging jobs
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 22;

/// Tile coordinates in the Web Mercator / slippy-map scheme.
///
/// Tile (0, 0) is the north-west corner of the `2^zoom × 2^zoom` grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Zoom level (0-22)
    pub zoom: u8,
    /// X coordinate (west to east)
    pub x: u32,
    /// Y coordinate (north to south)
    pub y: u32,
}

impl TileCoord {
    pub fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Geographic bounding box in degrees.
///
/// Always finite with a non-zero extent on both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    west: f64,
    south: f64,
    east: f64,
    north: f64,
}

impl BoundingBox {
    /// Creates a bounding box, rejecting non-finite values and zero-area boxes.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self, CoordError> {
        let values = [west, south, east, north];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(CoordError::InvalidBounds(format!(
                "bounds must be finite numbers, got {:?}",
                values
            )));
        }
        if west == east {
            return Err(CoordError::InvalidBounds(
                "west and east coordinates are the same value".to_string(),
            ));
        }
        if south == north {
            return Err(CoordError::InvalidBounds(
                "south and north coordinates are the same value".to_string(),
            ));
        }
        Ok(Self {
            west,
            south,
            east,
            north,
        })
    }

    /// Creates a bounding box from a `[west, south, east, north]` slice.
    pub fn from_slice(values: &[f64]) -> Result<Self, CoordError> {
        match values {
            [west, south, east, north] => Self::new(*west, *south, *east, *north),
            _ => Err(CoordError::InvalidBounds(format!(
                "bounds must be west,south,east,north; got {} values",
                values.len()
            ))),
        }
    }

    pub fn west(&self) -> f64 {
        self.west
    }

    pub fn south(&self) -> f64 {
        self.south
    }

    pub fn east(&self) -> f64 {
        self.east
    }

    pub fn north(&self) -> f64 {
        self.north
    }

    /// Returns `[west, south, east, north]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }

    /// Returns the arithmetic centre as `(lon, lat)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.west + self.east) / 2.0,
            (self.south + self.north) / 2.0,
        )
    }
}

impl FromStr for BoundingBox {
    type Err = CoordError;

    /// Parses `"west,south,east,north"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|part| {
                part.trim().parse::<f64>().map_err(|_| {
                    CoordError::InvalidBounds(format!(
                        "bounds must be valid floating point values, got '{}'",
                        s
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_slice(&values)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.west, self.south, self.east, self.north
        )
    }
}

/// Inclusive zoom range with `min <= max`, both within 0-22.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomRange {
    min: u8,
    max: u8,
}

impl ZoomRange {
    pub fn new(min: u8, max: u8) -> Result<Self, CoordError> {
        if min > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(min));
        }
        if max > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(max));
        }
        if min > max {
            return Err(CoordError::InvalidZoomRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u8 {
        self.min
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    /// Zoom levels in ascending order.
    pub fn levels(&self) -> std::ops::RangeInclusive<u8> {
        self.min..=self.max
    }
}

/// Inclusive range of tile indices at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u8,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl TileRange {
    /// Number of tiles covered by the range.
    pub fn count(&self) -> u64 {
        (self.max_x - self.min_x + 1) as u64 * (self.max_y - self.min_y + 1) as u64
    }

    /// Iterates tiles with x in the outer loop and y in the inner loop.
    pub fn tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        let zoom = self.zoom;
        (self.min_x..=self.max_x)
            .flat_map(move |x| (self.min_y..=self.max_y).map(move |y| TileCoord { zoom, x, y }))
    }
}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Bounding box is malformed
    InvalidBounds(String),
    /// Zoom level is outside valid range (0 to 22)
    InvalidZoom(u8),
    /// Minimum zoom is greater than maximum zoom
    InvalidZoomRange { min: u8, max: u8 },
    /// Tile range is empty or contains non-finite values
    InvalidRange {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidBounds(reason) => write!(f, "Invalid bounds: {}", reason),
            CoordError::InvalidZoom(zoom) => {
                write!(
                    f,
                    "Zoom level is outside supported range ({}-{}): {}",
                    MIN_ZOOM, MAX_ZOOM, zoom
                )
            }
            CoordError::InvalidZoomRange { min, max } => {
                write!(
                    f,
                    "Minimum zoom {} is greater than maximum zoom {}",
                    min, max
                )
            }
            CoordError::InvalidRange {
                min_x,
                min_y,
                max_x,
                max_y,
            } => {
                write!(
                    f,
                    "Invalid tile range: x {}..{}, y {}..{}",
                    min_x, max_x, min_y, max_y
                )
            }
        }
    }
}

impl std::error::Error for CoordError {}
