//! Tests for coordinate conversion

use super::*;
use proptest::prelude::*;

#[test]
fn test_new_york_city_at_zoom_16() {
    let tile = tile_for_point(-74.0060, 40.7128, 16);
    assert_eq!(tile.x, 19295);
    assert_eq!(tile.y, 24640);
    assert_eq!(tile.zoom, 16);
}

#[test]
fn test_london_at_zoom_10() {
    let tile = tile_for_point(-0.1278, 51.5074, 10);
    assert_eq!(tile.x, 511);
    assert_eq!(tile.y, 340);
}

#[test]
fn test_equator_prime_meridian() {
    // At zoom 1 (2×2 tiles) the origin falls in the south-east quadrant
    let tile = tile_for_point(0.0, 0.0, 1);
    assert_eq!((tile.x, tile.y), (1, 1));
}

#[test]
fn test_poles_are_clamped_into_grid() {
    let north = tile_for_point(0.0, 90.0, 4);
    let south = tile_for_point(0.0, -90.0, 4);
    assert_eq!(north.y, 0);
    assert_eq!(south.y, 15);
}

#[test]
fn test_antimeridian_is_clamped_into_grid() {
    let tile = tile_for_point(180.0, 0.0, 3);
    assert_eq!(tile.x, 7);
}

#[test]
fn test_zoom_zero_is_single_tile() {
    let tile = tile_for_point(123.0, -45.0, 0);
    assert_eq!((tile.x, tile.y), (0, 0));
}

#[test]
fn test_point_for_tile_world_center() {
    let (lon, lat) = point_for_tile(0, 0, 0);
    assert!(lon.abs() < 1e-9);
    assert!(lat.abs() < 1e-9);
}

#[test]
fn test_point_for_tile_uses_mercator_midpoint() {
    let (lon, lat) = point_for_tile(0, 0, 1);
    assert!((lon - -90.0).abs() < 1e-9);
    // Arithmetic mean of the corners would give ~42.5
    assert!((lat - 66.51326044311186).abs() < 1e-9);
}

#[test]
fn test_tile_corner_northwest() {
    let (lon, lat) = tile_corner(0.0, 0.0, 0);
    assert!((lon - -180.0).abs() < 1e-9);
    assert!((lat - MAX_LAT).abs() < 1e-6);
}

#[test]
fn test_tile_range_swaps_y_corners() {
    let bounds = BoundingBox::new(-79.0, 37.0, -77.0, 38.0).unwrap();
    let range = tile_range_for_bounds(&bounds, 5).unwrap();
    assert_eq!(range.min_x, 8);
    assert_eq!(range.max_x, 9);
    assert_eq!(range.min_y, 12);
    assert_eq!(range.max_y, 12);
    assert_eq!(range.count(), 2);
}

#[test]
fn test_tile_range_counts_across_zooms() {
    let bounds = BoundingBox::new(-79.0, 37.0, -77.0, 38.0).unwrap();
    let total: u64 = (0..=5)
        .map(|z| tile_range_for_bounds(&bounds, z).unwrap().count())
        .sum();
    assert_eq!(total, 7);
}

#[test]
fn test_tile_range_iterates_x_then_y() {
    let range = TileRange {
        zoom: 3,
        min_x: 1,
        min_y: 4,
        max_x: 2,
        max_y: 5,
    };
    let tiles: Vec<_> = range.tiles().map(|t| (t.x, t.y)).collect();
    assert_eq!(tiles, vec![(1, 4), (1, 5), (2, 4), (2, 5)]);
}

#[test]
fn test_inverted_bounds_fail_range_validation() {
    // West greater than east crosses the antimeridian, which is not supported
    let bounds = BoundingBox::new(170.0, 0.0, -170.0, 10.0).unwrap();
    let result = tile_range_for_bounds(&bounds, 4);
    assert!(matches!(result, Err(CoordError::InvalidRange { .. })));
}

#[test]
fn test_validate_tile_range_rejects_nan() {
    let result = validate_tile_range(2, f64::NAN, 0.0, 1.0, 1.0);
    assert!(matches!(result, Err(CoordError::InvalidRange { .. })));
}

#[test]
fn test_validate_tile_range_rejects_inverted() {
    assert!(validate_tile_range(2, 2.0, 0.0, 1.0, 1.0).is_err());
    assert!(validate_tile_range(2, 0.0, 3.0, 1.0, 1.0).is_err());
    assert!(validate_tile_range(2, 0.0, 0.0, 1.0, 1.0).is_ok());
}

#[test]
fn test_quadkey_origin_at_zoom_3() {
    assert_eq!(quadkey(0, 0, 3), "000");
}

#[test]
fn test_quadkey_known_value() {
    assert_eq!(quadkey(3, 5, 3), "213");
}

#[test]
fn test_quadkey_zoom_zero_remapped_to_one() {
    let key = quadkey(0, 0, 0);
    assert_eq!(key.len(), 1);
    assert_eq!(key, "0");
}

#[test]
fn test_bounding_box_rejects_zero_area() {
    assert!(BoundingBox::new(1.0, 2.0, 1.0, 3.0).is_err());
    assert!(BoundingBox::new(1.0, 2.0, 4.0, 2.0).is_err());
}

#[test]
fn test_bounding_box_rejects_non_finite() {
    assert!(BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0).is_err());
    assert!(BoundingBox::new(0.0, 0.0, f64::INFINITY, 1.0).is_err());
}

#[test]
fn test_bounding_box_parse() {
    let bounds: BoundingBox = "-79, 37,-77,38".parse().unwrap();
    assert_eq!(bounds.to_array(), [-79.0, 37.0, -77.0, 38.0]);

    assert!("-79,37,-77".parse::<BoundingBox>().is_err());
    assert!("a,b,c,d".parse::<BoundingBox>().is_err());
}

#[test]
fn test_zoom_range_validation() {
    assert!(ZoomRange::new(0, 22).is_ok());
    assert!(matches!(
        ZoomRange::new(0, 23),
        Err(CoordError::InvalidZoom(23))
    ));
    assert!(matches!(
        ZoomRange::new(6, 5),
        Err(CoordError::InvalidZoomRange { min: 6, max: 5 })
    ));
    let levels: Vec<u8> = ZoomRange::new(3, 5).unwrap().levels().collect();
    assert_eq!(levels, vec![3, 4, 5]);
}

proptest! {
    /// Property: a tile's centre lies within one tile of the original point.
    #[test]
    fn prop_roundtrip_within_one_tile(
        lon in -179.9f64..179.9f64,
        lat in -85.0f64..85.0f64,
        zoom in 0u8..=18u8,
    ) {
        let tile = tile_for_point(lon, lat, zoom);
        let (center_lon, center_lat) = point_for_tile(tile.x, tile.y, zoom);

        let tile_width = 360.0 / 2.0_f64.powi(zoom as i32);
        prop_assert!((center_lon - lon).abs() <= tile_width);

        let (_, north) = tile_corner(tile.x as f64, tile.y as f64, zoom);
        let (_, south) = tile_corner(tile.x as f64, tile.y as f64 + 1.0, zoom);
        prop_assert!((center_lat - lat).abs() <= (north - south).abs() + 1e-9);
    }

    /// Property: the quadkey has one digit per zoom level, all in 0-3.
    #[test]
    fn prop_quadkey_shape(x in 0u32..1024, y in 0u32..1024, zoom in 1u8..=10u8) {
        let key = quadkey(x % (1 << zoom), y % (1 << zoom), zoom);
        prop_assert_eq!(key.len(), zoom as usize);
        prop_assert!(key.chars().all(|c| ('0'..='3').contains(&c)));
    }
}
