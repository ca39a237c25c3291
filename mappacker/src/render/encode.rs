//! Pixel encoding for archive tiles.

use super::{ImageFormat, PixelBuffer, RenderError};
use image::{DynamicImage, RgbaImage};
use std::io::Cursor;

/// Un-premultiplies `buffer` and encodes it as `format`.
///
/// JPEG has no alpha channel, so it is dropped for `jpg`.
pub fn encode(buffer: &PixelBuffer, format: ImageFormat) -> Result<Vec<u8>, RenderError> {
    let mut data = buffer.data().to_vec();
    for px in data.chunks_exact_mut(4) {
        let a = px[3] as u32;
        match a {
            0 => px[..3].fill(0),
            255 => {}
            _ => {
                for c in &mut px[..3] {
                    *c = ((*c as u32 * 255 + a / 2) / a).min(255) as u8;
                }
            }
        }
    }

    let expected = buffer.width() as usize * buffer.height() as usize * 4;
    let actual = data.len();
    let image = RgbaImage::from_raw(buffer.width(), buffer.height(), data)
        .ok_or(RenderError::InvalidBuffer { expected, actual })?;

    let mut cursor = Cursor::new(Vec::new());
    let result = match format {
        ImageFormat::Jpg => DynamicImage::ImageRgba8(image)
            .to_rgb8()
            .write_to(&mut cursor, image::ImageFormat::Jpeg),
        ImageFormat::Png => image.write_to(&mut cursor, image::ImageFormat::Png),
        ImageFormat::Webp => image.write_to(&mut cursor, image::ImageFormat::WebP),
    };
    result.map_err(|e| RenderError::Encode(e.to_string()))?;

    Ok(cursor.into_inner())
}

/// Parses `#rgb`, `#rrggbb`, `rgb(r, g, b)` and `rgba(r, g, b, a)` colours.
pub fn parse_color(value: &str) -> Option<[u8; 4]> {
    let value = value.trim();

    if let Some(hex) = value.strip_prefix('#') {
        let digit = |i: usize, len: usize| u8::from_str_radix(hex.get(i..i + len)?, 16).ok();
        return match hex.len() {
            3 => Some([
                digit(0, 1)? * 17,
                digit(1, 1)? * 17,
                digit(2, 1)? * 17,
                255,
            ]),
            6 => Some([digit(0, 2)?, digit(2, 2)?, digit(4, 2)?, 255]),
            _ => None,
        };
    }

    let (args, has_alpha) = if let Some(rest) = value.strip_prefix("rgba(") {
        (rest.strip_suffix(')')?, true)
    } else if let Some(rest) = value.strip_prefix("rgb(") {
        (rest.strip_suffix(')')?, false)
    } else {
        return None;
    };

    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() != if has_alpha { 4 } else { 3 } {
        return None;
    }
    let channel = |s: &str| s.parse::<u8>().ok();
    let alpha = match parts.get(3) {
        Some(a) => (a.parse::<f64>().ok()?.clamp(0.0, 1.0) * 255.0).round() as u8,
        None => 255,
    };
    Some([channel(parts[0])?, channel(parts[1])?, channel(parts[2])?, alpha])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> RgbaImage {
        image::load_from_memory(bytes).unwrap().to_rgba8()
    }

    #[test]
    fn test_png_round_trip_unpremultiplies() {
        // premultiplied (100, 50, 0, 128) is straight (199, 100, 0, 128)
        let buffer = PixelBuffer::filled(4, 4, [100, 50, 0, 128]);
        let png = encode(&buffer, ImageFormat::Png).unwrap();
        let px = decode(&png).get_pixel(0, 0).0;
        assert_eq!(px, [199, 100, 0, 128]);
    }

    #[test]
    fn test_jpg_is_opaque() {
        let buffer = PixelBuffer::filled(8, 8, [0, 0, 255, 255]);
        let jpg = encode(&buffer, ImageFormat::Jpg).unwrap();
        assert_eq!(&jpg[..2], &[0xFF, 0xD8]);
        let img = decode(&jpg);
        assert_eq!(img.dimensions(), (8, 8));
        assert_eq!(img.get_pixel(3, 3).0[3], 255);
    }

    #[test]
    fn test_webp_signature() {
        let buffer = PixelBuffer::filled(4, 4, [10, 20, 30, 255]);
        let webp = encode(&buffer, ImageFormat::Webp).unwrap();
        assert_eq!(&webp[..4], b"RIFF");
        assert_eq!(&webp[8..12], b"WEBP");
    }

    #[test]
    fn test_transparent_pixels_encode_black() {
        let buffer = PixelBuffer::filled(1, 1, [0, 0, 0, 0]);
        let png = encode(&buffer, ImageFormat::Png).unwrap();
        assert_eq!(decode(&png).get_pixel(0, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#ff0000"), Some([255, 0, 0, 255]));
        assert_eq!(parse_color("#0f0"), Some([0, 255, 0, 255]));
        assert_eq!(parse_color("rgb(1, 2, 3)"), Some([1, 2, 3, 255]));
        assert_eq!(parse_color("rgba(1,2,3,0.5)"), Some([1, 2, 3, 128]));
        assert_eq!(parse_color("red"), None);
        assert_eq!(parse_color("#12345"), None);
    }
}
