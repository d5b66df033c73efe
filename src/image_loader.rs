//! # Image Loading and Decoding
//!
//! Resolves an image `src` to bytes (data URI, raw base64, or a file path)
//! and hands them to an [`ImageDecoder`]. Layout only needs the pixel
//! dimensions; the `src` itself is what draw calls reference, so the
//! drawing backend owns pixel production.

use std::io::Cursor;

/// The container format detected from the leading magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// The result of a successful decode.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width_px: u32,
    pub height_px: u32,
    pub format: ImageFormat,
}

impl DecodedImage {
    /// Height divided by width, or `None` for a degenerate image.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.width_px == 0 || self.height_px == 0 {
            None
        } else {
            Some(self.height_px as f64 / self.width_px as f64)
        }
    }
}

/// The image collaborator consumed by layout.
pub trait ImageDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, String>;
}

/// JPEG and PNG decoding with the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultImageDecoder;

impl ImageDecoder for DefaultImageDecoder {
    fn decode(&self, data: &[u8]) -> Result<DecodedImage, String> {
        if data.len() < 4 {
            return Err("Image data too short".to_string());
        }

        if is_jpeg(data) {
            decode_jpeg(data)
        } else if is_png(data) {
            decode_png(data)
        } else {
            Err("Unsupported image format (expected JPEG or PNG)".to_string())
        }
    }
}

/// Resolve `src` and decode it.
///
/// Supported `src` formats:
/// - `data:image/...;base64,...` — data URI
/// - File path starting with `/`, `./` or `../` — reads from disk
/// - Raw base64-encoded image data
pub fn load_image(decoder: &dyn ImageDecoder, src: &str) -> Result<DecodedImage, String> {
    let raw_bytes = read_source_bytes(src)?;
    decoder.decode(&raw_bytes)
}

/// Resolve the source string to raw image bytes.
pub fn read_source_bytes(src: &str) -> Result<Vec<u8>, String> {
    let src = src.trim();
    if src.is_empty() {
        return Err("Empty image source".to_string());
    }

    if src.starts_with("data:") {
        let comma_pos = src
            .find(',')
            .ok_or_else(|| "Invalid data URI: missing comma".to_string())?;
        return base64_decode(&src[comma_pos + 1..]);
    }

    // Base64 contains '/', so only explicit path prefixes are read from disk.
    if src.starts_with('/') || src.starts_with("./") || src.starts_with("../") {
        return std::fs::read(src).map_err(|e| format!("Failed to read image file '{src}': {e}"));
    }

    base64_decode(src)
}

fn base64_decode(input: &str) -> Result<Vec<u8>, String> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|e| format!("Base64 decode error: {e}"))
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

fn is_png(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47
}

/// JPEG: header dimensions are enough, the bytes are passed through untouched.
fn decode_jpeg(data: &[u8]) -> Result<DecodedImage, String> {
    let reader = image::io::Reader::with_format(Cursor::new(data), image::ImageFormat::Jpeg);
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| format!("Failed to read JPEG dimensions: {e}"))?;
    Ok(DecodedImage {
        width_px: width,
        height_px: height,
        format: ImageFormat::Jpeg,
    })
}

/// PNG: decode fully so a corrupt body is caught at layout time.
fn decode_png(data: &[u8]) -> Result<DecodedImage, String> {
    let reader = image::io::Reader::with_format(Cursor::new(data), image::ImageFormat::Png);
    let img = reader
        .decode()
        .map_err(|e| format!("Failed to decode PNG: {e}"))?;
    Ok(DecodedImage {
        width_px: img.width(),
        height_px: img.height(),
        format: ImageFormat::Png,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1x1 red PNG.
    const RED_PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

    #[test]
    fn decodes_png_data_uri() {
        let src = format!("data:image/png;base64,{RED_PIXEL_PNG}");
        let img = load_image(&DefaultImageDecoder, &src).unwrap();
        assert_eq!(img.width_px, 1);
        assert_eq!(img.height_px, 1);
        assert_eq!(img.format, ImageFormat::Png);
        assert_eq!(img.aspect_ratio(), Some(1.0));
    }

    #[test]
    fn decodes_raw_base64() {
        let img = load_image(&DefaultImageDecoder, RED_PIXEL_PNG).unwrap();
        assert_eq!(img.format, ImageFormat::Png);
    }

    #[test]
    fn rejects_garbage() {
        assert!(load_image(&DefaultImageDecoder, "").is_err());
        assert!(load_image(&DefaultImageDecoder, "not base64 at all!").is_err());
        // Valid base64 of "hello world", which is no image.
        assert!(load_image(&DefaultImageDecoder, "aGVsbG8gd29ybGQ=").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_image(&DefaultImageDecoder, "./definitely/not/here.png").unwrap_err();
        assert!(err.contains("Failed to read image file"));
    }
}
