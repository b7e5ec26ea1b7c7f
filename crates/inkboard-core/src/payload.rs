//! Encoded drawing payloads carried as post content.

use crate::raster::{DecodeError, Raster};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix of a PNG data URL, which is how drawings are stored as post text.
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Image format of an encoded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
        }
    }

    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 4 {
            return None;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }

        None
    }
}

/// Errors producing a payload from the drawing surface.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("No drawing surface is active")]
    NoSurface,
    #[error("A stroke is still in progress")]
    StrokeInProgress,
    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),
}

/// Errors reading a payload back out of post content.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Content is not an image data URL")]
    NotDataUrl,
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Immutable snapshot of the surface, ready to be sent as post content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawingPayload {
    data_url: String,
    width: u32,
    height: u32,
}

impl DrawingPayload {
    /// Encode a raster as a PNG data URL.
    pub fn encode(raster: &Raster) -> Result<Self, EncodeError> {
        let png_data = raster.encode_png()?;
        let mut data_url = String::with_capacity(PNG_DATA_URL_PREFIX.len() + png_data.len() * 4 / 3 + 4);
        data_url.push_str(PNG_DATA_URL_PREFIX);
        STANDARD.encode_string(&png_data, &mut data_url);

        Ok(Self {
            data_url,
            width: raster.width(),
            height: raster.height(),
        })
    }

    /// The data URL, suitable as `content` of a post.
    pub fn as_str(&self) -> &str {
        &self.data_url
    }

    pub fn into_string(self) -> String {
        self.data_url
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Split a data URL into MIME type and decoded bytes.
pub fn decode_data_url(content: &str) -> Result<(String, Vec<u8>), PayloadError> {
    let rest = content
        .trim()
        .strip_prefix("data:")
        .ok_or(PayloadError::NotDataUrl)?;
    let (mime, data) = rest
        .split_once(";base64,")
        .ok_or(PayloadError::NotDataUrl)?;
    Ok((mime.to_string(), STANDARD.decode(data)?))
}

/// Decode drawing content back into a raster.
pub fn decode_drawing(content: &str) -> Result<Raster, PayloadError> {
    let (mime, bytes) = decode_data_url(content)?;
    match ImageFormat::from_magic_bytes(&bytes) {
        Some(ImageFormat::Png) => Ok(Raster::decode_png(&bytes)?),
        Some(other) => Err(PayloadError::UnsupportedFormat(other.mime_type().to_string())),
        None => Err(PayloadError::UnsupportedFormat(mime)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{Brush, Rgba8};
    use kurbo::Point;

    #[test]
    fn test_encode_produces_png_data_url() {
        let raster = Raster::new(8, 8, Rgba8::white());
        let payload = DrawingPayload::encode(&raster).unwrap();
        assert!(payload.as_str().starts_with(PNG_DATA_URL_PREFIX));
        assert!(payload.as_str().len() > PNG_DATA_URL_PREFIX.len());
        assert_eq!((payload.width(), payload.height()), (8, 8));
    }

    #[test]
    fn test_decode_drawing_matches_raster() {
        let mut raster = Raster::new(20, 10, Rgba8::white());
        raster.draw_segment(Point::new(2.0, 2.0), Point::new(18.0, 8.0), &Brush::default());

        let payload = DrawingPayload::encode(&raster).unwrap();
        let decoded = decode_drawing(payload.as_str()).unwrap();
        assert_eq!(decoded, raster);
    }

    #[test]
    fn test_plain_text_is_not_data_url() {
        assert!(matches!(decode_drawing("hello"), Err(PayloadError::NotDataUrl)));
    }

    #[test]
    fn test_jpeg_is_unsupported() {
        let content = format!(
            "data:image/jpeg;base64,{}",
            STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0, 0x00])
        );
        assert!(matches!(
            decode_drawing(&content),
            Err(PayloadError::UnsupportedFormat(mime)) if mime == "image/jpeg"
        ));
    }

    #[test]
    fn test_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&[0x89, 0x50, 0x4E, 0x47, 0x0D]),
            Some(ImageFormat::Png)
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"RIFF\0\0\0\0WEBP"), Some(ImageFormat::WebP));
        assert_eq!(ImageFormat::from_magic_bytes(b"ab"), None);
    }
}
