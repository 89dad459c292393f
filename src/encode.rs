//! Lossless result encoding for transport
//!
//! Every output image crosses a process boundary as base64-encoded PNG
//! bytes. PNG keeps the round trip pixel-exact, alpha channel included;
//! base64 keeps the payload text-safe.

use crate::error::{CutoutError, Result};
use base64::{engine::general_purpose, Engine as _};
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};

/// Serializes result images to transport payloads and back
pub struct ResultEncoder;

impl ResultEncoder {
    /// Encode an RGBA image to PNG bytes
    pub fn encode_rgba_png(image: &RgbaImage) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let encoder = PngEncoder::new(&mut buffer);
        encoder
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| CutoutError::encoding(format!("PNG encoding failed: {}", e)))?;
        Ok(buffer)
    }

    /// Encode an RGB image to PNG bytes
    pub fn encode_rgb_png(image: &RgbImage) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let encoder = PngEncoder::new(&mut buffer);
        encoder
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| CutoutError::encoding(format!("PNG encoding failed: {}", e)))?;
        Ok(buffer)
    }

    /// Encode an RGBA image to a text-safe base64 PNG string
    pub fn encode_rgba(image: &RgbaImage) -> Result<String> {
        Ok(general_purpose::STANDARD.encode(Self::encode_rgba_png(image)?))
    }

    /// Encode an RGB image to a text-safe base64 PNG string
    pub fn encode_rgb(image: &RgbImage) -> Result<String> {
        Ok(general_purpose::STANDARD.encode(Self::encode_rgb_png(image)?))
    }

    /// Decode a base64 PNG string back to an image
    ///
    /// Inverse of the encode functions; decoding what they produced yields
    /// the exact pixel buffer that was encoded.
    pub fn decode(payload: &str) -> Result<DynamicImage> {
        let bytes = general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| CutoutError::input_decode(format!("invalid base64 payload: {}", e)))?;
        Self::decode_bytes(&bytes)
    }

    /// Decode raw image bytes (PNG or any supported container) to an image
    pub fn decode_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(bytes)
            .map_err(|e| CutoutError::input_decode(format!("undecodable image bytes: {}", e)))
    }
}
