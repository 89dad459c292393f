//! Request and response wire contracts
//!
//! The host process hands the pipeline a structured payload: lossless image
//! bytes as base64 plus ordered point lists. The pipeline answers with three
//! named base64 PNG artifacts. A failed request produces no artifacts at all.

use crate::encode::ResultEncoder;
use crate::error::Result;
use crate::prompt::{Point, PromptSet};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

/// Artifact name for the hole image
pub const ARTIFACT_HOLE: &str = "image_hole";

/// Artifact name for the object image
pub const ARTIFACT_OBJECT: &str = "image_object";

/// Artifact name for the overlay preview
pub const ARTIFACT_OVERLAY: &str = "image_with_mask";

/// One cutout request as received from the host
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutoutRequest {
    /// Lossless-compressed source image bytes, base64 in transit
    #[serde_as(as = "Base64")]
    pub original_image: Vec<u8>,

    /// Foreground points, in click order
    #[serde(default)]
    pub positive_points: Vec<Point>,

    /// Background points, in click order
    #[serde(default)]
    pub negative_points: Vec<Point>,

    /// Free-text prompt for sibling generative pipelines; unused here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl CutoutRequest {
    /// Parse a request from its JSON encoding
    ///
    /// # Errors
    ///
    /// Returns `CutoutError::InputDecode` on malformed JSON or base64.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            crate::error::CutoutError::input_decode(format!("malformed request payload: {}", e))
        })
    }

    /// Decode the source image bytes
    ///
    /// # Errors
    ///
    /// Returns `CutoutError::InputDecode` on undecodable image bytes.
    pub fn decode_image(&self) -> Result<DynamicImage> {
        ResultEncoder::decode_bytes(&self.original_image)
    }

    /// Normalize the point lists into a prompt set
    ///
    /// # Errors
    ///
    /// Returns `CutoutError::InvalidPrompt` when no points were supplied.
    pub fn prompt_set(&self) -> Result<PromptSet> {
        PromptSet::new(self.positive_points.clone(), self.negative_points.clone())
    }
}

/// The three artifacts produced by a successful cutout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutoutResponse {
    /// Base64 PNG: source with the selection removed, cropped
    pub image_hole: String,

    /// Base64 PNG: the selection alone, cropped
    pub image_object: String,

    /// Base64 PNG: full-frame tinted preview
    pub image_with_mask: String,
}

impl CutoutResponse {
    /// Artifacts as (name, payload) pairs, in output order
    #[must_use]
    pub fn artifacts(&self) -> [(&'static str, &str); 3] {
        [
            (ARTIFACT_HOLE, self.image_hole.as_str()),
            (ARTIFACT_OBJECT, self.image_object.as_str()),
            (ARTIFACT_OVERLAY, self.image_with_mask.as_str()),
        ]
    }

    /// Serialize the response to JSON
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| {
            crate::error::CutoutError::encoding(format!("response serialization failed: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CutoutError;
    use image::{Rgba, RgbaImage};

    fn request_json(image_bytes: &[u8]) -> Vec<u8> {
        use base64::{engine::general_purpose, Engine as _};
        let payload = serde_json::json!({
            "original_image": general_purpose::STANDARD.encode(image_bytes),
            "positive_points": [{"x": 1, "y": 2}],
            "negative_points": [{"x": 3, "y": 4}],
        });
        serde_json::to_vec(&payload).unwrap()
    }

    #[test]
    fn test_request_round_trip() {
        let image = RgbaImage::from_pixel(2, 2, Rgba([5, 6, 7, 255]));
        let png = ResultEncoder::encode_rgba_png(&image).unwrap();

        let request = CutoutRequest::from_json(&request_json(&png)).unwrap();
        assert_eq!(request.positive_points, vec![Point::new(1, 2)]);
        assert_eq!(request.negative_points, vec![Point::new(3, 4)]);
        assert!(request.prompt.is_none());

        let decoded = request.decode_image().unwrap().to_rgba8();
        assert_eq!(decoded.as_raw(), image.as_raw());
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = CutoutRequest::from_json(b"{not json").unwrap_err();
        assert!(matches!(err, CutoutError::InputDecode(_)));
    }

    #[test]
    fn test_undecodable_image_rejected() {
        let request = CutoutRequest::from_json(&request_json(b"not a png")).unwrap();
        let err = request.decode_image().unwrap_err();
        assert!(matches!(err, CutoutError::InputDecode(_)));
    }

    #[test]
    fn test_empty_prompt_rejected_at_collection() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let png = ResultEncoder::encode_rgba_png(&image).unwrap();
        use base64::{engine::general_purpose, Engine as _};
        let payload = serde_json::json!({
            "original_image": general_purpose::STANDARD.encode(&png),
        });
        let request = CutoutRequest::from_json(&serde_json::to_vec(&payload).unwrap()).unwrap();

        let err = request.prompt_set().unwrap_err();
        assert!(matches!(err, CutoutError::InvalidPrompt(_)));
    }

    #[test]
    fn test_response_artifact_names() {
        let response = CutoutResponse {
            image_hole: "a".into(),
            image_object: "b".into(),
            image_with_mask: "c".into(),
        };
        let artifacts = response.artifacts();
        assert_eq!(artifacts[0], ("image_hole", "a"));
        assert_eq!(artifacts[1], ("image_object", "b"));
        assert_eq!(artifacts[2], ("image_with_mask", "c"));
    }
}
