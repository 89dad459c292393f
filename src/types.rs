//! Core types for cutout pipeline operations

use crate::error::{CutoutError, Result};
use image::{RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

/// Real-valued segmentation mask with the same spatial dimensions as its
/// source image
///
/// Values are probabilities in `0.0..=1.0`; binarization happens inside the
/// decomposer at a fixed threshold. Row-major storage, one value per pixel.
#[derive(Debug, Clone)]
pub struct Mask {
    /// Mask data as per-pixel probabilities
    pub data: Vec<f32>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl Mask {
    /// Create a new mask, validating that the buffer matches the dimensions
    pub fn new(data: Vec<f32>, dimensions: (u32, u32)) -> Result<Self> {
        let (width, height) = dimensions;
        let expected = (width as usize) * (height as usize);
        if data.len() != expected {
            return Err(CutoutError::internal(format!(
                "Mask buffer length {} does not match {}x{} dimensions",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self { data, dimensions })
    }

    /// Mask value at (x, y); callers must stay inside the dimensions
    #[must_use]
    pub fn value_at(&self, x: u32, y: u32) -> f32 {
        let (width, _) = self.dimensions;
        self.data
            .get((y as usize) * (width as usize) + x as usize)
            .copied()
            .unwrap_or(0.0)
    }

    /// Check the mask against an image's spatial dimensions
    pub fn validate_against(&self, image_dimensions: (u32, u32)) -> Result<()> {
        if self.dimensions != image_dimensions {
            return Err(CutoutError::MaskDimensionMismatch {
                mask_width: self.dimensions.0,
                mask_height: self.dimensions.1,
                image_width: image_dimensions.0,
                image_height: image_dimensions.1,
            });
        }
        Ok(())
    }

    /// Fraction of pixels above the given threshold, for diagnostics
    #[must_use]
    pub fn coverage(&self, threshold: f32) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let selected = self.data.iter().filter(|&&v| v > threshold).count();
        selected as f32 / self.data.len() as f32
    }
}

/// One hypothesis mask returned by the segmentation collaborator, paired
/// with its confidence score
///
/// Candidates are ephemeral: they exist only within one pipeline invocation.
/// The score scale is opaque; the pipeline only assumes it is totally ordered.
#[derive(Debug, Clone)]
pub struct MaskCandidate {
    pub mask: Mask,
    pub score: f32,
}

/// Inclusive axis-aligned pixel bounds of a target pixel set
///
/// Derived during decomposition, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub y_min: u32,
    pub y_max: u32,
    pub x_min: u32,
    pub x_max: u32,
}

impl BoundingBox {
    /// Create a bounding box, rejecting inverted bounds
    pub fn new(y_min: u32, y_max: u32, x_min: u32, x_max: u32) -> Result<Self> {
        if y_min > y_max || x_min > x_max {
            return Err(CutoutError::internal(format!(
                "Degenerate bounding box: y {}..{}, x {}..{}",
                y_min, y_max, x_min, x_max
            )));
        }
        Ok(Self {
            y_min,
            y_max,
            x_min,
            x_max,
        })
    }

    /// Width of the box (inclusive bounds)
    #[must_use]
    pub fn width(&self) -> u32 {
        self.x_max - self.x_min + 1
    }

    /// Height of the box (inclusive bounds)
    #[must_use]
    pub fn height(&self) -> u32 {
        self.y_max - self.y_min + 1
    }
}

/// The two complementary derivatives produced by decomposition
///
/// `hole` is the source with the selected region punched transparent and
/// cropped to the remaining content; `object` is the selected region alone,
/// transparent elsewhere and cropped to itself. The two are independent in
/// size and origin.
#[derive(Debug, Clone)]
pub struct DecompositionResult {
    pub hole: RgbaImage,
    pub hole_bounds: BoundingBox,
    pub object: RgbaImage,
    pub object_bounds: BoundingBox,
}

/// Detailed timing breakdown for one pipeline invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineTimings {
    /// Request payload and image decoding
    pub decode_ms: u64,

    /// Segmentation collaborator call
    pub segmentation_ms: u64,

    /// Candidate selection and hole/object decomposition
    pub decomposition_ms: u64,

    /// Overlay rendering
    pub overlay_ms: u64,

    /// PNG encoding and base64 serialization of all artifacts
    pub encode_ms: u64,

    /// Total end-to-end pipeline time
    pub total_ms: u64,
}

impl PipelineTimings {
    /// Compact single-line summary for logs
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "total {}ms | decode {}ms | segmentation {}ms | decomposition {}ms | overlay {}ms | encode {}ms",
            self.total_ms,
            self.decode_ms,
            self.segmentation_ms,
            self.decomposition_ms,
            self.overlay_ms,
            self.encode_ms
        )
    }
}

/// Metadata about one pipeline invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    /// Request identifier carried through all log events for this invocation
    pub request_id: String,

    /// Display name of the segmentation model used
    pub model_name: String,

    /// Number of candidates the collaborator returned
    pub candidate_count: usize,

    /// Score of the selected candidate
    pub selected_score: f32,

    /// Timing breakdown
    pub timings: PipelineTimings,
}

impl ProcessingMetadata {
    #[must_use]
    pub fn new(request_id: String, model_name: String) -> Self {
        Self {
            request_id,
            model_name,
            candidate_count: 0,
            selected_score: 0.0,
            timings: PipelineTimings::default(),
        }
    }
}

/// Result of one complete cutout invocation
#[derive(Debug, Clone)]
pub struct CutoutResult {
    /// Source with the selected region removed, cropped to remaining content
    pub hole_image: RgbaImage,

    /// Selected region alone, cropped to itself
    pub object_image: RgbaImage,

    /// Full-frame preview with the selected region tinted
    pub overlay_image: RgbImage,

    /// Bounding box the hole image was cropped to
    pub hole_bounds: BoundingBox,

    /// Bounding box the object image was cropped to
    pub object_bounds: BoundingBox,

    /// Processing metadata
    pub metadata: ProcessingMetadata,
}
