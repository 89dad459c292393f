//! Point prompt collection and normalization
//!
//! Client-supplied positive/negative coordinates are normalized into a single
//! ordered coordinate list plus a parallel label list, the shape promptable
//! segmentation models consume.

use crate::error::{CutoutError, Result};
use serde::{Deserialize, Serialize};

/// Label value handed to the segmentation model for a foreground point
pub const FOREGROUND_LABEL: f32 = 1.0;

/// Label value handed to the segmentation model for a background point
pub const BACKGROUND_LABEL: f32 = 0.0;

/// A single (x, y) prompt coordinate
///
/// Bound checking against the image frame is the caller's responsibility;
/// prompt collection never clamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    #[must_use]
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Normalized prompt set: positives first, then negatives, input order
/// preserved within each group
///
/// The coordinate and label arrays are parallel and 1:1; index `i` of one
/// always describes index `i` of the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    positives: Vec<Point>,
    negatives: Vec<Point>,
}

impl PromptSet {
    /// Build a prompt set from client point lists
    ///
    /// # Errors
    ///
    /// Returns `CutoutError::InvalidPrompt` when both lists are empty.
    pub fn new(positives: Vec<Point>, negatives: Vec<Point>) -> Result<Self> {
        if positives.is_empty() && negatives.is_empty() {
            return Err(CutoutError::invalid_prompt(
                "at least one positive or negative point is required",
            ));
        }
        Ok(Self {
            positives,
            negatives,
        })
    }

    /// Positive (foreground) points in input order
    #[must_use]
    pub fn positives(&self) -> &[Point] {
        &self.positives
    }

    /// Negative (background) points in input order
    #[must_use]
    pub fn negatives(&self) -> &[Point] {
        &self.negatives
    }

    /// Total number of prompt points
    #[must_use]
    pub fn len(&self) -> usize {
        self.positives.len() + self.negatives.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        // Construction rejects the empty case, but keep the pair honest.
        self.positives.is_empty() && self.negatives.is_empty()
    }

    /// Coordinate array ordered positives-first, one `[x, y]` pair per point
    #[must_use]
    pub fn coordinates(&self) -> Vec<[f32; 2]> {
        self.positives
            .iter()
            .chain(self.negatives.iter())
            .map(|p| [p.x as f32, p.y as f32])
            .collect()
    }

    /// Label array parallel to `coordinates()`: 1 per positive, 0 per negative
    #[must_use]
    pub fn labels(&self) -> Vec<f32> {
        let mut labels = vec![FOREGROUND_LABEL; self.positives.len()];
        labels.extend(std::iter::repeat(BACKGROUND_LABEL).take(self.negatives.len()));
        labels
    }
}
