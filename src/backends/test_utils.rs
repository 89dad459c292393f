//! Test utilities and mock backends for testing pipeline functionality
//!
//! Mock implementations of the `SegmentationBackend` trait so the pipeline
//! can be exercised end to end without model files or ONNX Runtime.

use crate::config::CutoutConfig;
use crate::error::{CutoutError, Result};
use crate::inference::SegmentationBackend;
use crate::prompt::PromptSet;
use crate::types::{Mask, MaskCandidate};
use image::{DynamicImage, GenericImageView};
use instant::Duration;
use std::sync::{Arc, Mutex};

/// What mask pattern the mock produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MockPattern {
    /// Half-sized block centered in the frame
    CenterBlock,
    /// Every pixel selected
    FullFrame,
    /// No pixel selected
    Empty,
}

/// Mock segmentation backend for testing
#[derive(Debug, Clone)]
pub struct MockSegmentationBackend {
    initialized: bool,
    pattern: MockPattern,
    /// Scores handed out per candidate index, cycled if more are requested
    scores: Vec<f32>,
    /// Call history for verification in tests
    call_history: Arc<Mutex<Vec<String>>>,
    should_fail_init: bool,
    should_fail_inference: bool,
}

impl MockSegmentationBackend {
    /// Mock producing a centered block covering half the frame
    #[must_use]
    pub fn center_block() -> Self {
        Self {
            initialized: false,
            pattern: MockPattern::CenterBlock,
            scores: vec![0.75, 0.9, 0.6, 0.9],
            call_history: Arc::new(Mutex::new(Vec::new())),
            should_fail_init: false,
            should_fail_inference: false,
        }
    }

    /// Mock whose masks select the entire frame
    #[must_use]
    pub fn full_frame() -> Self {
        Self {
            pattern: MockPattern::FullFrame,
            ..Self::center_block()
        }
    }

    /// Mock whose masks select nothing
    #[must_use]
    pub fn empty_mask() -> Self {
        Self {
            pattern: MockPattern::Empty,
            ..Self::center_block()
        }
    }

    /// Mock that fails during initialization
    #[must_use]
    pub fn failing_init() -> Self {
        Self {
            should_fail_init: true,
            ..Self::center_block()
        }
    }

    /// Mock that fails during inference
    #[must_use]
    pub fn failing_inference() -> Self {
        Self {
            should_fail_inference: true,
            ..Self::center_block()
        }
    }

    /// Override the candidate scores
    #[must_use]
    pub fn with_scores(mut self, scores: Vec<f32>) -> Self {
        self.scores = scores;
        self
    }

    /// Get the call history for verification in tests
    pub fn call_history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }

    fn record_call(&self, method: &str) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(method.to_string());
        }
    }

    fn build_mask(&self, dimensions: (u32, u32)) -> Mask {
        let (width, height) = dimensions;
        let mut data = vec![0.0f32; (width as usize) * (height as usize)];

        match self.pattern {
            MockPattern::Empty => {},
            MockPattern::FullFrame => {
                data.fill(1.0);
            },
            MockPattern::CenterBlock => {
                let x0 = width / 4;
                let x1 = (3 * width) / 4;
                let y0 = height / 4;
                let y1 = (3 * height) / 4;
                for y in y0..y1.max(y0 + 1).min(height) {
                    for x in x0..x1.max(x0 + 1).min(width) {
                        data[(y as usize) * (width as usize) + x as usize] = 1.0;
                    }
                }
            },
        }

        Mask::new(data, dimensions).expect("mock mask buffer matches dimensions")
    }
}

impl SegmentationBackend for MockSegmentationBackend {
    fn initialize(&mut self, _config: &CutoutConfig) -> Result<Option<Duration>> {
        self.record_call("initialize");
        if self.should_fail_init {
            return Err(CutoutError::segmentation_unavailable(
                "mock initialization failure",
            ));
        }
        if self.initialized {
            return Ok(None);
        }
        self.initialized = true;
        Ok(Some(Duration::from_millis(1)))
    }

    fn segment(
        &mut self,
        image: &DynamicImage,
        prompts: &PromptSet,
        output_count: usize,
    ) -> Result<Vec<MaskCandidate>> {
        self.record_call("segment");
        if !self.initialized {
            return Err(CutoutError::internal("Backend not initialized"));
        }
        if self.should_fail_inference {
            return Err(CutoutError::segmentation_unavailable(
                "mock inference failure",
            ));
        }
        if prompts.is_empty() {
            return Err(CutoutError::invalid_prompt("mock requires prompts"));
        }

        let candidates = (0..output_count)
            .map(|index| MaskCandidate {
                mask: self.build_mask(image.dimensions()),
                score: self
                    .scores
                    .get(index % self.scores.len().max(1))
                    .copied()
                    .unwrap_or(0.5),
            })
            .collect();

        Ok(candidates)
    }

    fn model_name(&self) -> String {
        "mock-segmentation-model".to_string()
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::Point;

    fn test_image() -> DynamicImage {
        DynamicImage::ImageRgba8(image::RgbaImage::new(8, 8))
    }

    fn prompts() -> PromptSet {
        PromptSet::new(vec![Point::new(4, 4)], vec![]).unwrap()
    }

    #[test]
    fn test_mock_requires_initialization() {
        let mut backend = MockSegmentationBackend::center_block();
        let err = backend.segment(&test_image(), &prompts(), 4).unwrap_err();
        assert!(matches!(err, CutoutError::Internal(_)));
    }

    #[test]
    fn test_mock_candidate_count_and_dimensions() {
        let mut backend = MockSegmentationBackend::center_block();
        backend.initialize(&CutoutConfig::default()).unwrap();

        let candidates = backend.segment(&test_image(), &prompts(), 4).unwrap();
        assert_eq!(candidates.len(), 4);
        for candidate in &candidates {
            assert_eq!(candidate.mask.dimensions, (8, 8));
        }
    }

    #[test]
    fn test_mock_center_block_pattern() {
        let mut backend = MockSegmentationBackend::center_block();
        backend.initialize(&CutoutConfig::default()).unwrap();

        let candidates = backend.segment(&test_image(), &prompts(), 1).unwrap();
        let mask = &candidates[0].mask;
        assert!(mask.value_at(4, 4) > 0.5);
        assert!(mask.value_at(0, 0) < 0.5);
    }

    #[test]
    fn test_mock_failure_modes() {
        let mut backend = MockSegmentationBackend::failing_init();
        let err = backend.initialize(&CutoutConfig::default()).unwrap_err();
        assert!(matches!(err, CutoutError::SegmentationUnavailable(_)));

        let mut backend = MockSegmentationBackend::failing_inference();
        backend.initialize(&CutoutConfig::default()).unwrap();
        let err = backend.segment(&test_image(), &prompts(), 1).unwrap_err();
        assert!(matches!(err, CutoutError::SegmentationUnavailable(_)));
    }

    #[test]
    fn test_mock_records_calls() {
        let mut backend = MockSegmentationBackend::center_block();
        backend.initialize(&CutoutConfig::default()).unwrap();
        let _ = backend.segment(&test_image(), &prompts(), 1);

        assert_eq!(backend.call_history(), vec!["initialize", "segment"]);
    }
}
