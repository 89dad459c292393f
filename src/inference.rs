//! Segmentation backend abstraction
//!
//! The promptable segmentation model is an external collaborator behind this
//! trait: image and normalized prompts in, scored mask candidates out. The
//! pipeline assumes nothing about the score scale beyond total ordering, and
//! treats any backend failure as fatal for the request.

use crate::config::CutoutConfig;
use crate::error::Result;
use crate::prompt::PromptSet;
use crate::types::MaskCandidate;
use image::DynamicImage;

// Use instant crate for cross-platform time compatibility
use instant::Duration;

/// Trait for promptable segmentation backends
pub trait SegmentationBackend {
    /// Initialize the backend with the given configuration
    ///
    /// Returns the model load time on a fresh initialization, `None` when the
    /// backend was already initialized. Backends are long-lived: one
    /// initialization serves every subsequent request.
    ///
    /// # Errors
    /// - `CutoutError::SegmentationUnavailable` on model load failures
    /// - Invalid configuration parameters
    fn initialize(&mut self, config: &CutoutConfig) -> Result<Option<Duration>>;

    /// Segment the image region described by the prompt set
    ///
    /// Returns up to `output_count` candidates, each with the same spatial
    /// dimensions as `image` and a confidence score.
    ///
    /// # Errors
    /// - `CutoutError::SegmentationUnavailable` on inference failures
    /// - Backend not initialized
    fn segment(
        &mut self,
        image: &DynamicImage,
        prompts: &PromptSet,
        output_count: usize,
    ) -> Result<Vec<MaskCandidate>>;

    /// Display name of the loaded model, for logging and metadata
    fn model_name(&self) -> String;

    /// Check if backend is initialized
    fn is_initialized(&self) -> bool;
}

/// Backend registry for managing named segmentation backends
pub struct BackendRegistry {
    backends: std::collections::HashMap<String, Box<dyn SegmentationBackend>>,
}

impl BackendRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            backends: std::collections::HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, backend: Box<dyn SegmentationBackend>) {
        self.backends.insert(name.to_string(), backend);
    }

    pub fn get(&mut self, name: &str) -> Option<&mut Box<dyn SegmentationBackend>> {
        self.backends.get_mut(name)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
