//! Unified cutout pipeline orchestrator
//!
//! `CutoutProcessor` sequences every stage of one request: payload decode →
//! prompt collection → segmentation → candidate selection → decomposition →
//! overlay rendering → artifact encoding. Stages run strictly in order with
//! no overlap; any failure aborts the request with nothing written.
//!
//! The segmentation backend is a long-lived resource: created once through
//! the injected factory, initialized on first use, and reused by every
//! subsequent request on this processor.

use crate::config::CutoutConfig;
use crate::decompose::ImageDecomposer;
use crate::encode::ResultEncoder;
use crate::error::{CutoutError, Result};
use crate::inference::SegmentationBackend;
use crate::overlay::OverlayRenderer;
use crate::payload::{CutoutRequest, CutoutResponse};
use crate::prompt::PromptSet;
use crate::selector::MaskSelector;
use crate::services::ArtifactSink;
use crate::types::{CutoutResult, PipelineTimings, ProcessingMetadata};
use image::DynamicImage;
use instant::Instant;
use tracing::{debug, error, info, span, Level};

/// Backend type enumeration for runtime selection
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendType {
    /// ONNX Runtime backend (supports GPU acceleration)
    Onnx,
}

/// Factory trait for creating segmentation backends
pub trait BackendFactory: Send + Sync {
    /// Create a backend instance of the specified type
    ///
    /// # Errors
    ///
    /// Returns `CutoutError` for unsupported backend types or backend
    /// construction failures.
    fn create_backend(&self, backend_type: BackendType) -> Result<Box<dyn SegmentationBackend>>;

    /// List available backend types
    fn available_backends(&self) -> Vec<BackendType>;
}

/// Default backend factory backed by the compiled-in backends
pub struct DefaultBackendFactory;

impl BackendFactory for DefaultBackendFactory {
    fn create_backend(&self, backend_type: BackendType) -> Result<Box<dyn SegmentationBackend>> {
        match backend_type {
            #[cfg(feature = "onnx")]
            BackendType::Onnx => Ok(Box::new(
                crate::backends::OnnxSegmentationBackend::new(),
            )),
            #[cfg(not(feature = "onnx"))]
            BackendType::Onnx => Err(CutoutError::invalid_config(
                "ONNX backend not compiled in. Rebuild with the 'onnx' feature.",
            )),
        }
    }

    fn available_backends(&self) -> Vec<BackendType> {
        let mut backends = Vec::new();
        #[cfg(feature = "onnx")]
        backends.push(BackendType::Onnx);
        backends
    }
}

/// Unified cutout processor that owns the full pipeline
pub struct CutoutProcessor {
    config: CutoutConfig,
    backend_factory: Box<dyn BackendFactory>,
    backend: Option<Box<dyn SegmentationBackend>>,
    initialized: bool,
}

impl CutoutProcessor {
    /// Create a new processor with the default backend factory
    ///
    /// # Errors
    ///
    /// Returns `CutoutError::InvalidConfig` for invalid configuration.
    pub fn new(config: CutoutConfig) -> Result<Self> {
        Self::with_factory(config, Box::new(DefaultBackendFactory))
    }

    /// Create a new processor with a custom backend factory
    ///
    /// # Errors
    ///
    /// Returns `CutoutError::InvalidConfig` for invalid configuration.
    pub fn with_factory(
        config: CutoutConfig,
        backend_factory: Box<dyn BackendFactory>,
    ) -> Result<Self> {
        if config.mask_candidates == 0 {
            return Err(CutoutError::invalid_config(
                "mask candidate count must be at least 1",
            ));
        }
        Ok(Self {
            config,
            backend_factory,
            backend: None,
            initialized: false,
        })
    }

    /// Hand the processor an already-constructed backend
    ///
    /// Useful for tests and hosts that manage backend lifetime themselves;
    /// the backend is initialized lazily on first use like any other.
    pub fn with_backend(
        config: CutoutConfig,
        backend: Box<dyn SegmentationBackend>,
    ) -> Result<Self> {
        let mut processor = Self::with_factory(config, Box::new(DefaultBackendFactory))?;
        processor.backend = Some(backend);
        Ok(processor)
    }

    /// Initialize the segmentation backend
    ///
    /// Idempotent; the model loads once and serves every later request.
    ///
    /// # Errors
    ///
    /// Returns `CutoutError::SegmentationUnavailable` on model load failures.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        info!(
            model = %self.config.model_spec.source.display_name(),
            provider = %self.config.execution_provider,
            "Initializing cutout processor"
        );

        if self.backend.is_none() {
            let backend = self.backend_factory.create_backend(BackendType::Onnx)?;
            self.backend = Some(backend);
        }

        let backend = self
            .backend
            .as_mut()
            .ok_or_else(|| CutoutError::internal("Backend missing after creation"))?;
        let load_time = backend.initialize(&self.config)?;

        if let Some(duration) = load_time {
            debug!(load_ms = duration.as_millis() as u64, "Model loaded");
        }

        self.initialized = true;
        info!("Cutout processor initialized successfully");
        Ok(())
    }

    /// Process one request end to end
    ///
    /// # Errors
    ///
    /// Any stage failure aborts the request; see the error taxonomy in
    /// [`CutoutError`]. No partial artifacts are produced.
    pub fn process_request(&mut self, request: &CutoutRequest) -> Result<CutoutResponse> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let _span = span!(Level::INFO, "cutout_request", request_id = %request_id).entered();

        match self.run_pipeline(request, &request_id) {
            Ok(response) => Ok(response),
            Err(e) => {
                error!(
                    request_id = %request_id,
                    stage = e.stage(),
                    error = %e,
                    "Cutout request failed"
                );
                Err(e)
            },
        }
    }

    /// Process one request and deliver the artifacts through a sink
    ///
    /// The sink sees either all three artifacts or none.
    ///
    /// # Errors
    ///
    /// Pipeline failures and sink delivery failures both abort the request.
    pub fn process_request_to_sink(
        &mut self,
        request: &CutoutRequest,
        sink: &mut dyn ArtifactSink,
    ) -> Result<CutoutResponse> {
        let response = self.process_request(request)?;
        for (name, payload) in response.artifacts() {
            sink.write_artifact(name, payload)?;
        }
        Ok(response)
    }

    /// Run the cutout core against an already-decoded image
    ///
    /// # Errors
    ///
    /// See the error taxonomy in [`CutoutError`].
    pub fn process_image(
        &mut self,
        image: &DynamicImage,
        prompts: &PromptSet,
    ) -> Result<CutoutResult> {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.run_core(image, prompts, &request_id, &mut PipelineTimings::default())
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &CutoutConfig {
        &self.config
    }

    /// Check if the processor is initialized
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Get available backends from the factory
    #[must_use]
    pub fn available_backends(&self) -> Vec<BackendType> {
        self.backend_factory.available_backends()
    }

    /// Full request pipeline: decode, run core, encode
    fn run_pipeline(
        &mut self,
        request: &CutoutRequest,
        request_id: &str,
    ) -> Result<CutoutResponse> {
        let total_start = Instant::now();
        let mut timings = PipelineTimings::default();

        // Decode payload
        let decode_start = Instant::now();
        let image = request.decode_image()?;
        let prompts = request.prompt_set()?;
        timings.decode_ms = decode_start.elapsed().as_millis() as u64;

        info!(
            width = image.width(),
            height = image.height(),
            positives = prompts.positives().len(),
            negatives = prompts.negatives().len(),
            "Starting cutout pipeline"
        );

        let result = self.run_core(&image, &prompts, request_id, &mut timings)?;

        // Encode artifacts
        let encode_start = Instant::now();
        let response = CutoutResponse {
            image_hole: ResultEncoder::encode_rgba(&result.hole_image)?,
            image_object: ResultEncoder::encode_rgba(&result.object_image)?,
            image_with_mask: ResultEncoder::encode_rgb(&result.overlay_image)?,
        };
        timings.encode_ms = encode_start.elapsed().as_millis() as u64;

        timings.total_ms = total_start.elapsed().as_millis() as u64;
        info!(timing = %timings.summary(), "Cutout pipeline complete");

        Ok(response)
    }

    /// The core stages shared by payload and in-memory entry points
    fn run_core(
        &mut self,
        image: &DynamicImage,
        prompts: &PromptSet,
        request_id: &str,
        timings: &mut PipelineTimings,
    ) -> Result<CutoutResult> {
        if !self.initialized {
            self.initialize()?;
        }

        let backend = self
            .backend
            .as_mut()
            .ok_or_else(|| CutoutError::internal("Backend not initialized"))?;
        let model_name = backend.model_name();

        // Segmentation
        let segmentation_start = Instant::now();
        let candidates = {
            let _span = span!(Level::INFO, "segmentation", model = %model_name).entered();
            backend.segment(image, prompts, self.config.mask_candidates)?
        };
        timings.segmentation_ms = segmentation_start.elapsed().as_millis() as u64;

        // Selection and decomposition
        let decomposition_start = Instant::now();
        let selected = MaskSelector::select_best(&candidates)?;
        debug!(
            candidates = candidates.len(),
            score = selected.score,
            coverage = selected.mask.coverage(crate::decompose::BINARIZE_THRESHOLD),
            "Selected mask candidate"
        );
        let decomposition = {
            let _span = span!(Level::DEBUG, "decomposition").entered();
            ImageDecomposer::decompose(image, &selected.mask)?
        };
        timings.decomposition_ms = decomposition_start.elapsed().as_millis() as u64;

        // Overlay rendering
        let overlay_start = Instant::now();
        let overlay_image = if self.config.random_overlay_color {
            OverlayRenderer::render_random_tint(image, &selected.mask)?
        } else {
            OverlayRenderer::render(image, &selected.mask)?
        };
        timings.overlay_ms = overlay_start.elapsed().as_millis() as u64;

        let mut metadata = ProcessingMetadata::new(request_id.to_string(), model_name);
        metadata.candidate_count = candidates.len();
        metadata.selected_score = selected.score;
        metadata.timings = timings.clone();

        Ok(CutoutResult {
            hole_image: decomposition.hole,
            object_image: decomposition.object,
            overlay_image,
            hole_bounds: decomposition.hole_bounds,
            object_bounds: decomposition.object_bounds,
            metadata,
        })
    }
}
