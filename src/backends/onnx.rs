//! ONNX Runtime backend for promptable segmentation
//!
//! Drives a SAM-style point-promptable segmentation model through ONNX
//! Runtime: the image and the normalized coordinate/label arrays go in, a
//! fixed number of scored candidate masks come out. Supports CPU, CUDA and
//! `CoreML` execution providers with availability checking.

use crate::config::{CutoutConfig, ExecutionProvider};
use crate::error::{CutoutError, Result};
use crate::inference::SegmentationBackend;
use crate::models::ModelManager;
use crate::prompt::PromptSet;
use crate::types::{Mask, MaskCandidate};
use image::{DynamicImage, GenericImageView};
use log;
use ndarray::{Array2, Array3, Array4};
use ort::execution_providers::{
    CUDA as CUDAExecutionProvider, CoreML as CoreMLExecutionProvider,
    ExecutionProvider as OrtExecutionProvider,
};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::{self, value::Value};

/// Model input resolution; prompt coordinates are rescaled into this space
const MODEL_INPUT_SIZE: u32 = 1024;

/// Per-channel pixel normalization mean, RGB order
const NORMALIZATION_MEAN: [f32; 3] = [123.675, 116.28, 103.53];

/// Per-channel pixel normalization standard deviation, RGB order
const NORMALIZATION_STD: [f32; 3] = [58.395, 57.12, 57.375];

/// ONNX Runtime backend for running point-prompt segmentation models
#[derive(Debug)]
pub struct OnnxSegmentationBackend {
    session: Option<Session>,
    model_manager: Option<ModelManager>,
    initialized: bool,
}

impl OnnxSegmentationBackend {
    /// Create a new ONNX backend; the model resolves at initialization
    #[must_use]
    pub fn new() -> Self {
        Self {
            session: None,
            model_manager: None,
            initialized: false,
        }
    }

    /// Create a new ONNX backend with a pre-resolved model manager
    #[must_use]
    pub fn with_model_manager(model_manager: ModelManager) -> Self {
        Self {
            session: None,
            model_manager: Some(model_manager),
            initialized: false,
        }
    }

    /// List all ONNX Runtime execution providers with availability status
    pub fn list_providers() -> Vec<(String, bool, String)> {
        let mut providers = Vec::new();

        // CPU is always available
        providers.push((
            "CPU".to_string(),
            true,
            "Always available, uses CPU for inference".to_string(),
        ));

        let cuda_available =
            OrtExecutionProvider::is_available(&CUDAExecutionProvider::default()).unwrap_or(false);
        providers.push((
            "CUDA".to_string(),
            cuda_available,
            "NVIDIA GPU acceleration (requires CUDA toolkit and compatible GPU)".to_string(),
        ));

        let coreml_available =
            OrtExecutionProvider::is_available(&CoreMLExecutionProvider::default())
                .unwrap_or(false);
        providers.push((
            "CoreML".to_string(),
            coreml_available,
            "Apple Silicon GPU acceleration (macOS only)".to_string(),
        ));

        providers
    }

    /// Load and initialize the ONNX model
    fn load_model(&mut self, config: &CutoutConfig) -> Result<std::time::Duration> {
        let model_load_start = std::time::Instant::now();

        let model_manager = if let Some(ref manager) = self.model_manager {
            manager
        } else {
            let resolved = ModelManager::from_spec(&config.model_spec)
                .map_err(|e| CutoutError::segmentation_unavailable(e.to_string()))?;
            self.model_manager = Some(resolved);
            self.model_manager.as_ref().ok_or_else(|| {
                CutoutError::internal("Model manager unexpectedly missing after insertion")
            })?
        };

        let model_data = model_manager
            .load_model()
            .map_err(|e| CutoutError::segmentation_unavailable(e.to_string()))?;

        let mut session_builder = Session::builder()
            .map_err(|e| {
                CutoutError::segmentation_unavailable(format!(
                    "Failed to create session builder: {e}"
                ))
            })?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| {
                CutoutError::segmentation_unavailable(format!(
                    "Failed to set optimization level: {e}"
                ))
            })?;

        // Configure execution providers with availability checking
        session_builder = match config.execution_provider {
            ExecutionProvider::Auto => {
                // Auto-detect: CUDA > CoreML > CPU
                let mut providers = Vec::new();

                let cuda_provider = CUDAExecutionProvider::default();
                if OrtExecutionProvider::is_available(&cuda_provider).unwrap_or(false) {
                    log::info!("CUDA execution provider is available and will be used");
                    providers.push(cuda_provider.build());
                } else {
                    log::debug!("CUDA execution provider is not available");
                }

                let coreml_provider = CoreMLExecutionProvider::default();
                if OrtExecutionProvider::is_available(&coreml_provider).unwrap_or(false) {
                    log::info!("CoreML execution provider is available and will be used");
                    let coreml_provider =
                        CoreMLExecutionProvider::default().with_subgraphs(true);
                    providers.push(coreml_provider.build());
                } else {
                    log::debug!("CoreML execution provider is not available");
                }

                if providers.is_empty() {
                    log::warn!("No hardware acceleration available, falling back to CPU");
                    session_builder
                } else {
                    session_builder
                        .with_execution_providers(providers)
                        .map_err(|e| {
                            CutoutError::segmentation_unavailable(format!(
                                "Failed to set auto execution providers: {e}"
                            ))
                        })?
                }
            },
            ExecutionProvider::Cpu => {
                log::info!("Using CPU execution provider");
                session_builder
            },
            ExecutionProvider::Cuda => {
                let cuda_provider = CUDAExecutionProvider::default();
                if OrtExecutionProvider::is_available(&cuda_provider).unwrap_or(false) {
                    log::info!("Using CUDA execution provider");
                    session_builder
                        .with_execution_providers([cuda_provider.build()])
                        .map_err(|e| {
                            CutoutError::segmentation_unavailable(format!(
                                "Failed to set CUDA execution provider: {e}"
                            ))
                        })?
                } else {
                    log::warn!(
                        "CUDA execution provider requested but not available, falling back to CPU"
                    );
                    session_builder
                }
            },
            ExecutionProvider::CoreMl => {
                let coreml_provider = CoreMLExecutionProvider::default();
                if OrtExecutionProvider::is_available(&coreml_provider).unwrap_or(false) {
                    log::info!("Using CoreML execution provider");
                    let coreml_provider =
                        CoreMLExecutionProvider::default().with_subgraphs(true);
                    session_builder
                        .with_execution_providers([coreml_provider.build()])
                        .map_err(|e| {
                            CutoutError::segmentation_unavailable(format!(
                                "Failed to set CoreML execution provider: {e}"
                            ))
                        })?
                } else {
                    log::warn!(
                        "CoreML execution provider requested but not available, falling back to CPU"
                    );
                    session_builder
                }
            },
        };

        // Calculate optimal threading if auto-detect (0)
        let intra_threads = if config.intra_threads > 0 {
            config.intra_threads
        } else {
            std::thread::available_parallelism()
                .map(std::num::NonZero::get)
                .unwrap_or(8)
        };

        let inter_threads = if config.inter_threads > 0 {
            config.inter_threads
        } else {
            (std::thread::available_parallelism()
                .map(std::num::NonZero::get)
                .unwrap_or(8)
                / 4)
            .max(1)
        };

        let session = session_builder
            .with_parallel_execution(true)
            .map_err(|e| {
                CutoutError::segmentation_unavailable(format!(
                    "Failed to enable parallel execution: {e}"
                ))
            })?
            .with_intra_threads(intra_threads)
            .map_err(|e| {
                CutoutError::segmentation_unavailable(format!("Failed to set intra threads: {e}"))
            })?
            .with_inter_threads(inter_threads)
            .map_err(|e| {
                CutoutError::segmentation_unavailable(format!("Failed to set inter threads: {e}"))
            })?
            .commit_from_memory(&model_data)
            .map_err(|e| {
                CutoutError::segmentation_unavailable(format!(
                    "Failed to create session from model data: {e}"
                ))
            })?;

        log::debug!("ONNX Runtime session created successfully");
        log::debug!(
            "  - Threading: {intra_threads} intra-op threads, {inter_threads} inter-op threads"
        );

        self.session = Some(session);
        self.initialized = true;

        let model_load_time = model_load_start.elapsed();
        log::info!(
            "Model loading complete: {:.0}ms",
            model_load_time.as_secs_f64() * 1000.0
        );

        Ok(model_load_time)
    }

    /// Resize to model resolution and normalize into an NCHW tensor
    fn image_to_tensor(image: &DynamicImage) -> Array4<f32> {
        let resized = image::imageops::resize(
            &image.to_rgb8(),
            MODEL_INPUT_SIZE,
            MODEL_INPUT_SIZE,
            image::imageops::FilterType::Triangle,
        );

        let size = MODEL_INPUT_SIZE as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for channel in 0..3 {
                tensor[[0, channel, y as usize, x as usize]] = (f32::from(pixel[channel])
                    - NORMALIZATION_MEAN[channel])
                    / NORMALIZATION_STD[channel];
            }
        }
        tensor
    }

    /// Rescale prompt coordinates from image space into model input space
    fn prompts_to_tensors(
        prompts: &PromptSet,
        image_dimensions: (u32, u32),
    ) -> (Array3<f32>, Array2<f32>) {
        let (width, height) = image_dimensions;
        let scale_x = MODEL_INPUT_SIZE as f32 / width.max(1) as f32;
        let scale_y = MODEL_INPUT_SIZE as f32 / height.max(1) as f32;

        let coordinates = prompts.coordinates();
        let labels = prompts.labels();

        let mut coords_tensor = Array3::<f32>::zeros((1, coordinates.len(), 2));
        let mut labels_tensor = Array2::<f32>::zeros((1, labels.len()));

        for (index, coordinate) in coordinates.iter().enumerate() {
            coords_tensor[[0, index, 0]] = coordinate[0] * scale_x;
            coords_tensor[[0, index, 1]] = coordinate[1] * scale_y;
        }
        for (index, label) in labels.iter().enumerate() {
            labels_tensor[[0, index]] = *label;
        }

        (coords_tensor, labels_tensor)
    }

    /// Logistic squashing of a mask logit into `0.0..1.0`
    fn sigmoid(logit: f32) -> f32 {
        1.0 / (1.0 + (-logit).exp())
    }

    /// Resize one low-resolution probability grid to the source dimensions
    fn resize_probability_grid(
        grid: Vec<f32>,
        grid_dimensions: (u32, u32),
        target_dimensions: (u32, u32),
    ) -> Result<Mask> {
        let (grid_width, grid_height) = grid_dimensions;
        let (target_width, target_height) = target_dimensions;

        if grid_dimensions == target_dimensions {
            return Mask::new(grid, target_dimensions);
        }

        let buffer: image::ImageBuffer<image::Luma<f32>, Vec<f32>> =
            image::ImageBuffer::from_raw(grid_width, grid_height, grid).ok_or_else(|| {
                CutoutError::internal("probability grid buffer does not match its dimensions")
            })?;
        let resized = image::imageops::resize(
            &buffer,
            target_width,
            target_height,
            image::imageops::FilterType::Triangle,
        );
        Mask::new(resized.into_raw(), target_dimensions)
    }
}

impl Default for OnnxSegmentationBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentationBackend for OnnxSegmentationBackend {
    fn initialize(&mut self, config: &CutoutConfig) -> Result<Option<instant::Duration>> {
        if self.initialized {
            return Ok(None);
        }

        let model_load_time = self.load_model(config)?;
        Ok(Some(model_load_time))
    }

    fn segment(
        &mut self,
        image: &DynamicImage,
        prompts: &PromptSet,
        output_count: usize,
    ) -> Result<Vec<MaskCandidate>> {
        if !self.initialized {
            return Err(CutoutError::internal("Backend not initialized"));
        }

        let session = self
            .session
            .as_mut()
            .ok_or_else(|| CutoutError::internal("ONNX session not initialized"))?;

        let image_dimensions = image.dimensions();
        log::debug!(
            "Starting segmentation: {}x{} image, {} prompt points",
            image_dimensions.0,
            image_dimensions.1,
            prompts.len()
        );

        let image_tensor = Self::image_to_tensor(image);
        let (coords_tensor, labels_tensor) = Self::prompts_to_tensors(prompts, image_dimensions);

        let image_value = Value::from_array(image_tensor).map_err(|e| {
            CutoutError::segmentation_unavailable(format!("Failed to convert image tensor: {e}"))
        })?;
        let coords_value = Value::from_array(coords_tensor).map_err(|e| {
            CutoutError::segmentation_unavailable(format!(
                "Failed to convert coordinate tensor: {e}"
            ))
        })?;
        let labels_value = Value::from_array(labels_tensor).map_err(|e| {
            CutoutError::segmentation_unavailable(format!("Failed to convert label tensor: {e}"))
        })?;

        // Positional inputs: image, point coordinates, point labels
        let outputs = session
            .run(ort::inputs![image_value, coords_value, labels_value])
            .map_err(|e| {
                CutoutError::segmentation_unavailable(format!("ONNX inference failed: {e}"))
            })?;

        let keys: Vec<_> = outputs.keys().collect();
        let masks_key = keys
            .first()
            .ok_or_else(|| CutoutError::segmentation_unavailable("No output tensors found"))?;
        let scores_key = keys.get(1).ok_or_else(|| {
            CutoutError::segmentation_unavailable("Model did not produce a score output")
        })?;

        let masks_tensor = outputs
            .get(masks_key)
            .ok_or_else(|| CutoutError::segmentation_unavailable("Mask output tensor not found"))?
            .try_extract_array::<f32>()
            .map_err(|e| {
                CutoutError::segmentation_unavailable(format!(
                    "Failed to extract mask tensor: {e}"
                ))
            })?;
        let scores_tensor = outputs
            .get(scores_key)
            .ok_or_else(|| CutoutError::segmentation_unavailable("Score output tensor not found"))?
            .try_extract_array::<f32>()
            .map_err(|e| {
                CutoutError::segmentation_unavailable(format!(
                    "Failed to extract score tensor: {e}"
                ))
            })?;

        let masks_shape = masks_tensor.shape().to_vec();
        if masks_shape.len() != 4 {
            return Err(CutoutError::segmentation_unavailable(format!(
                "Expected 4D mask tensor, got {}D",
                masks_shape.len()
            )));
        }
        let hypothesis_count = masks_shape[1];
        let grid_height = masks_shape[2] as u32;
        let grid_width = masks_shape[3] as u32;

        let scores: Vec<f32> = scores_tensor.iter().copied().collect();
        let masks_data = masks_tensor.view().to_owned();
        let flat = masks_data.into_raw_vec_and_offset().0;
        let grid_len = (grid_width as usize) * (grid_height as usize);

        let take = hypothesis_count.min(output_count);
        let mut candidates = Vec::with_capacity(take);
        for index in 0..take {
            let start = index * grid_len;
            let grid: Vec<f32> = flat
                .get(start..start + grid_len)
                .ok_or_else(|| {
                    CutoutError::segmentation_unavailable("Mask tensor shorter than its shape")
                })?
                .iter()
                .map(|&logit| Self::sigmoid(logit))
                .collect();

            let mask = Self::resize_probability_grid(
                grid,
                (grid_width, grid_height),
                image_dimensions,
            )?;
            let score = scores.get(index).copied().unwrap_or(0.0);
            candidates.push(MaskCandidate { mask, score });
        }

        log::debug!(
            "Segmentation produced {} candidates (model emitted {})",
            candidates.len(),
            hypothesis_count
        );

        Ok(candidates)
    }

    fn model_name(&self) -> String {
        self.model_manager
            .as_ref()
            .map_or_else(|| "onnx:unresolved".to_string(), ModelManager::display_name)
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::Point;

    #[test]
    fn test_sigmoid_range() {
        assert!((OnnxSegmentationBackend::sigmoid(0.0) - 0.5).abs() < f32::EPSILON);
        assert!(OnnxSegmentationBackend::sigmoid(10.0) > 0.99);
        assert!(OnnxSegmentationBackend::sigmoid(-10.0) < 0.01);
    }

    #[test]
    fn test_image_tensor_shape_and_normalization() {
        let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            64,
            32,
            image::Rgb([255, 255, 255]),
        ));
        let tensor = OnnxSegmentationBackend::image_to_tensor(&image);
        assert_eq!(tensor.dim(), (1, 3, 1024, 1024));

        // White pixel, red channel: (255 - mean) / std
        let expected = (255.0 - NORMALIZATION_MEAN[0]) / NORMALIZATION_STD[0];
        assert!((tensor[[0, 0, 0, 0]] - expected).abs() < 1e-4);
    }

    #[test]
    fn test_prompt_tensor_scaling() {
        let prompts = PromptSet::new(
            vec![Point::new(256, 128)],
            vec![Point::new(0, 0)],
        )
        .unwrap();
        let (coords, labels) = OnnxSegmentationBackend::prompts_to_tensors(&prompts, (512, 256));

        assert_eq!(coords.dim(), (1, 2, 2));
        assert_eq!(labels.dim(), (1, 2));

        // 256 of 512 and 128 of 256 both land mid-frame in model space.
        assert!((coords[[0, 0, 0]] - 512.0).abs() < f32::EPSILON);
        assert!((coords[[0, 0, 1]] - 512.0).abs() < f32::EPSILON);
        assert!((labels[[0, 0]] - 1.0).abs() < f32::EPSILON);
        assert!((labels[[0, 1]] - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_probability_grid_passthrough_when_sizes_match() {
        let grid = vec![0.25f32; 16];
        let mask =
            OnnxSegmentationBackend::resize_probability_grid(grid, (4, 4), (4, 4)).unwrap();
        assert_eq!(mask.dimensions, (4, 4));
        assert!((mask.value_at(2, 2) - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_probability_grid_resize() {
        let grid = vec![1.0f32; 4];
        let mask =
            OnnxSegmentationBackend::resize_probability_grid(grid, (2, 2), (8, 8)).unwrap();
        assert_eq!(mask.dimensions, (8, 8));
        // Constant grids stay constant through interpolation.
        assert!((mask.value_at(3, 5) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_uninitialized_backend_rejects_segment() {
        let mut backend = OnnxSegmentationBackend::new();
        let image = DynamicImage::ImageRgb8(image::RgbImage::new(4, 4));
        let prompts = PromptSet::new(vec![Point::new(1, 1)], vec![]).unwrap();
        let err = backend.segment(&image, &prompts, 4).unwrap_err();
        assert!(matches!(err, CutoutError::Internal(_)));
    }
}
