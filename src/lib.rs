#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Promptcut
//!
//! Point-prompt segmentation cutout pipeline. A user marks an image region
//! with positive and negative points, a promptable segmentation model
//! proposes candidate masks, and the pipeline decomposes the source image
//! into two complementary derivatives:
//!
//! - a **hole** image: the source with the selected region removed
//!   (transparent) and cropped to the remaining content's bounding box
//! - an **object** image: the selected region alone, transparent elsewhere,
//!   cropped to its own bounding box
//!
//! plus a full-frame **overlay** preview with the selection tinted. Each
//! artifact ships as base64-encoded PNG bytes, pixel-exact through the round
//! trip.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use promptcut::{CutoutConfig, CutoutRequest, CutoutProcessor};
//!
//! # fn example(request_json: &[u8]) -> anyhow::Result<()> {
//! let config = CutoutConfig::builder().build()?;
//! let mut processor = CutoutProcessor::new(config)?;
//!
//! let request = CutoutRequest::from_json(request_json)?;
//! let response = processor.process_request(&request)?;
//! println!("hole artifact: {} bytes of base64", response.image_hole.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Library vs CLI Usage
//!
//! All core functionality is available by default as a library; enable the
//! `cli` feature for the command-line interface.
//!
//! ### Feature Flags
//!
//! - `onnx` (default): ONNX Runtime segmentation backend with GPU support
//! - `cli` (default): command-line interface and tracing subscriber setup

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod decompose;
pub mod download;
pub mod encode;
pub mod error;
pub mod inference;
pub mod models;
pub mod overlay;
pub mod payload;
pub mod processor;
pub mod prompt;
pub mod selector;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;

// Internal imports for lib functions
use tokio::io::AsyncRead;

// Public API exports
pub use backends::*;
pub use config::{CutoutConfig, CutoutConfigBuilder, ExecutionProvider};
pub use decompose::{ImageDecomposer, BINARIZE_THRESHOLD};
pub use download::ModelDownloader;
pub use encode::ResultEncoder;
pub use error::{CutoutError, Result};
pub use inference::SegmentationBackend;
pub use models::{ModelManager, ModelSource, ModelSpec};
pub use overlay::{OverlayRenderer, DEFAULT_TINT, TINT_OPACITY};
pub use payload::{
    CutoutRequest, CutoutResponse, ARTIFACT_HOLE, ARTIFACT_OBJECT, ARTIFACT_OVERLAY,
};
pub use processor::{BackendFactory, BackendType, CutoutProcessor, DefaultBackendFactory};
pub use prompt::{Point, PromptSet};
pub use selector::MaskSelector;
pub use services::{ArtifactSink, DirectorySink, ImageIOService, MemorySink};
pub use types::{
    BoundingBox, CutoutResult, DecompositionResult, Mask, MaskCandidate, PipelineTimings,
    ProcessingMetadata,
};

#[cfg(feature = "cli")]
pub use tracing_config::{TracingConfig, TracingFormat};

/// Run one cutout request provided as a JSON payload
///
/// Builds a processor, runs the request, and tears the processor down again.
/// For more than one request, construct a [`CutoutProcessor`] once and reuse
/// it so the segmentation model loads a single time.
///
/// # Errors
///
/// See the error taxonomy in [`CutoutError`]; any stage failure aborts the
/// request with no artifacts produced.
pub fn cutout_from_bytes(request_json: &[u8], config: &CutoutConfig) -> Result<CutoutResponse> {
    let request = CutoutRequest::from_json(request_json)?;
    let mut processor = CutoutProcessor::new(config.clone())?;
    processor.process_request(&request)
}

/// Run one cutout request read from an async reader stream
///
/// Suitable for hosts piping request payloads over stdin or sockets.
///
/// # Errors
///
/// Stream read failures surface as `CutoutError::Io`; everything else follows
/// [`cutout_from_bytes`].
pub async fn cutout_from_reader<R: AsyncRead + Unpin>(
    mut reader: R,
    config: &CutoutConfig,
) -> Result<CutoutResponse> {
    let mut buffer = Vec::new();
    tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut buffer).await?;
    cutout_from_bytes(&buffer, config)
}
