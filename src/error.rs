//! Error types for cutout pipeline operations

use thiserror::Error;

/// Result type alias for cutout pipeline operations
pub type Result<T> = std::result::Result<T, CutoutError>;

/// Comprehensive error types for the cutout pipeline
///
/// Every error is local to one request and fatal for it: the orchestrator
/// never retries and never downgrades a failure to an empty result.
#[derive(Error, Debug)]
pub enum CutoutError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image format or processing errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// No usable point prompt supplied
    #[error("Invalid prompt: {0}")]
    InvalidPrompt(String),

    /// Malformed request payload or undecodable image bytes
    #[error("Input decode error: {0}")]
    InputDecode(String),

    /// The segmentation collaborator failed to load or run
    #[error("Segmentation unavailable: {0}")]
    SegmentationUnavailable(String),

    /// The segmentation collaborator returned zero candidates despite success
    #[error("No mask candidates returned by segmentation")]
    NoMaskCandidates,

    /// The chosen mask selects the entire frame, leaving no background pixels
    #[error("Empty background region: mask selects the entire frame")]
    EmptyBackgroundRegion,

    /// The chosen mask selects nothing, leaving no object pixels
    #[error("Empty selection: mask selects no pixels")]
    EmptySelection,

    /// Mask spatial dimensions do not match the source image
    #[error("Mask dimension mismatch: mask is {mask_width}x{mask_height}, image is {image_width}x{image_height}")]
    MaskDimensionMismatch {
        mask_width: u32,
        mask_height: u32,
        image_width: u32,
        image_height: u32,
    },

    /// Compression or serialization of a result image failed
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Model loading or resolution errors
    #[error("Model error: {0}")]
    Model(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CutoutError {
    /// Create a new invalid prompt error
    pub fn invalid_prompt<S: Into<String>>(msg: S) -> Self {
        Self::InvalidPrompt(msg.into())
    }

    /// Create a new input decode error
    pub fn input_decode<S: Into<String>>(msg: S) -> Self {
        Self::InputDecode(msg.into())
    }

    /// Create a new segmentation unavailable error
    pub fn segmentation_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::SegmentationUnavailable(msg.into())
    }

    /// Create a new encoding error
    pub fn encoding<S: Into<String>>(msg: S) -> Self {
        Self::Encoding(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create a pipeline stage error with request context
    pub fn stage_error(stage: &str, details: &str, request_id: Option<&str>) -> Self {
        let request_context = match request_id {
            Some(id) => format!(" (request: {})", id),
            None => String::new(),
        };

        Self::Internal(format!(
            "Pipeline failed at stage '{}'{}: {}",
            stage, request_context, details
        ))
    }

    /// The pipeline stage an error taxonomically belongs to, for logging
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidPrompt(_) => "prompt_collection",
            Self::InputDecode(_) => "input_decode",
            Self::SegmentationUnavailable(_) => "segmentation",
            Self::NoMaskCandidates => "mask_selection",
            Self::EmptyBackgroundRegion
            | Self::EmptySelection
            | Self::MaskDimensionMismatch { .. } => "decomposition",
            Self::Encoding(_) => "encoding",
            Self::Io(_) | Self::Image(_) => "io",
            Self::InvalidConfig(_) => "configuration",
            Self::Model(_) => "model",
            Self::Internal(_) => "internal",
        }
    }
}
