//! Segmentation model resolution and loading

use crate::error::{CutoutError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File name a cached or external model directory must contain
const MODEL_FILE_NAME: &str = "model.onnx";

/// Model source specification
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ModelSource {
    /// External model from filesystem path (a file or a directory holding
    /// `model.onnx`)
    External(PathBuf),
    /// Downloaded model from cache by model ID; an empty ID resolves to the
    /// first cached model at runtime
    Downloaded(String),
}

impl ModelSource {
    /// Get a display name for tracing and logging
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            ModelSource::External(path) => {
                format!(
                    "external:{}",
                    path.file_name().unwrap_or_default().to_string_lossy()
                )
            },
            ModelSource::Downloaded(model_id) => {
                format!("cached:{}", model_id)
            },
        }
    }
}

/// Complete model specification including source and optional variant
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ModelSpec {
    pub source: ModelSource,
    pub variant: Option<String>,
}

impl Default for ModelSpec {
    fn default() -> Self {
        // Default to using the first available cached model
        Self {
            source: ModelSource::Downloaded(String::new()),
            variant: None,
        }
    }
}

/// Root directory of the model cache
///
/// # Errors
///
/// Returns `CutoutError::Model` when no platform cache directory exists.
pub fn cache_dir() -> Result<PathBuf> {
    dirs::cache_dir()
        .map(|base| base.join("promptcut").join("models"))
        .ok_or_else(|| CutoutError::model("No cache directory available on this platform"))
}

/// Resolves a model spec to an on-disk model and loads it
#[derive(Debug, Clone)]
pub struct ModelManager {
    spec: ModelSpec,
    model_path: PathBuf,
}

impl ModelManager {
    /// Resolve a model spec against the filesystem and cache
    ///
    /// # Errors
    ///
    /// Returns `CutoutError::Model` when the spec cannot be resolved to an
    /// existing model file.
    pub fn from_spec(spec: &ModelSpec) -> Result<Self> {
        let model_path = match &spec.source {
            ModelSource::External(path) => Self::resolve_external(path)?,
            ModelSource::Downloaded(model_id) => Self::resolve_cached(model_id)?,
        };

        Ok(Self {
            spec: spec.clone(),
            model_path,
        })
    }

    fn resolve_external(path: &Path) -> Result<PathBuf> {
        let candidate = if path.is_dir() {
            path.join(MODEL_FILE_NAME)
        } else {
            path.to_path_buf()
        };

        if candidate.exists() {
            Ok(candidate)
        } else {
            Err(CutoutError::model(format!(
                "External model not found at '{}'",
                candidate.display()
            )))
        }
    }

    fn resolve_cached(model_id: &str) -> Result<PathBuf> {
        let cache = cache_dir()?;

        let model_dir = if model_id.is_empty() {
            // Empty ID: first cached model, alphabetical for determinism
            let mut entries: Vec<PathBuf> = fs::read_dir(&cache)
                .map_err(|_| {
                    CutoutError::model(format!(
                        "Model cache is empty; download a model first (cache: {})",
                        cache.display()
                    ))
                })?
                .filter_map(std::result::Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.is_dir())
                .collect();
            entries.sort();
            entries.into_iter().next().ok_or_else(|| {
                CutoutError::model(format!(
                    "Model cache is empty; download a model first (cache: {})",
                    cache.display()
                ))
            })?
        } else {
            cache.join(model_id)
        };

        let candidate = model_dir.join(MODEL_FILE_NAME);
        if candidate.exists() {
            Ok(candidate)
        } else {
            Err(CutoutError::model(format!(
                "Cached model '{}' not found (expected {})",
                model_id,
                candidate.display()
            )))
        }
    }

    /// Load the model file into memory
    pub fn load_model(&self) -> Result<Vec<u8>> {
        fs::read(&self.model_path)
            .map_err(|e| CutoutError::file_io_error("read model file", &self.model_path, &e))
    }

    /// Path of the resolved model file
    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// The spec this manager was resolved from
    #[must_use]
    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// Display name for logging and metadata
    #[must_use]
    pub fn display_name(&self) -> String {
        self.spec.source.display_name()
    }
}
