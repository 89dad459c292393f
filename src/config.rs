//! Configuration types for cutout pipeline operations

use crate::error::{CutoutError, Result};
use crate::models::ModelSpec;
use serde::{Deserialize, Serialize};

/// Execution provider options for ONNX Runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionProvider {
    /// Auto-detect best available provider (CUDA > `CoreML` > CPU)
    Auto,
    /// CPU execution (always available)
    Cpu,
    /// NVIDIA CUDA GPU acceleration
    Cuda,
    /// Apple Silicon GPU acceleration (Metal Performance Shaders)
    CoreMl,
}

impl Default for ExecutionProvider {
    fn default() -> Self {
        // Default to auto-detection for best performance
        Self::Auto
    }
}

impl std::fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
            Self::CoreMl => write!(f, "coreml"),
        }
    }
}

impl std::str::FromStr for ExecutionProvider {
    type Err = CutoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda),
            "coreml" => Ok(Self::CoreMl),
            other => Err(CutoutError::invalid_config(format!(
                "Unknown execution provider '{}' (expected auto, cpu, cuda, coreml)",
                other
            ))),
        }
    }
}

/// Configuration for cutout pipeline operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutoutConfig {
    /// Execution provider for ONNX Runtime
    pub execution_provider: ExecutionProvider,

    /// Model specification including source and variant
    pub model_spec: ModelSpec,

    /// Number of candidate masks requested per segmentation call
    pub mask_candidates: usize,

    /// Sample a random overlay tint instead of the fixed default
    pub random_overlay_color: bool,

    /// Number of intra-op threads for inference (0 = auto)
    pub intra_threads: usize,

    /// Number of inter-op threads for inference (0 = auto)
    pub inter_threads: usize,

    /// Enable debug mode (additional logging and validation)
    pub debug: bool,
}

impl Default for CutoutConfig {
    fn default() -> Self {
        Self {
            execution_provider: ExecutionProvider::default(),
            model_spec: ModelSpec::default(),
            mask_candidates: 4, // Multimask output count of the segmentation model
            random_overlay_color: false,
            intra_threads: 0, // Auto-detect optimal intra-op threads
            inter_threads: 0, // Auto-detect optimal inter-op threads
            debug: false,
        }
    }
}

impl CutoutConfig {
    /// Create a new configuration builder for fluent API construction
    #[must_use]
    pub fn builder() -> CutoutConfigBuilder {
        CutoutConfigBuilder::new()
    }
}

/// Builder for `CutoutConfig`
pub struct CutoutConfigBuilder {
    config: CutoutConfig,
}

impl CutoutConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: CutoutConfig::default(),
        }
    }

    #[must_use]
    pub fn execution_provider(mut self, provider: ExecutionProvider) -> Self {
        self.config.execution_provider = provider;
        self
    }

    #[must_use]
    pub fn model_spec(mut self, model_spec: ModelSpec) -> Self {
        self.config.model_spec = model_spec;
        self
    }

    #[must_use]
    pub fn mask_candidates(mut self, count: usize) -> Self {
        self.config.mask_candidates = count;
        self
    }

    #[must_use]
    pub fn random_overlay_color(mut self, random: bool) -> Self {
        self.config.random_overlay_color = random;
        self
    }

    #[must_use]
    pub fn intra_threads(mut self, threads: usize) -> Self {
        self.config.intra_threads = threads;
        self
    }

    #[must_use]
    pub fn inter_threads(mut self, threads: usize) -> Self {
        self.config.inter_threads = threads;
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns `CutoutError::InvalidConfig` when the candidate count is zero.
    pub fn build(self) -> Result<CutoutConfig> {
        if self.config.mask_candidates == 0 {
            return Err(CutoutError::invalid_config(
                "mask candidate count must be at least 1",
            ));
        }
        Ok(self.config)
    }
}

impl Default for CutoutConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CutoutConfig::default();
        assert_eq!(config.execution_provider, ExecutionProvider::Auto);
        assert_eq!(config.mask_candidates, 4);
        assert!(!config.random_overlay_color);
    }

    #[test]
    fn test_builder_chain() {
        let config = CutoutConfig::builder()
            .execution_provider(ExecutionProvider::Cpu)
            .mask_candidates(2)
            .random_overlay_color(true)
            .debug(true)
            .build()
            .unwrap();

        assert_eq!(config.execution_provider, ExecutionProvider::Cpu);
        assert_eq!(config.mask_candidates, 2);
        assert!(config.random_overlay_color);
        assert!(config.debug);
    }

    #[test]
    fn test_zero_candidates_rejected() {
        let result = CutoutConfig::builder().mask_candidates(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!(
            "coreml".parse::<ExecutionProvider>().unwrap(),
            ExecutionProvider::CoreMl
        );
        assert_eq!(
            "CUDA".parse::<ExecutionProvider>().unwrap(),
            ExecutionProvider::Cuda
        );
        assert!("tpu".parse::<ExecutionProvider>().is_err());
    }

    #[test]
    fn test_provider_display_round_trip() {
        for provider in [
            ExecutionProvider::Auto,
            ExecutionProvider::Cpu,
            ExecutionProvider::Cuda,
            ExecutionProvider::CoreMl,
        ] {
            let parsed: ExecutionProvider = provider.to_string().parse().unwrap();
            assert_eq!(parsed, provider);
        }
    }
}
