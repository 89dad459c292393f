//! Backend implementations for promptable segmentation
//!
//! This module provides the inference backends behind the
//! `SegmentationBackend` trait:
//! - ONNX Runtime backend (high performance, GPU acceleration)

#[cfg(feature = "onnx")]
pub mod onnx;

// Test utilities for backend testing
#[cfg(test)]
pub mod test_utils;

// Re-export backends based on enabled features
#[cfg(feature = "onnx")]
pub use self::onnx::OnnxSegmentationBackend;
