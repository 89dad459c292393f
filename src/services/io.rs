//! Image file I/O and artifact delivery
//!
//! The pipeline itself never touches the filesystem; the host injects a sink
//! and the orchestrator writes the named artifacts through it. The original
//! host contract is files named after each artifact; in-process consumers use
//! the memory sink instead.

use crate::error::{CutoutError, Result};
use image::DynamicImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path
    ///
    /// Extension-based format detection first; content-based detection as a
    /// fallback for misnamed files.
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(CutoutError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        match image::open(path_ref) {
            Ok(img) => Ok(img),
            Err(e) => {
                log::debug!(
                    "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                    path_ref.display(),
                    e
                );

                let data = std::fs::read(path_ref).map_err(|io_err| {
                    CutoutError::file_io_error("read image data", path_ref, &io_err)
                })?;

                image::load_from_memory(&data).map_err(|content_err| {
                    CutoutError::input_decode(format!(
                        "Failed to load image '{}' with both extension-based ({}) and content-based detection ({})",
                        path_ref.display(),
                        e,
                        content_err
                    ))
                })
            },
        }
    }

    /// Save an image as PNG, creating parent directories as needed
    pub fn save_png<P: AsRef<Path>>(image: &DynamicImage, path: P) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CutoutError::file_io_error("create output directory", parent, &e)
            })?;
        }

        image
            .save_with_format(path_ref, image::ImageFormat::Png)
            .map_err(|e| CutoutError::encoding(format!("Failed to save PNG: {}", e)))
    }
}

/// Destination for the pipeline's named text artifacts
///
/// A sink only ever sees a complete, successful invocation: the orchestrator
/// writes nothing when any stage fails.
pub trait ArtifactSink {
    /// Write one named artifact payload
    ///
    /// # Errors
    /// - Sink-specific delivery failures (filesystem, transport)
    fn write_artifact(&mut self, name: &str, payload: &str) -> Result<()>;
}

/// Sink writing each artifact to `<directory>/<name>.txt`
pub struct DirectorySink {
    directory: PathBuf,
}

impl DirectorySink {
    /// Create a sink targeting the given directory, creating it if missing
    pub fn new<P: Into<PathBuf>>(directory: P) -> Result<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)
            .map_err(|e| CutoutError::file_io_error("create artifact directory", &directory, &e))?;
        Ok(Self { directory })
    }

    /// Path an artifact name maps to
    #[must_use]
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{}.txt", name))
    }
}

impl ArtifactSink for DirectorySink {
    fn write_artifact(&mut self, name: &str, payload: &str) -> Result<()> {
        let path = self.artifact_path(name);
        std::fs::write(&path, payload)
            .map_err(|e| CutoutError::file_io_error("write artifact", &path, &e))?;
        log::debug!("Wrote artifact '{}' to {}", name, path.display());
        Ok(())
    }
}

/// Sink collecting artifacts in memory, for tests and embedding hosts
#[derive(Debug, Default)]
pub struct MemorySink {
    artifacts: HashMap<String, String>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve a collected artifact by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.artifacts.get(name).map(String::as_str)
    }

    /// Number of collected artifacts
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

impl ArtifactSink for MemorySink {
    fn write_artifact(&mut self, name: &str, payload: &str) -> Result<()> {
        self.artifacts.insert(name.to_string(), payload.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_load_missing_file_rejected() {
        let err = ImageIOService::load_image("/nonexistent/input.png").unwrap_err();
        assert!(matches!(err, CutoutError::Io(_)));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.png");

        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([9, 8, 7, 255])));
        ImageIOService::save_png(&image, &path).unwrap();

        let loaded = ImageIOService::load_image(&path).unwrap();
        assert_eq!(loaded.to_rgba8().as_raw(), image.to_rgba8().as_raw());
    }

    #[test]
    fn test_directory_sink_writes_named_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path().join("artifacts")).unwrap();

        sink.write_artifact("image_hole", "payload-a").unwrap();
        sink.write_artifact("image_object", "payload-b").unwrap();

        let hole = std::fs::read_to_string(sink.artifact_path("image_hole")).unwrap();
        assert_eq!(hole, "payload-a");
        let object = std::fs::read_to_string(sink.artifact_path("image_object")).unwrap();
        assert_eq!(object, "payload-b");
    }

    #[test]
    fn test_memory_sink_collects_artifacts() {
        let mut sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.write_artifact("image_with_mask", "overlay").unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.get("image_with_mask"), Some("overlay"));
        assert_eq!(sink.get("missing"), None);
    }
}
