//! Segmentation model downloading
//!
//! Fetches an ONNX model over HTTPS into the local cache so a single
//! download serves every later invocation. Downloads land in a temporary
//! directory first and move into the cache atomically.

use crate::error::{CutoutError, Result};
use crate::models;
use futures_util::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Downloads segmentation models into the cache
pub struct ModelDownloader {
    client: Client,
    cache_dir: PathBuf,
}

impl ModelDownloader {
    /// Create a new model downloader
    ///
    /// # Errors
    /// - Failed to create HTTP client
    /// - No cache directory available
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| CutoutError::model(format!("Failed to create HTTP client: {}", e)))?;

        let cache_dir = models::cache_dir()?;

        Ok(Self { client, cache_dir })
    }

    /// Derive a cache-safe model ID from a download URL
    ///
    /// `https://example.com/models/edge-sam.onnx` becomes `edge-sam`.
    #[must_use]
    pub fn url_to_model_id(url: &str) -> String {
        let stem = url
            .rsplit('/')
            .next()
            .unwrap_or(url)
            .trim_end_matches(".onnx");
        let slug: String = stem
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        if slug.is_empty() {
            "model".to_string()
        } else {
            slug
        }
    }

    /// Check whether a model ID is already cached
    #[must_use]
    pub fn is_cached(&self, model_id: &str) -> bool {
        self.cache_dir.join(model_id).join("model.onnx").exists()
    }

    /// Download a model into the cache, returning its model ID
    ///
    /// Already-cached models are not re-downloaded. An optional SHA256 hex
    /// digest is verified before the model is committed to the cache.
    ///
    /// # Errors
    /// - Network errors during download
    /// - File system errors during caching
    /// - Checksum mismatch against `expected_sha256`
    pub async fn download_model(
        &self,
        url: &str,
        expected_sha256: Option<&str>,
    ) -> Result<String> {
        let model_id = Self::url_to_model_id(url);
        log::info!("Downloading model from: {}", url);
        log::info!("Model ID: {}", model_id);

        if self.is_cached(&model_id) {
            log::info!("Model already cached: {}", model_id);
            return Ok(model_id);
        }

        let temp_dir = self.cache_dir.join(format!(".tmp-{}", model_id));
        fs::create_dir_all(&temp_dir)
            .map_err(|e| CutoutError::file_io_error("create temp directory", &temp_dir, &e))?;
        let temp_file = temp_dir.join("model.onnx");

        let download = self.download_file(url, &temp_file).await;
        let verify = download.and_then(|()| {
            if let Some(expected) = expected_sha256 {
                Self::verify_file_integrity(&temp_file, expected)
            } else {
                Ok(())
            }
        });

        match verify {
            Ok(()) => {
                let final_dir = self.cache_dir.join(&model_id);
                if final_dir.exists() {
                    fs::remove_dir_all(&final_dir).map_err(|e| {
                        CutoutError::file_io_error("clear cached model", &final_dir, &e)
                    })?;
                }
                fs::rename(&temp_dir, &final_dir).map_err(|e| {
                    CutoutError::file_io_error("commit model to cache", &final_dir, &e)
                })?;
                log::info!("Model cached: {}", final_dir.display());
                Ok(model_id)
            },
            Err(e) => {
                let _ = fs::remove_dir_all(&temp_dir);
                Err(e)
            },
        }
    }

    async fn download_file(&self, url: &str, local_path: &Path) -> Result<()> {
        log::debug!("Downloading: {} -> {}", url, local_path.display());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CutoutError::model(format!("Failed to download {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(CutoutError::model(format!(
                "HTTP error {} for {}",
                response.status(),
                url
            )));
        }

        let mut file = tokio::fs::File::create(local_path)
            .await
            .map_err(|e| CutoutError::file_io_error("create file", local_path, &e))?;

        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| CutoutError::model(format!("Failed to read download stream: {}", e)))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| CutoutError::file_io_error("write to file", local_path, &e))?;
            downloaded += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| CutoutError::file_io_error("flush file", local_path, &e))?;

        log::debug!(
            "Downloaded {} bytes to {}",
            downloaded,
            local_path.display()
        );
        Ok(())
    }

    /// Verify a downloaded file against an expected SHA256 hex digest
    pub fn verify_file_integrity(file_path: &Path, expected_sha256: &str) -> Result<()> {
        let contents = fs::read(file_path).map_err(|e| {
            CutoutError::file_io_error("read file for verification", file_path, &e)
        })?;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        let actual = format!("{:x}", hasher.finalize());

        if actual.eq_ignore_ascii_case(expected_sha256) {
            Ok(())
        } else {
            Err(CutoutError::model(format!(
                "Checksum mismatch for '{}': expected {}, got {}",
                file_path.display(),
                expected_sha256,
                actual
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_to_model_id() {
        assert_eq!(
            ModelDownloader::url_to_model_id("https://example.com/models/edge-sam.onnx"),
            "edge-sam"
        );
        assert_eq!(
            ModelDownloader::url_to_model_id("https://example.com/sam_decoder.onnx"),
            "sam_decoder"
        );
        assert_eq!(ModelDownloader::url_to_model_id("https://x.y/a b.onnx"), "a-b");
    }

    #[test]
    fn test_verify_file_integrity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.onnx");
        fs::write(&path, b"hello").unwrap();

        // sha256("hello")
        let expected = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        assert!(ModelDownloader::verify_file_integrity(&path, expected).is_ok());
        assert!(ModelDownloader::verify_file_integrity(&path, "deadbeef").is_err());
    }
}
