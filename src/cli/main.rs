//! Promptcut CLI
//!
//! Reads a cutout request (JSON with base64 image bytes and point prompts)
//! from stdin or a file, runs the segmentation cutout pipeline, and writes
//! the three artifacts to an output directory.

use crate::config::{CutoutConfig, ExecutionProvider};
use crate::download::ModelDownloader;
use crate::models::{self, ModelSource, ModelSpec};
use crate::payload::CutoutRequest;
use crate::processor::CutoutProcessor;
use crate::services::DirectorySink;
use crate::tracing_config::TracingConfig;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Point-prompt segmentation cutout tool
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "promptcut")]
pub struct Cli {
    /// Request JSON file (use "-" for stdin)
    #[arg(value_name = "REQUEST", default_value = "-")]
    pub input: String,

    /// Directory the artifacts are written to
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Model name in the cache, filesystem path, or download URL
    /// [default: first cached model]
    #[arg(short, long)]
    pub model: Option<String>,

    /// Execution provider (auto, cpu, cuda, coreml)
    #[arg(short, long, default_value = "auto")]
    pub execution_provider: String,

    /// Number of candidate masks requested per segmentation call
    #[arg(long, default_value_t = 4)]
    pub candidates: usize,

    /// Sample a random overlay tint instead of the fixed blue
    #[arg(long)]
    pub random_overlay_color: bool,

    /// Number of threads (0 = auto-detect optimal threading)
    #[arg(short, long, default_value_t = 0)]
    pub threads: usize,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Download the model given by --model (a URL) and exit
    #[arg(long)]
    pub only_download: bool,

    /// Expected SHA256 of a downloaded model
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,

    /// List cached models and exit
    #[arg(long)]
    pub list_models: bool,

    /// Show execution provider diagnostics and exit
    #[arg(long)]
    pub show_providers: bool,
}

impl Cli {
    /// Resolve the --model argument into a model spec, downloading URLs
    async fn resolve_model_spec(&self) -> Result<ModelSpec> {
        let Some(model) = &self.model else {
            return Ok(ModelSpec::default());
        };

        if model.starts_with("http://") || model.starts_with("https://") {
            let downloader = ModelDownloader::new()?;
            let model_id = downloader
                .download_model(model, self.sha256.as_deref())
                .await
                .context("model download failed")?;
            return Ok(ModelSpec {
                source: ModelSource::Downloaded(model_id),
                variant: None,
            });
        }

        let path = Path::new(model);
        if path.exists() {
            Ok(ModelSpec {
                source: ModelSource::External(path.to_path_buf()),
                variant: None,
            })
        } else {
            Ok(ModelSpec {
                source: ModelSource::Downloaded(model.clone()),
                variant: None,
            })
        }
    }

    fn read_request(&self) -> Result<CutoutRequest> {
        let bytes = if self.input == "-" {
            let mut buffer = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buffer)
                .context("failed to read request from stdin")?;
            buffer
        } else {
            std::fs::read(&self.input)
                .with_context(|| format!("failed to read request file '{}'", self.input))?
        };

        Ok(CutoutRequest::from_json(&bytes)?)
    }
}

fn show_providers() {
    #[cfg(feature = "onnx")]
    {
        println!("Execution providers:");
        for (name, available, description) in
            crate::backends::OnnxSegmentationBackend::list_providers()
        {
            let status = if available { "available" } else { "unavailable" };
            println!("  {:<8} {:<12} {}", name, status, description);
        }
    }
    #[cfg(not(feature = "onnx"))]
    println!("No inference backends compiled in (rebuild with the 'onnx' feature)");
}

fn list_models() -> Result<()> {
    let cache = models::cache_dir()?;
    println!("Model cache: {}", cache.display());

    let mut found = false;
    if let Ok(entries) = std::fs::read_dir(&cache) {
        let mut names: Vec<String> = entries
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.path().join("model.onnx").exists())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        for name in names {
            println!("  {}", name);
            found = true;
        }
    }
    if !found {
        println!("  (no cached models; use --model <URL> --only-download)");
    }
    Ok(())
}

/// CLI entry point
///
/// # Errors
///
/// Returns an error when the request cannot be read, the pipeline fails, or
/// artifacts cannot be written.
pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    TracingConfig::new()
        .with_verbosity(cli.verbose)
        .init()
        .context("failed to initialize tracing")?;

    if cli.show_providers {
        show_providers();
        return Ok(());
    }

    if cli.list_models {
        return list_models();
    }

    if cli.only_download {
        let Some(url) = &cli.model else {
            anyhow::bail!("--only-download requires --model <URL>");
        };
        let downloader = ModelDownloader::new()?;
        let model_id = downloader
            .download_model(url, cli.sha256.as_deref())
            .await
            .context("model download failed")?;
        println!("Downloaded model: {}", model_id);
        return Ok(());
    }

    let provider: ExecutionProvider = cli
        .execution_provider
        .parse()
        .context("invalid --execution-provider")?;
    let model_spec = cli.resolve_model_spec().await?;

    let config = CutoutConfig::builder()
        .execution_provider(provider)
        .model_spec(model_spec)
        .mask_candidates(cli.candidates)
        .random_overlay_color(cli.random_overlay_color)
        .intra_threads(cli.threads)
        .build()?;

    let request = cli.read_request()?;

    let mut processor = CutoutProcessor::new(config)?;
    let mut sink = DirectorySink::new(cli.output_dir.clone())?;
    let response = processor.process_request_to_sink(&request, &mut sink)?;

    for (name, _) in response.artifacts() {
        println!("{}", sink.artifact_path(name).display());
    }

    Ok(())
}
