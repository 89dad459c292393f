//! Promptcut CLI tool
//!
//! Command-line interface for the point-prompt segmentation cutout pipeline.

#[cfg(feature = "cli")]
use promptcut::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
