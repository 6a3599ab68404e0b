//! funcpack - Package a function and publish it to an object store
//!
//! The binary wires the concrete collaborators (pip resolver, zip archiver,
//! S3 uploader) into the packaging pipeline. With `--dry-run` the upload goes
//! to an in-memory store instead of the network.

mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use funcpack_core::{
    CleanupStatus, FunctionSpec, MemoryUploader, PackagingReport, PackagingTask, PipResolver,
    Pipeline, S3Uploader, ZipArchiver,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;

/// Package a function directory into a zip archive and publish it for
/// deployment.
#[derive(Debug, Parser)]
#[command(name = "funcpack", version)]
struct Cli {
    /// Logical name of the function.
    name: String,

    /// Source directory. Defaults to the function name.
    #[arg(long)]
    path: Option<PathBuf>,

    /// Destination bucket in the object store.
    #[arg(long)]
    bucket: String,

    /// Key prefix for the uploaded artifact.
    #[arg(long, default_value = "")]
    key_prefix: String,

    /// Directory for the transient archive. Defaults to the working
    /// directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Run the whole pipeline without touching the remote store.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,funcpack_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let task = PackagingTask::new(FunctionSpec {
        name: cli.name,
        path: cli.path,
        bucket: cli.bucket,
        key_prefix: cli.key_prefix,
        output_dir: cli.output_dir,
    })?;

    let resolver = PipResolver::new();
    let report = if cli.dry_run {
        tracing::info!("dry run: uploading to an in-memory store");
        Pipeline::new(resolver, ZipArchiver, MemoryUploader::new())
            .run(&task)
            .await?
    } else {
        let config = AppConfig::from_env();
        Pipeline::new(resolver, ZipArchiver, S3Uploader::new(config.storage()))
            .run(&task)
            .await?
    };

    announce(&report);
    Ok(())
}

fn announce(report: &PackagingReport) {
    tracing::info!("published {} at {}", report.function, report.remote_key);
    if let CleanupStatus::Failed { path, .. } = &report.cleanup {
        tracing::warn!("transient archive left behind at {}", path.display());
    }
}
