//! Dependency resolution
//!
//! Probes a function's source tree for a `requirements.txt` manifest and,
//! when one is present, shells out to the package installer to materialize
//! the listed dependencies where the archiver will pick them up. The manifest
//! format belongs to the installer; nothing here interprets it.

use std::path::Path;
use std::process::Command;

use async_trait::async_trait;

use crate::error::ResolveError;
use crate::task::PackagingTask;

/// Name of the dependency manifest probed for in the source tree.
pub const MANIFEST_NAME: &str = "requirements.txt";

/// Outcome of a resolution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// No manifest was present; the installer was never invoked.
    Skipped,
    /// The installer ran and exited successfully.
    Installed,
}

/// Materializes a function's third-party dependencies before archiving.
#[async_trait]
pub trait DependencyResolver: Send + Sync {
    async fn resolve(&self, task: &PackagingTask) -> Result<Resolution, ResolveError>;
}

/// Resolver backed by the `pip` command-line installer.
///
/// Installed packages land under the task's dependency directory and stay
/// there after the run; the pipeline's cleanup guarantee covers only the
/// transient archive.
#[derive(Debug, Clone)]
pub struct PipResolver {
    installer: String,
}

impl PipResolver {
    pub fn new() -> Self {
        Self {
            installer: "pip".to_string(),
        }
    }

    /// Use a different installer binary. The replacement must accept
    /// `install -r <manifest> -t <target>`.
    pub fn with_installer(installer: impl Into<String>) -> Self {
        Self {
            installer: installer.into(),
        }
    }
}

impl Default for PipResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DependencyResolver for PipResolver {
    async fn resolve(&self, task: &PackagingTask) -> Result<Resolution, ResolveError> {
        let manifest = task.source_path().join(MANIFEST_NAME);
        if !manifest.exists() {
            tracing::info!(
                "no {} found in {}, skipping dependency resolution",
                MANIFEST_NAME,
                task.source_path().display()
            );
            return Ok(Resolution::Skipped);
        }

        let installer = self.installer.clone();
        let target = task.dependency_dir();

        tokio::task::spawn_blocking(move || run_installer(&installer, &manifest, &target))
            .await?
    }
}

fn run_installer(
    installer: &str,
    manifest: &Path,
    target: &Path,
) -> Result<Resolution, ResolveError> {
    tracing::debug!(
        "running {} install -r {} -t {}",
        installer,
        manifest.display(),
        target.display()
    );

    let output = Command::new(installer)
        .arg("install")
        .arg("-r")
        .arg(manifest)
        .arg("-t")
        .arg(target)
        .output()?;

    if !output.status.success() {
        return Err(ResolveError::Installer {
            installer: installer.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        tracing::debug!("installer output:\n{}", stdout.trim_end());
    }

    Ok(Resolution::Installed)
}
