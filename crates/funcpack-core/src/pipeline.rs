//! Packaging pipeline
//!
//! Sequences dependency resolution, archiving, and upload for a single task,
//! and guarantees the transient archive is removed whichever way the run
//! ends. Stages run strictly in order with no overlap; the first failure
//! aborts the rest.

use std::io;
use std::path::PathBuf;

use crate::archiver::Archiver;
use crate::error::PipelineError;
use crate::resolver::DependencyResolver;
use crate::task::PackagingTask;
use crate::uploader::Uploader;

/// How cleanup of the transient artifact ended.
#[derive(Debug)]
pub enum CleanupStatus {
    /// The artifact was removed.
    Removed,
    /// The artifact could not be removed; the run itself is unaffected.
    Failed { path: PathBuf, source: io::Error },
}

impl CleanupStatus {
    pub fn is_clean(&self) -> bool {
        matches!(self, CleanupStatus::Removed)
    }
}

/// Summary of a successful run.
#[derive(Debug)]
pub struct PackagingReport {
    /// Function that was packaged.
    pub function: String,
    /// Key the artifact was stored under.
    pub remote_key: String,
    /// Outcome of removing the transient archive. A failed cleanup does not
    /// invalidate the upload; callers decide how severe it is.
    pub cleanup: CleanupStatus,
}

/// Orchestrates resolve → archive → upload with guaranteed cleanup.
///
/// Collaborators are injected at construction time so tests can swap in
/// mocks for any stage.
pub struct Pipeline<R, A, U> {
    resolver: R,
    archiver: A,
    uploader: U,
}

impl<R, A, U> Pipeline<R, A, U>
where
    R: DependencyResolver,
    A: Archiver,
    U: Uploader,
{
    pub fn new(resolver: R, archiver: A, uploader: U) -> Self {
        Self {
            resolver,
            archiver,
            uploader,
        }
    }

    /// Run the full pipeline for one task.
    ///
    /// Whatever the outcome, removal of the transient archive is attempted
    /// before returning. On success the report carries the cleanup status;
    /// on failure the stage error is returned and a failed cleanup is only
    /// logged.
    pub async fn run(&self, task: &PackagingTask) -> Result<PackagingReport, PipelineError> {
        let outcome = self.drive(task).await;
        let cleanup = self.cleanup(task).await;

        outcome.map(|()| PackagingReport {
            function: task.function_name().to_string(),
            remote_key: task.remote_key().to_string(),
            cleanup,
        })
    }

    async fn drive(&self, task: &PackagingTask) -> Result<(), PipelineError> {
        tracing::info!("resolving dependencies for {}", task.function_name());
        self.resolver
            .resolve(task)
            .await
            .map_err(|source| PipelineError::Resolve {
                function: task.function_name().to_string(),
                source,
            })?;

        tracing::info!(
            "archiving {} into {}",
            task.source_path().display(),
            task.artifact_path().display()
        );
        self.archiver
            .zip(task.source_path(), task.artifact_path())
            .await
            .map_err(|source| PipelineError::Archive {
                function: task.function_name().to_string(),
                source,
            })?;

        tracing::info!(
            "uploading {} to {}/{}",
            task.artifact_path().display(),
            task.remote_bucket(),
            task.remote_key()
        );
        self.uploader
            .upload(task)
            .await
            .map_err(|source| PipelineError::Upload {
                function: task.function_name().to_string(),
                source,
            })?;

        Ok(())
    }

    /// Remove the transient archive. Always attempted, never fatal.
    async fn cleanup(&self, task: &PackagingTask) -> CleanupStatus {
        let path = task.artifact_path().to_path_buf();
        tracing::debug!("cleaning up {}", path.display());

        match tokio::fs::remove_file(&path).await {
            Ok(()) => CleanupStatus::Removed,
            Err(source) => {
                tracing::warn!("could not remove {}: {}", path.display(), source);
                CleanupStatus::Failed { path, source }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archiver::ZipArchiver;
    use crate::error::{ArchiveError, ResolveError, UploadError};
    use crate::resolver::{PipResolver, Resolution};
    use crate::task::FunctionSpec;
    use crate::uploader::MemoryUploader;

    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    struct NoopResolver;

    #[async_trait]
    impl DependencyResolver for NoopResolver {
        async fn resolve(&self, _task: &PackagingTask) -> Result<Resolution, ResolveError> {
            Ok(Resolution::Skipped)
        }
    }

    struct FailingArchiver;

    #[async_trait]
    impl Archiver for FailingArchiver {
        async fn zip(&self, source: &Path, _target: &Path) -> Result<(), ArchiveError> {
            Err(ArchiveError::MissingSource(source.to_path_buf()))
        }
    }

    #[derive(Clone, Default)]
    struct CountingUploader {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Uploader for CountingUploader {
        async fn upload(&self, _task: &PackagingTask) -> Result<(), UploadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct RejectingUploader;

    #[async_trait]
    impl Uploader for RejectingUploader {
        async fn upload(&self, _task: &PackagingTask) -> Result<(), UploadError> {
            Err(UploadError::Rejected(500))
        }
    }

    /// Consumes the artifact before returning, so pipeline cleanup fails.
    struct ArtifactStealingUploader;

    #[async_trait]
    impl Uploader for ArtifactStealingUploader {
        async fn upload(&self, task: &PackagingTask) -> Result<(), UploadError> {
            std::fs::remove_file(task.artifact_path()).map_err(|source| UploadError::Read {
                path: task.artifact_path().to_path_buf(),
                source,
            })?;
            Ok(())
        }
    }

    fn task_in(dir: &Path, name: &str, source: &Path) -> PackagingTask {
        PackagingTask::new(FunctionSpec {
            name: name.to_string(),
            path: Some(source.to_path_buf()),
            bucket: "bkt".to_string(),
            key_prefix: "fns".to_string(),
            output_dir: Some(dir.to_path_buf()),
        })
        .unwrap()
    }

    fn source_tree(dir: &Path) -> std::path::PathBuf {
        let source = dir.join("hello");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::write(source.join("handler.py"), "def handler(): pass\n").unwrap();
        source
    }

    #[tokio::test]
    async fn archive_failure_short_circuits_upload() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_tree(dir.path());
        let task = task_in(dir.path(), "hello", &source);

        let uploader = CountingUploader::default();
        let pipeline = Pipeline::new(NoopResolver, FailingArchiver, uploader.clone());

        let err = pipeline.run(&task).await.unwrap_err();
        assert!(matches!(err, PipelineError::Archive { .. }));
        assert_eq!(err.stage(), "archive");
        assert_eq!(uploader.calls.load(Ordering::SeqCst), 0);
        assert!(!task.artifact_path().exists());
    }

    #[tokio::test]
    async fn successful_run_cleans_up_and_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_tree(dir.path());
        let task = task_in(dir.path(), "hello", &source);

        let store = MemoryUploader::new();
        let pipeline = Pipeline::new(NoopResolver, ZipArchiver, store.clone());

        let report = pipeline.run(&task).await.unwrap();
        assert!(report.cleanup.is_clean());
        assert_eq!(report.remote_key, "fns/hello.zip");
        assert!(store.contains("bkt", "fns/hello.zip"));
        assert!(!task.artifact_path().exists());
    }

    #[tokio::test]
    async fn failed_upload_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_tree(dir.path());
        let task = task_in(dir.path(), "hello", &source);

        let pipeline = Pipeline::new(NoopResolver, ZipArchiver, RejectingUploader);

        let err = pipeline.run(&task).await.unwrap_err();
        assert!(matches!(err, PipelineError::Upload { .. }));
        assert!(!task.artifact_path().exists());
    }

    #[tokio::test]
    async fn cleanup_failure_degrades_the_report() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_tree(dir.path());
        let task = task_in(dir.path(), "hello", &source);

        let pipeline = Pipeline::new(NoopResolver, ZipArchiver, ArtifactStealingUploader);

        let report = pipeline.run(&task).await.unwrap();
        assert!(matches!(report.cleanup, CleanupStatus::Failed { .. }));
    }

    #[tokio::test]
    async fn packages_a_function_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_tree(dir.path());
        let task = task_in(dir.path(), "hello", &source);

        let store = MemoryUploader::new();
        let pipeline = Pipeline::new(PipResolver::new(), ZipArchiver, store.clone());

        let report = pipeline.run(&task).await.unwrap();
        assert_eq!(report.function, "hello");
        assert_eq!(report.remote_key, "fns/hello.zip");
        assert!(report.cleanup.is_clean());

        let object = store.object("bkt", "fns/hello.zip").unwrap();
        assert!(!object.is_empty());
        assert!(!task.artifact_path().exists());
    }
}
