//! Error types for the packaging pipeline
//!
//! One taxonomy per component, plus [`PipelineError`] which wraps a component
//! failure with the stage it happened in. All of these are terminal for the
//! task; nothing here is retried.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Errors rejecting a function spec at task construction.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("function name must not be empty")]
    EmptyName,
}

/// Errors from dependency resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The installer ran and exited non-zero; its stderr is embedded.
    #[error("installer `{installer}` exited with {status}: {stderr}")]
    Installer {
        installer: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Errors while building the archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("source directory not found: {0}")]
    MissingSource(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Errors while transmitting the artifact to the object store.
///
/// A failed upload leaves the remote object in an undefined state; the store
/// may hold nothing, a previous version, or a partial write, depending on its
/// own semantics.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("cannot read artifact {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid object store credentials: {0}")]
    Credentials(String),

    #[error("object store error: {0}")]
    Store(#[from] s3::error::S3Error),

    #[error("object store rejected upload with HTTP status {0}")]
    Rejected(u16),
}

/// A pipeline stage failure, tagged with the stage and the function it hit.
///
/// The first failing stage aborts the run; later stages never execute.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("dependency resolution failed for `{function}`: {source}")]
    Resolve {
        function: String,
        source: ResolveError,
    },

    #[error("archiving failed for `{function}`: {source}")]
    Archive {
        function: String,
        source: ArchiveError,
    },

    #[error("upload failed for `{function}`: {source}")]
    Upload {
        function: String,
        source: UploadError,
    },
}

impl PipelineError {
    /// Name of the stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Resolve { .. } => "resolve",
            PipelineError::Archive { .. } => "archive",
            PipelineError::Upload { .. } => "upload",
        }
    }
}
