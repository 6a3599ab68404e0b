//! funcpack-core - Function packaging pipeline
//!
//! This crate packages a unit of deployable code (a "function") into a zip
//! archive and publishes it to an S3-compatible object store. The work is
//! driven by a four-stage pipeline: dependency resolution, archive creation,
//! remote upload, and guaranteed cleanup of the transient archive.
//!
//! Each stage is behind a capability trait ([`DependencyResolver`],
//! [`Archiver`], [`Uploader`]) so callers and tests can swap implementations;
//! [`Pipeline`] owns the sequencing, error propagation, and the cleanup
//! guarantee.

pub mod archiver;
pub mod error;
pub mod pipeline;
pub mod resolver;
pub mod task;
pub mod uploader;

pub use archiver::{Archiver, ZipArchiver};
pub use error::{ArchiveError, PipelineError, ResolveError, SpecError, UploadError};
pub use pipeline::{CleanupStatus, PackagingReport, Pipeline};
pub use resolver::{DependencyResolver, PipResolver, Resolution};
pub use task::{FunctionSpec, PackagingTask};
pub use uploader::{MemoryUploader, S3Uploader, StorageConfig, Uploader};
