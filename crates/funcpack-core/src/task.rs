//! Packaging task construction
//!
//! A [`PackagingTask`] is built exactly once from a validated
//! [`FunctionSpec`], executed via the pipeline entry point, and discarded.
//! All derived paths and keys are resolved here, up front, and never change
//! afterwards.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::SpecError;

/// Declarative description of a function to package.
///
/// The struct deserializes from JSON or similar config sources; unknown
/// fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionSpec {
    /// Logical identity of the function. Must not be empty.
    pub name: String,

    /// Source directory. Defaults to `name`.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Destination bucket in the object store.
    pub bucket: String,

    /// Key prefix under which the artifact is stored.
    #[serde(default)]
    pub key_prefix: String,

    /// Directory for the transient archive. Defaults to the working
    /// directory.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

/// A single unit of packaging work.
///
/// The source tree is read-only to the pipeline; the archive at
/// `artifact_path` exists only between successful archive creation and the
/// end of the run.
#[derive(Debug, Clone)]
pub struct PackagingTask {
    function_name: String,
    source_path: PathBuf,
    artifact_path: PathBuf,
    remote_bucket: String,
    remote_key: String,
}

impl PackagingTask {
    /// Build a task from a spec, resolving all derived paths.
    ///
    /// The archive lands at `{output_dir}/{name}.zip` and is stored remotely
    /// under `{key_prefix}/{name}.zip`. The remote key is deterministic;
    /// there is no collision avoidance beyond it.
    pub fn new(spec: FunctionSpec) -> Result<Self, SpecError> {
        let FunctionSpec {
            name,
            path,
            bucket,
            key_prefix,
            output_dir,
        } = spec;

        if name.is_empty() {
            return Err(SpecError::EmptyName);
        }

        let artifact_name = format!("{name}.zip");
        let artifact_path = match output_dir {
            Some(dir) => dir.join(&artifact_name),
            None => PathBuf::from(&artifact_name),
        };
        let source_path = path.unwrap_or_else(|| PathBuf::from(&name));

        Ok(Self {
            remote_key: format!("{key_prefix}/{artifact_name}"),
            function_name: name,
            source_path,
            artifact_path,
            remote_bucket: bucket,
        })
    }

    /// Logical identifier of the function being packaged.
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// Source tree the archive is built from.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Where the transient archive is written.
    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    /// Destination bucket.
    pub fn remote_bucket(&self) -> &str {
        &self.remote_bucket
    }

    /// Key the artifact is stored under in the object store.
    pub fn remote_key(&self) -> &str {
        &self.remote_key
    }

    /// Directory the dependency resolver installs into.
    ///
    /// Not removed by pipeline cleanup; only the transient archive is.
    pub fn dependency_dir(&self) -> PathBuf {
        PathBuf::from(&self.function_name)
    }
}
