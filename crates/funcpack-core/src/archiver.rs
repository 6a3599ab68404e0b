//! Archive creation
//!
//! Compresses a function's source tree (including any resolved dependencies)
//! into a single deflate-compressed zip. This is a pure transformation with
//! one side effect, the archive file itself; no network access happens here.

use std::fs::File;
use std::io;
use std::path::Path;

use async_trait::async_trait;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ArchiveError;

/// Turns a directory tree into a single compressed artifact.
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Compress the contents of `source` into an archive at `target`.
    ///
    /// The archive is not guaranteed absent when this fails partway through;
    /// callers must not assume atomicity.
    async fn zip(&self, source: &Path, target: &Path) -> Result<(), ArchiveError>;
}

/// Archiver producing deflate-compressed zip files.
#[derive(Debug, Clone, Default)]
pub struct ZipArchiver;

#[async_trait]
impl Archiver for ZipArchiver {
    async fn zip(&self, source: &Path, target: &Path) -> Result<(), ArchiveError> {
        let source = source.to_path_buf();
        let target = target.to_path_buf();
        tokio::task::spawn_blocking(move || zip_dir(&source, &target)).await?
    }
}

fn zip_dir(source: &Path, target: &Path) -> Result<(), ArchiveError> {
    if !source.is_dir() {
        return Err(ArchiveError::MissingSource(source.to_path_buf()));
    }

    let file = File::create(target)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        if rel.as_os_str().is_empty() {
            // The source root itself.
            continue;
        }

        let name = entry_name(rel);
        if entry.file_type().is_dir() {
            writer.add_directory(name, options)?;
        } else if entry.file_type().is_file() {
            writer.start_file(name, options)?;
            let mut src = File::open(entry.path())?;
            io::copy(&mut src, &mut writer)?;
        }
    }

    writer.finish()?;
    Ok(())
}

/// Zip entry names use forward slashes whatever the host separator is.
fn entry_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
