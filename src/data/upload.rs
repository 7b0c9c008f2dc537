//! Upload Staging Module
//! Admission control and scoped temporary copies of uploaded stores.

use crate::config;
use crate::data::store::{Store, StoreError};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("File is {size} bytes; the upload limit is {limit} bytes")]
    SizeLimit { size: u64, limit: u64 },
    #[error("Unsupported file type: {0}")]
    UnsupportedExtension(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Reject an upload by name and reported size before touching its bytes.
pub fn admit(file_name: &str, reported_size: u64, limit: u64) -> Result<(), UploadError> {
    if reported_size > limit {
        return Err(UploadError::SizeLimit {
            size: reported_size,
            limit,
        });
    }
    if !config::has_accepted_extension(file_name) {
        return Err(UploadError::UnsupportedExtension(file_name.to_string()));
    }
    Ok(())
}

/// Temporary on-disk copy of an uploaded store.
///
/// The file is deleted when this value drops.
pub struct StagedStore {
    file: NamedTempFile,
    file_name: String,
    size: u64,
}

impl StagedStore {
    /// Stage a file picked from disk.
    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let reported_size = std::fs::metadata(path)?.len();

        // Admit before opening so oversized files are never read.
        admit(&file_name, reported_size, config::MAX_UPLOAD_BYTES)?;
        let reader = File::open(path)?;
        Self::stage(&file_name, reported_size, reader)
    }

    /// Stage an upload presented as a byte stream with a reported size.
    pub fn stage<R: Read>(
        file_name: &str,
        reported_size: u64,
        reader: R,
    ) -> Result<Self, UploadError> {
        Self::stage_with_limit(file_name, reported_size, reader, config::MAX_UPLOAD_BYTES)
    }

    pub(crate) fn stage_with_limit<R: Read>(
        file_name: &str,
        reported_size: u64,
        reader: R,
        limit: u64,
    ) -> Result<Self, UploadError> {
        admit(file_name, reported_size, limit)?;

        let mut file = tempfile::Builder::new()
            .prefix("dolorfarma-")
            .suffix(".sqlite3")
            .tempfile()?;

        // Bounded copy: a stream longer than it claimed is still rejected.
        let copied = io::copy(&mut reader.take(limit + 1), &mut file)?;
        if copied > limit {
            return Err(UploadError::SizeLimit {
                size: copied,
                limit,
            });
        }
        file.flush()?;

        tracing::info!(
            file = file_name,
            bytes = copied,
            staged = %file.path().display(),
            "Staged uploaded store"
        );

        Ok(Self {
            file,
            file_name: file_name.to_string(),
            size: copied,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Open the staged copy as a read-only store.
    pub fn open(&self) -> Result<Store, StoreError> {
        Store::open(self.path())
    }
}

impl Drop for StagedStore {
    fn drop(&mut self) {
        tracing::debug!(staged = %self.file.path().display(), "Removing staged store");
    }
}
