//! Upload Session
//! One upload, one synchronous pass: stage, open, prepare, summarize.

use crate::charts::DashboardSummary;
use crate::data::{prepare, PrepareError, StagedStore, StoreError, UploadError};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Upload rejected: {0}")]
    Upload(#[from] UploadError),
    #[error("Could not read database: {0}")]
    Store(#[from] StoreError),
    #[error("Could not prepare consultations: {0}")]
    Prepare(#[from] PrepareError),
}

/// What the dashboard shows for one uploaded store.
#[derive(Debug, Clone)]
pub struct LoadedSession {
    pub file_name: String,
    pub size_bytes: u64,
    pub summary: DashboardSummary,
}

pub struct Session;

impl Session {
    /// Load a store picked from disk.
    pub fn load(path: &Path) -> Result<LoadedSession, SessionError> {
        let staged = StagedStore::from_path(path)?;
        Self::run(staged)
    }

    /// Load a store presented as a byte stream with a reported size.
    pub fn load_stream<R: Read>(
        file_name: &str,
        reported_size: u64,
        reader: R,
    ) -> Result<LoadedSession, SessionError> {
        let staged = StagedStore::stage(file_name, reported_size, reader)?;
        Self::run(staged)
    }

    /// The staged copy drops at the end of this call on every path.
    fn run(staged: StagedStore) -> Result<LoadedSession, SessionError> {
        let store = staged.open()?;
        let table = prepare(&store)?;
        let summary = DashboardSummary::from_table(&table);

        tracing::info!(
            file = staged.file_name(),
            consultations = summary.total_consultations,
            columns = table.dataframe().width(),
            unmatched_users = summary.unmatched_users,
            "Session loaded"
        );

        Ok(LoadedSession {
            file_name: staged.file_name().to_string(),
            size_bytes: staged.size(),
            summary,
        })
    }
}
