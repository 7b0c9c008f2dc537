//! Data module - store staging, extraction and preparation

mod ordinal;
mod preparer;
mod store;
mod upload;

pub use ordinal::{PainDuration, PainIntensity};
pub use preparer::{prepare, EnrichedConsultation, EnrichedTable, PrepareError};
pub use store::StoreError;
pub use upload::{StagedStore, UploadError};

#[cfg(test)]
pub(crate) use store::test_store;
