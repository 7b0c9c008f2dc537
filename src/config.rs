//! Application-level constants.

/// Application name, used for the window title and export file names.
pub const APP_NAME: &str = "DolorFarma Dashboard";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upload ceiling: 200 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 200 * 1024 * 1024;

/// File extensions accepted by the upload dialog and admission check.
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["sqlite3", "sqlite", "db"];

/// Physical relation names in the uploaded store.
pub const CONSULTATIONS_TABLE: &str = "main_consulta";
pub const USERS_TABLE: &str = "auth_user";

/// Consultation columns consumed by the preparer.
pub const COL_USER_REF: &str = "user_id";
pub const COL_PATHOLOGY: &str = "patologia";
pub const COL_INTENSITY: &str = "intensidad";
pub const COL_DURATION: &str = "duracion";
pub const COL_DATE: &str = "fecha";

/// User columns kept after projection.
pub const COL_USER_ID: &str = "id";
pub const COL_USERNAME: &str = "username";
pub const COL_EMAIL: &str = "email";
pub const COL_DATE_JOINED: &str = "date_joined";
/// Appended to a user column whose name a consultation column already uses.
pub const USER_COLUMN_SUFFIX: &str = "_user";

/// Derived columns.
pub const COL_INTENSITY_NUMERIC: &str = "intensity_numeric";
pub const COL_DURATION_NUMERIC: &str = "duration_numeric";
pub const COL_DATE_ONLY: &str = "date_only";

/// Default `tracing` filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,dolorfarma_dashboard=debug,wgpu=warn,eframe=warn"
}

/// Whether a file name carries one of the accepted extensions.
pub fn has_accepted_extension(file_name: &str) -> bool {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ACCEPTED_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        })
        .unwrap_or(false)
}
