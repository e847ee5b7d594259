//! Error types.
//!
//! Domain failures get their own `thiserror` enums so callers can tell a
//! rejected upload apart from a storage problem. Command handlers wrap
//! them in `anyhow` with context.

use thiserror::Error;

/// Why an image was not accepted for analysis.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Please select a valid image file (JPG, JPEG, PNG)")]
    UnsupportedType { mime_type: String },

    #[error("File size too large. Please select an image smaller than {}.", format_limit(.max_bytes))]
    TooLarge { size: u64, max_bytes: u64 },

    #[error("Failed to read image {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// `5MB`, `512KB` or `300 bytes`.
fn format_limit(bytes: &u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    match *bytes {
        b if b >= MB => format!("{}MB", b / MB),
        b if b >= KB => format!("{}KB", b / KB),
        b => format!("{} bytes", b),
    }
}

/// Failures of the result store and its backing storage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode analysis records: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("An analysis with id {0} already exists")]
    DuplicateId(String),
}

/// Failures of the simulated analysis run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("An analysis is already in progress")]
    Busy,

    #[error("No image selected for analysis")]
    NoImage,

    #[error(transparent)]
    Store(#[from] StoreError),
}
