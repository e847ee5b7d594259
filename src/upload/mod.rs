//! Image upload validation.
//!
//! An image is accepted when its MIME type is on the allow-list and its
//! size does not exceed the configured ceiling. Accepted images are
//! turned into a data URI, which is what the analysis record stores.

use crate::error::UploadError;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::path::Path;
use tracing::{debug, info};

/// Default size ceiling (5 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// What an upload must satisfy.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Accepted MIME types.
    pub allowed_types: Vec<String>,
    /// Largest accepted file, inclusive.
    pub max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            allowed_types: vec!["image/jpeg", "image/jpg", "image/png"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

impl From<&crate::config::UploadConfig> for UploadPolicy {
    fn from(config: &crate::config::UploadConfig) -> Self {
        Self {
            allowed_types: config.allowed_types.clone(),
            max_bytes: config.max_bytes,
        }
    }
}

impl UploadPolicy {
    /// Check type and size without touching the file contents.
    pub fn check(&self, mime_type: &str, size: u64) -> Result<(), UploadError> {
        if !self.allowed_types.iter().any(|t| t == mime_type) {
            return Err(UploadError::UnsupportedType {
                mime_type: mime_type.to_string(),
            });
        }

        if size > self.max_bytes {
            return Err(UploadError::TooLarge {
                size,
                max_bytes: self.max_bytes,
            });
        }

        Ok(())
    }
}

/// An accepted image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub size: u64,
    /// `data:<mime>;base64,<payload>`
    pub data_uri: String,
}

/// MIME type implied by a file extension.
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Encode raw bytes as a data URI.
pub fn to_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Validate the image at `path` and load it.
///
/// Type and size are checked from the extension and file metadata
/// before the contents are read.
pub fn load_image(path: &Path, policy: &UploadPolicy) -> Result<ImageUpload, UploadError> {
    let io_err = |source| UploadError::Io {
        path: path.display().to_string(),
        source,
    };

    let mime_type = mime_type_for(path);
    let metadata = std::fs::metadata(path).map_err(io_err)?;
    if !metadata.is_file() {
        return Err(io_err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }

    debug!(
        "Checking {} ({}, {} bytes)",
        path.display(),
        mime_type,
        metadata.len()
    );
    policy.check(mime_type, metadata.len())?;

    let bytes = std::fs::read(path).map_err(io_err)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    info!("Accepted image {} ({} bytes)", file_name, bytes.len());

    Ok(ImageUpload {
        file_name,
        mime_type: mime_type.to_string(),
        size: bytes.len() as u64,
        data_uri: to_data_uri(mime_type, &bytes),
    })
}
