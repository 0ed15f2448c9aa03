use thiserror::Error;

/// Every failure the template registry can report to a caller.
///
/// Validation variants are raised before anything touches the disk.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid template type: {0}")]
    InvalidCategory(String),
    #[error("Display name is required")]
    MissingDisplayName,
    #[error("No file uploaded")]
    MissingFile,
    #[error("Only .zip files are allowed")]
    UnsupportedExtension,
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),
    #[error("Template not found")]
    NotFound,
    #[error("Failed to save file: {0}")]
    Storage(String),
    #[error("Failed to save metadata: {0}")]
    Metadata(String),
}

impl ServiceError {
    pub fn storage(err: impl std::fmt::Display) -> Self { Self::Storage(err.to_string()) }
    pub fn metadata(err: impl std::fmt::Display) -> Self { Self::Metadata(err.to_string()) }

    /// True for errors caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(_) | Self::Metadata(_))
    }
}
