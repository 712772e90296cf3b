//! Input file validation.
//!
//! Files are checked before they become queue items; a rejected file never
//! enters the queue at all.

use std::path::Path;

use shrinkray_core::constants::{MAX_FILE_SIZE, SUPPORTED_INPUT_EXTENSIONS, SUPPORTED_INPUT_TYPES};

/// Validation errors for submitted files
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Empty file")]
    EmptyFile,
}

/// Image file validator
///
/// Checks size, declared media type, and extension against a configured
/// allow-list without touching the file contents.
pub struct FileValidator {
    max_file_size: u64,
    allowed_media_types: Vec<String>,
    allowed_extensions: Vec<String>,
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new(
            MAX_FILE_SIZE,
            SUPPORTED_INPUT_TYPES.iter().map(|s| s.to_string()).collect(),
            SUPPORTED_INPUT_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }
}

impl FileValidator {
    pub fn new(
        max_file_size: u64,
        allowed_media_types: Vec<String>,
        allowed_extensions: Vec<String>,
    ) -> Self {
        Self {
            max_file_size,
            allowed_media_types,
            allowed_extensions,
        }
    }

    /// Validate file size
    pub fn validate_size(&self, size: u64) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }
        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }
        Ok(())
    }

    /// Validate declared media type
    pub fn validate_media_type(&self, media_type: &str) -> Result<(), ValidationError> {
        let normalized = media_type.to_lowercase();
        if !self.allowed_media_types.iter().any(|t| t == &normalized) {
            return Err(ValidationError::InvalidContentType {
                content_type: media_type.to_string(),
                allowed: self.allowed_media_types.clone(),
            });
        }
        Ok(())
    }

    /// Validate file extension
    pub fn validate_extension(&self, filename: &str) -> Result<(), ValidationError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| ValidationError::InvalidFilename(filename.to_string()))?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }
        Ok(())
    }

    /// Run all checks for one candidate file.
    pub fn validate(
        &self,
        filename: &str,
        media_type: &str,
        size: u64,
    ) -> Result<(), ValidationError> {
        self.validate_media_type(media_type)?;
        self.validate_size(size)?;
        self.validate_extension(filename)?;
        Ok(())
    }
}
