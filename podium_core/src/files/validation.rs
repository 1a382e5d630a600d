use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max_size} bytes)")]
    FileTooLarge { size: u64, max_size: u64 },

    #[error("Filename too long: {length} characters (max: {max_length})")]
    FilenameTooLong { length: usize, max_length: usize },

    #[error("Invalid filename: {filename}")]
    InvalidFilename { filename: String },
}

#[derive(Debug, Clone)]
pub struct FileValidationConfig {
    pub max_file_size: u64,
    pub max_filename_length: usize,
    pub max_extension_length: usize,
}

impl Default for FileValidationConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024,
            max_filename_length: 255,
            max_extension_length: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileValidator {
    config: FileValidationConfig,
}

impl FileValidator {
    pub fn new(config: FileValidationConfig) -> Self {
        Self { config }
    }

    pub fn with_max_size(max_file_size: u64) -> Self {
        Self::new(FileValidationConfig {
            max_file_size,
            ..FileValidationConfig::default()
        })
    }

    pub fn validate_upload(&self, filename: &str, size: u64) -> Result<(), ValidationError> {
        if size > self.config.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max_size: self.config.max_file_size,
            });
        }

        if filename.len() > self.config.max_filename_length {
            return Err(ValidationError::FilenameTooLong {
                length: filename.len(),
                max_length: self.config.max_filename_length,
            });
        }

        if filename.contains('\0') {
            return Err(ValidationError::InvalidFilename {
                filename: filename.replace('\0', ""),
            });
        }

        Ok(())
    }

    /// Extension to keep on the stored file: lower-cased ASCII alphanumerics
    /// only. Anything else is dropped rather than sanitised.
    pub fn stored_extension(&self, original_name: &str) -> Option<String> {
        let base = original_name.rsplit(['/', '\\']).next().unwrap_or(original_name);
        let ext = Path::new(base).extension()?.to_str()?;

        if ext.is_empty()
            || ext.len() > self.config.max_extension_length
            || !ext.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return None;
        }

        Some(ext.to_ascii_lowercase())
    }
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new(FileValidationConfig::default())
    }
}
