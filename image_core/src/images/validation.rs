use std::collections::HashSet;
use thiserror::Error;

use crate::config::StorageConfig;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max_size} bytes)")]
    FileTooLarge { size: u64, max_size: u64 },

    #[error("Invalid file type: {content_type:?} (allowed: {allowed})")]
    InvalidContentType { content_type: String, allowed: String },
}

/// Size and declared-type checks applied to an upload before anything is written.
#[derive(Debug, Clone)]
pub struct ImageValidator {
    max_file_size: u64,
    allowed_content_types: HashSet<String>,
}

impl ImageValidator {
    pub fn new(max_file_size: u64, allowed_content_types: impl IntoIterator<Item = String>) -> Self {
        Self {
            max_file_size,
            allowed_content_types: allowed_content_types.into_iter().collect(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.max_file_size, config.allowed_content_types.iter().cloned())
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Checks what the client declared, size first. `declared_size` is `None`
    /// when the part carried no length.
    pub fn validate_declared(
        &self,
        declared_size: Option<u64>,
        content_type: &str,
    ) -> Result<(), ValidationError> {
        if let Some(size) = declared_size {
            self.validate_size(size)?;
        }

        self.validate_content_type(content_type)
    }

    pub fn validate_size(&self, size: u64) -> Result<(), ValidationError> {
        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max_size: self.max_file_size,
            });
        }
        Ok(())
    }

    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        if !self.allowed_content_types.contains(content_type) {
            let mut allowed: Vec<&str> =
                self.allowed_content_types.iter().map(String::as_str).collect();
            allowed.sort_unstable();
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: allowed.join(", "),
            });
        }
        Ok(())
    }
}

impl Default for ImageValidator {
    fn default() -> Self {
        Self::from_config(&StorageConfig::default())
    }
}
