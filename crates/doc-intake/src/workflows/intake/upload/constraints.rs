use std::collections::BTreeSet;

use crate::workflows::intake::domain::FileUpload;
use crate::workflows::intake::error::ValidationError;

pub const DEFAULT_ALLOWED_EXTENSIONS: [&str; 6] = ["pdf", "jpg", "jpeg", "png", "doc", "docx"];
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Local limits applied to every file before it is transmitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConstraints {
    allowed_extensions: BTreeSet<String>,
    max_bytes: u64,
}

impl Default for UploadConstraints {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_MAX_UPLOAD_BYTES)
    }
}

impl UploadConstraints {
    /// Extensions are normalized to lowercase without a leading dot; blanks are dropped.
    pub fn new<I, S>(allowed_extensions: I, max_bytes: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_extensions = allowed_extensions
            .into_iter()
            .map(|extension| {
                extension
                    .as_ref()
                    .trim()
                    .trim_start_matches('.')
                    .to_ascii_lowercase()
            })
            .filter(|extension| !extension.is_empty())
            .collect();

        Self {
            allowed_extensions,
            max_bytes,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn allowed_extensions(&self) -> impl Iterator<Item = &str> {
        self.allowed_extensions.iter().map(String::as_str)
    }

    pub fn allows_extension(&self, extension: &str) -> bool {
        self.allowed_extensions
            .contains(&extension.trim_start_matches('.').to_ascii_lowercase())
    }

    fn allowed_summary(&self) -> String {
        self.allowed_extensions
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Check size and extension; returns the normalized extension on success.
    pub fn check(&self, file: &FileUpload) -> Result<String, ValidationError> {
        let size = file.size();
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }
        if size > self.max_bytes {
            return Err(ValidationError::FileTooLarge {
                size,
                limit: self.max_bytes,
            });
        }

        let extension = file
            .extension()
            .ok_or_else(|| ValidationError::MissingExtension {
                allowed: self.allowed_summary(),
            })?;
        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::DisallowedExtension {
                extension,
                allowed: self.allowed_summary(),
            });
        }

        Ok(extension)
    }
}
