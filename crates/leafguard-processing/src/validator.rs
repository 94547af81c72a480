use leafguard_core::models::{content_type_for_extension, Notice, SelectedFile};
use leafguard_core::LeafguardError;

/// Reasons a selected file is rejected before any preview or network work
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Content type {content_type} does not match extension '{extension}'")]
    ExtensionMismatch {
        extension: String,
        content_type: String,
    },

    #[error("Empty file")]
    EmptyFile,
}

impl ValidationError {
    /// Notification describing which constraint failed.
    pub fn to_notice(&self) -> Notice {
        match self {
            ValidationError::FileTooLarge { max, .. } => Notice::error(
                "File Too Large",
                format!("Please upload an image smaller than {}.", format_megabytes(*max)),
            ),
            ValidationError::InvalidContentType { allowed, .. } => Notice::error(
                "Invalid File Type",
                format!("Please upload a {} image.", describe_types(allowed)),
            ),
            ValidationError::ExtensionMismatch { extension, .. } => Notice::error(
                "Invalid File Type",
                format!("The file content does not match its .{} extension.", extension),
            ),
            ValidationError::EmptyFile => {
                Notice::error("Empty File", "The selected file contains no data.")
            }
        }
    }
}

impl From<ValidationError> for LeafguardError {
    fn from(err: ValidationError) -> Self {
        LeafguardError::ValidationRejected(err.to_notice().description)
    }
}

/// Image validator
///
/// Pure synchronous accept/reject check against a content-type allow-list and a size bound.
#[derive(Debug, Clone)]
pub struct ImageValidator {
    max_file_size: usize,
    allowed_content_types: Vec<String>,
}

impl ImageValidator {
    pub fn new(max_file_size: usize, allowed_content_types: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_content_types: allowed_content_types
                .into_iter()
                .map(|ct| ct.trim().to_lowercase())
                .collect(),
        }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.allowed_content_types
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
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

    /// Validate content type (case-insensitive, parameters ignored)
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = normalize_content_type(content_type);

        if !self.allowed_content_types.iter().any(|ct| ct == &normalized) {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }

    /// Validate that the declared content type agrees with a known file extension.
    ///
    /// Files without an extension, or with an unknown one, are not cross-checked.
    pub fn validate_extension_content_type_match(
        &self,
        file: &SelectedFile,
    ) -> Result<(), ValidationError> {
        let Some(extension) = file.extension() else {
            return Ok(());
        };
        let Some(expected) = content_type_for_extension(&extension) else {
            tracing::debug!(
                extension = %extension,
                content_type = %file.content_type,
                "Unknown extension, skipping content type cross-check"
            );
            return Ok(());
        };

        if normalize_content_type(&file.content_type) != expected {
            return Err(ValidationError::ExtensionMismatch {
                extension,
                content_type: file.content_type.clone(),
            });
        }

        Ok(())
    }

    /// Validate all aspects of a selected file
    pub fn validate(&self, file: &SelectedFile) -> Result<(), ValidationError> {
        self.validate_file_size(file.size_bytes())?;
        self.validate_content_type(&file.content_type)?;
        self.validate_extension_content_type_match(file)?;
        Ok(())
    }
}

fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

fn format_megabytes(bytes: usize) -> String {
    const MB: usize = 1024 * 1024;
    if bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    }
}

fn describe_types(content_types: &[String]) -> String {
    let names: Vec<String> = content_types
        .iter()
        .map(|ct| ct.trim_start_matches("image/").to_uppercase())
        .collect();
    match names.as_slice() {
        [] => "supported".to_string(),
        [only] => only.clone(),
        [rest @ .., last] => format!("{}, or {}", rest.join(", "), last),
    }
}
