//! Upload intake for the diagnosis workflow
//!
//! Validation of user-selected images and preview encoding.

pub mod preview;
pub mod validator;

pub use preview::{EncodingError, PreviewEncoder};
pub use validator::{ImageValidator, ValidationError};

use leafguard_core::LeafguardConfig;

/// Build the validator configured for this deployment.
pub fn validator_from_config(config: &LeafguardConfig) -> ImageValidator {
    ImageValidator::new(
        config.max_file_size_bytes,
        config.allowed_content_types.clone(),
    )
}

/// Build the preview encoder configured for this deployment.
pub fn preview_encoder_from_config(config: &LeafguardConfig) -> PreviewEncoder {
    PreviewEncoder::new(config.preview_max_dimension)
}
