//! Preview encoder - turns an accepted file into a displayable data URI

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{GenericImageView, ImageFormat, ImageReader};
use leafguard_core::models::{PreviewUri, SelectedFile};
use leafguard_core::LeafguardError;
use std::io::Cursor;

#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("Could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Could not read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("Preview task failed: {0}")]
    Task(String),
}

impl From<EncodingError> for LeafguardError {
    fn from(err: EncodingError) -> Self {
        LeafguardError::EncodingFailed(err.to_string())
    }
}

/// Builds previews for accepted files.
///
/// The file is always decoded so corrupt data is caught here rather than at submission.
/// Images whose longest edge exceeds `max_dimension` are re-encoded as a PNG thumbnail;
/// everything else is embedded as-is under its declared content type.
#[derive(Debug, Clone, Copy)]
pub struct PreviewEncoder {
    max_dimension: u32,
}

impl PreviewEncoder {
    /// `max_dimension` of 0 disables thumbnailing.
    pub fn new(max_dimension: u32) -> Self {
        Self { max_dimension }
    }

    pub fn encode(&self, file: &SelectedFile) -> Result<PreviewUri, EncodingError> {
        let reader = ImageReader::new(Cursor::new(file.data.as_ref())).with_guessed_format()?;
        let img = reader.decode()?;
        let (width, height) = img.dimensions();

        if self.max_dimension > 0 && width.max(height) > self.max_dimension {
            let thumbnail = img.thumbnail(self.max_dimension, self.max_dimension);
            let mut buffer = Vec::new();
            thumbnail.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;

            tracing::debug!(
                file_name = %file.file_name,
                original = ?(width, height),
                thumbnail = ?thumbnail.dimensions(),
                "Encoded downscaled preview"
            );
            return Ok(data_uri("image/png", &buffer));
        }

        let media_type = file
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        Ok(data_uri(&media_type, &file.data))
    }

    /// Encode on the blocking pool; decoding a large photo is CPU bound.
    pub async fn encode_async(&self, file: SelectedFile) -> Result<PreviewUri, EncodingError> {
        let encoder = *self;
        tokio::task::spawn_blocking(move || encoder.encode(&file))
            .await
            .map_err(|e| EncodingError::Task(e.to_string()))?
    }
}

fn data_uri(media_type: &str, data: &[u8]) -> PreviewUri {
    PreviewUri::new(format!("data:{};base64,{}", media_type, STANDARD.encode(data)))
}
