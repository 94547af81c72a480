use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::Path;

/// Fallback content type for files whose extension is not recognized.
pub const UNKNOWN_CONTENT_TYPE: &str = "application/octet-stream";

/// Map an image file extension to its content type.
pub fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "avif" => Some("image/avif"),
        "svg" => Some("image/svg+xml"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}

/// A file picked or dropped by the user, before validation.
#[derive(Clone)]
pub struct SelectedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl Debug for SelectedFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SelectedFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size_bytes", &self.data.len())
            .finish()
    }
}

impl SelectedFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk, deriving the content type from its extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let data = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        let content_type = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(content_type_for_extension)
            .unwrap_or(UNKNOWN_CONTENT_TYPE);

        Ok(Self::new(file_name, content_type, data))
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Lowercased extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }
}

/// Displayable `data:` URI derived from a selected file. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewUri(String);

impl PreviewUri {
    pub fn new(uri: String) -> Self {
        Self(uri)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Media type declared in the URI header (`data:<type>;base64,`).
    pub fn media_type(&self) -> Option<&str> {
        self.0
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
    }
}

/// An accepted file together with its preview.
///
/// Owned by the diagnosis session; dropped on reset, on a new selection or after a
/// successful submission.
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    file: SelectedFile,
    preview: PreviewUri,
}

impl UploadCandidate {
    pub fn new(file: SelectedFile, preview: PreviewUri) -> Self {
        Self { file, preview }
    }

    pub fn file(&self) -> &SelectedFile {
        &self.file
    }

    pub fn preview(&self) -> &PreviewUri {
        &self.preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_content_type_for_extension() {
        assert_eq!(content_type_for_extension("JPG"), Some("image/jpeg"));
        assert_eq!(content_type_for_extension("webp"), Some("image/webp"));
        assert_eq!(content_type_for_extension("pdf"), None);
    }

    #[test]
    fn test_from_path_reads_file() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"not really a png").unwrap();

        let selected = SelectedFile::from_path(file.path()).unwrap();
        assert_eq!(selected.content_type, "image/png");
        assert_eq!(selected.size_bytes(), 16);
        assert_eq!(selected.extension().as_deref(), Some("png"));
    }

    #[test]
    fn test_from_path_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        let selected = SelectedFile::from_path(file.path()).unwrap();
        assert_eq!(selected.content_type, UNKNOWN_CONTENT_TYPE);
    }

    #[test]
    fn test_preview_media_type() {
        let preview = PreviewUri::new("data:image/png;base64,AAAA".to_string());
        assert_eq!(preview.media_type(), Some("image/png"));
        assert_eq!(PreviewUri::new("blob:xyz".to_string()).media_type(), None);
    }
}
