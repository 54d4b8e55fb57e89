//! Image uploads
//!
//! Turns an image file into the data URI stored with an uploaded meme.

use crate::storage::NewUploadedMeme;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::path::Path;
use thiserror::Error;

/// Name given to uploads without a caption
pub const DEFAULT_UPLOAD_NAME: &str = "My Meme";

/// Errors that can occur while preparing an upload
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Not a supported image file: {0}")]
    UnsupportedType(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// MIME type for an image path, judged by extension
pub fn image_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// Encode bytes as a base64 data URI
pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Read an image file into a new upload record
///
/// An empty or missing `name` falls back to [`DEFAULT_UPLOAD_NAME`].
pub fn upload_from_file(path: &Path, name: Option<&str>) -> Result<NewUploadedMeme, UploadError> {
    let mime = image_mime_type(path)
        .ok_or_else(|| UploadError::UnsupportedType(path.display().to_string()))?;
    let bytes = std::fs::read(path)?;

    let name = match name.map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => DEFAULT_UPLOAD_NAME.to_string(),
    };

    tracing::debug!(path = %path.display(), mime, bytes = bytes.len(), "Encoded upload");

    let mut upload = NewUploadedMeme::new(to_data_uri(mime, &bytes), name);
    if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
        upload = upload.field("fileName", file_name);
    }
    Ok(upload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_mime_types() {
        assert_eq!(image_mime_type(Path::new("a.PNG")), Some("image/png"));
        assert_eq!(image_mime_type(Path::new("a.jpeg")), Some("image/jpeg"));
        assert_eq!(image_mime_type(Path::new("a.gif")), Some("image/gif"));
        assert_eq!(image_mime_type(Path::new("notes.txt")), None);
        assert_eq!(image_mime_type(Path::new("noext")), None);
    }

    #[test]
    fn test_data_uri() {
        assert_eq!(to_data_uri("image/png", b"hi"), "data:image/png;base64,aGk=");
    }

    #[test]
    fn test_upload_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cat.gif");
        std::fs::write(&path, b"GIF89a").unwrap();

        let upload = upload_from_file(&path, Some("  cat  ")).unwrap();
        assert_eq!(upload.name, "cat");
        assert_eq!(upload.url, "data:image/gif;base64,R0lGODlh");
        assert_eq!(upload.extra["fileName"], "cat.gif");

        let unnamed = upload_from_file(&path, Some("")).unwrap();
        assert_eq!(unnamed.name, DEFAULT_UPLOAD_NAME);
    }

    #[test]
    fn test_upload_rejects_non_images() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        assert!(matches!(
            upload_from_file(&path, None),
            Err(UploadError::UnsupportedType(_))
        ));
        assert!(matches!(
            upload_from_file(&dir.path().join("missing.png"), None),
            Err(UploadError::Io(_))
        ));
    }
}
