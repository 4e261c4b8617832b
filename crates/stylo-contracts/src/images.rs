use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const ACCEPTED_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp"];

/// Persisted form of a source image: raw base64 payload plus its MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    pub base64: String,
    pub mime_type: String,
}

/// An image held in the current session. Never persisted directly; history
/// items keep only the [`ImagePayload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub base64: String,
    pub mime_type: String,
    pub source: Option<PathBuf>,
}

impl UploadedImage {
    pub fn new(base64: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            base64: base64.into(),
            mime_type: mime_type.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn payload(&self) -> ImagePayload {
        ImagePayload {
            base64: self.base64.clone(),
            mime_type: self.mime_type.clone(),
        }
    }

    pub fn source_label(&self) -> String {
        self.source
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("<{}>", self.mime_type))
    }
}

impl From<&ImagePayload> for UploadedImage {
    fn from(payload: &ImagePayload) -> Self {
        Self::new(payload.base64.clone(), payload.mime_type.clone())
    }
}

pub fn is_accepted_mime(mime: &str) -> bool {
    let normalized = mime.trim().to_ascii_lowercase();
    ACCEPTED_MIME_TYPES.iter().any(|value| *value == normalized)
}

pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

pub fn extension_for_mime(mime: &str) -> &'static str {
    let lowered = mime.trim().to_ascii_lowercase();
    if lowered.contains("jpeg") || lowered.contains("jpg") {
        return "jpg";
    }
    if lowered.contains("webp") {
        return "webp";
    }
    "png"
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{extension_for_mime, is_accepted_mime, mime_for_path, ImagePayload, UploadedImage};

    #[test]
    fn accepts_only_png_jpeg_webp() {
        assert!(is_accepted_mime("image/png"));
        assert!(is_accepted_mime(" IMAGE/JPEG "));
        assert!(is_accepted_mime("image/webp"));
        assert!(!is_accepted_mime("image/gif"));
        assert!(!is_accepted_mime("text/plain"));
    }

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_for_path(Path::new("a/b.JPG")), Some("image/jpeg"));
        assert_eq!(mime_for_path(Path::new("shot.webp")), Some("image/webp"));
        assert_eq!(mime_for_path(Path::new("notes.txt")), None);
        assert_eq!(extension_for_mime("image/jpeg"), "jpg");
        assert_eq!(extension_for_mime("image/png"), "png");
    }

    #[test]
    fn payload_serializes_with_camel_case_mime() -> anyhow::Result<()> {
        let payload = UploadedImage::new("QUJD", "image/png").payload();
        let value = serde_json::to_value(&payload)?;
        assert_eq!(value["mimeType"], "image/png");
        let back: ImagePayload = serde_json::from_value(value)?;
        assert_eq!(UploadedImage::from(&back).base64, "QUJD");
        Ok(())
    }
}
