//! The uploaded document as seen by the pipeline.

use crate::config::OcrLanguage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Declared media type of an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Pdf,
    Image,
    /// Anything else; carries the declared type so the error can name it.
    Unsupported(String),
}

impl MediaType {
    /// Map a MIME type (`application/pdf`, `image/png`, …) to a media type.
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        if mime == "application/pdf" {
            MediaType::Pdf
        } else if mime.starts_with("image/") {
            MediaType::Image
        } else {
            MediaType::Unsupported(mime)
        }
    }

    /// Map a file extension (without the dot) to a media type.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => MediaType::Pdf,
            "png" | "jpg" | "jpeg" => MediaType::Image,
            other => MediaType::Unsupported(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MediaType::Pdf => "pdf",
            MediaType::Image => "image",
            MediaType::Unsupported(s) => s,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, MediaType::Unsupported(_))
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw upload plus the parameters that steer extraction.
///
/// Bytes are reference-counted so blocking backends can take a handle onto
/// the blocking thread pool without copying the upload.
#[derive(Debug, Clone)]
pub struct Document {
    /// File name or URL, used in logs and the report.
    pub name: String,
    pub bytes: Arc<[u8]>,
    pub media_type: MediaType,
    pub ocr_language: OcrLanguage,
}

impl Document {
    pub fn new(bytes: impl Into<Arc<[u8]>>, media_type: MediaType, ocr_language: OcrLanguage) -> Self {
        Self {
            name: "upload".to_string(),
            bytes: bytes.into(),
            media_type,
            ocr_language,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
