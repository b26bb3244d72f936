//! Input resolution: turn a user-supplied path or URL into a [`Document`].
//!
//! Uploads are read fully into memory; pdfium and the image decoder both
//! work from byte slices. The media type is sniffed from the first bytes
//! before trusting a `Content-Type` header or the file extension, so a
//! mislabelled upload still takes the right extraction path.

use crate::config::{OcrLanguage, SummaryConfig};
use crate::document::{Document, MediaType};
use crate::error::ClarityError;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve `input` (local path or `http(s)` URL) into an in-memory document.
///
/// # Errors
/// * [`ClarityError::FileNotFound`] / [`ClarityError::PermissionDenied`] /
///   [`ClarityError::InputRead`] — local file problems
/// * [`ClarityError::DownloadFailed`] / [`ClarityError::DownloadTimeout`]
/// * [`ClarityError::InputTooLarge`] — above `config.max_input_bytes`
pub async fn resolve_input(input: &str, config: &SummaryConfig) -> Result<Document, ClarityError> {
    let (name, bytes, content_type) = if is_url(input) {
        download_url(input, config).await?
    } else {
        let (name, bytes) = read_local(Path::new(input), config.max_input_bytes).await?;
        (name, bytes, None)
    };

    check_size(&name, bytes.len() as u64, config.max_input_bytes)?;

    let media_type = detect_media_type(&name, &bytes, content_type.as_deref());
    info!("Resolved '{}': {} bytes, {}", name, bytes.len(), media_type);

    Ok(Document::new(bytes, media_type, config.ocr_language).with_name(name))
}

/// Wrap in-memory bytes as a document, detecting the media type from `name` and content.
pub fn document_from_bytes(
    name: impl Into<String>,
    bytes: Vec<u8>,
    ocr_language: OcrLanguage,
) -> Document {
    let name = name.into();
    let media_type = detect_media_type(&name, &bytes, None);
    Document::new(bytes, media_type, ocr_language).with_name(name)
}

/// Decide the media type: magic bytes, then `Content-Type`, then file extension.
pub fn detect_media_type(name: &str, head: &[u8], content_type: Option<&str>) -> MediaType {
    if head.starts_with(b"%PDF") {
        return MediaType::Pdf;
    }
    if let Ok(ImageFormat::Png | ImageFormat::Jpeg) = image::guess_format(head) {
        return MediaType::Image;
    }
    if let Some(ct) = content_type {
        let from_header = MediaType::from_mime(ct);
        if from_header.is_supported() {
            return from_header;
        }
    }
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    match MediaType::from_extension(ext) {
        MediaType::Unsupported(_) => match content_type {
            Some(ct) => MediaType::from_mime(ct),
            None => MediaType::Unsupported(if ext.is_empty() {
                "unknown".to_string()
            } else {
                ext.to_ascii_lowercase()
            }),
        },
        known => known,
    }
}

fn check_size(name: &str, size: u64, limit: u64) -> Result<(), ClarityError> {
    if size > limit {
        return Err(ClarityError::InputTooLarge {
            name: name.to_string(),
            size,
            limit,
        });
    }
    Ok(())
}

async fn read_local(path: &Path, limit: u64) -> Result<(String, Vec<u8>), ClarityError> {
    let path_buf = PathBuf::from(path);
    let metadata = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ClarityError::PermissionDenied { path: path_buf })
        }
        Err(_) => return Err(ClarityError::FileNotFound { path: path_buf }),
    };
    if !metadata.is_file() {
        return Err(ClarityError::FileNotFound { path: path_buf });
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    check_size(&name, metadata.len(), limit)?;

    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => ClarityError::PermissionDenied {
            path: path_buf.clone(),
        },
        _ => ClarityError::InputRead {
            path: path_buf.clone(),
            source: e,
        },
    })?;

    debug!("Read local file: {}", path.display());
    Ok((name, bytes))
}

async fn download_url(
    url: &str,
    config: &SummaryConfig,
) -> Result<(String, Vec<u8>, Option<String>), ClarityError> {
    info!("Downloading: {}", url);
    let secs = config.download_timeout_secs;

    let failed = |reason: String| ClarityError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let classify = |e: reqwest::Error| {
        if e.is_timeout() {
            ClarityError::DownloadTimeout {
                url: url.to_string(),
                secs,
            }
        } else {
            failed(e.to_string())
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let mut response = client.get(url).send().await.map_err(classify)?;
    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let name = filename_from_url(url);
    if let Some(len) = response.content_length() {
        check_size(&name, len, config.max_input_bytes)?;
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    // Content-Length may be absent (chunked transfer); count as we go.
    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(classify)? {
        check_size(&name, (bytes.len() + chunk.len()) as u64, config.max_input_bytes)?;
        bytes.extend_from_slice(&chunk);
    }

    info!("Downloaded {} bytes", bytes.len());
    Ok((name, bytes, content_type))
}

/// Last path segment of `url` when it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }
    "download".to_string()
}
