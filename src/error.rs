//! Error types for the clarity-forge library.
//!
//! Two error types reflect two layers of failure:
//!
//! * [`ClarityError`] — **Terminal** for the current document: the upload
//!   could not be read, no extraction strategy produced usable text, the model
//!   could not be reached after every retry, or its output was not the JSON
//!   record we asked for. Returned as `Err(ClarityError)` from the top-level
//!   `summarize*` functions and from each stage.
//!
//! * [`TransportError`] — a single failed HTTP exchange with the generation
//!   endpoint. The model client inspects [`TransportError::is_retryable`] to
//!   decide between backing off and giving up; only the final outcome is
//!   surfaced as a [`ClarityError`].
//!
//! No error here is fatal to the hosting process. The CLI prints the message
//! and exits non-zero; library callers get a value they can display.

use std::path::PathBuf;
use thiserror::Error;

/// All terminal errors returned by the clarity-forge library.
#[derive(Debug, Error)]
pub enum ClarityError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but reading its bytes failed (corrupt or unreadable upload).
    #[error("Failed to read uploaded file '{path}': {source}\nPlease ensure it is not corrupted.")]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// Input is larger than the configured upload limit.
    #[error("Input '{name}' is {size} bytes, above the {limit}-byte limit")]
    InputTooLarge { name: String, size: u64, limit: u64 },

    /// Media type is neither a PDF nor an image.
    #[error("Unsupported file type '{media_type}'. Supported: PDF, PNG, JPEG.")]
    UnsupportedMediaType { media_type: String },

    // ── Extraction errors ────────────────────────────────────────────────
    /// Every extraction strategy for this media type was rejected.
    #[error("Text extraction failed for {media_type} input: {attempts}")]
    ExtractionFailed { media_type: String, attempts: String },

    // ── Model errors ─────────────────────────────────────────────────────
    /// The generation endpoint kept failing at the transport level.
    #[error("Generation API failed after {attempts} attempts: {last_error}")]
    TransportExhausted { attempts: u32, last_error: String },

    /// The endpoint answered 2xx but the body was not usable.
    #[error("Unexpected API response: {detail}")]
    UnexpectedResponse { detail: String },

    // ── Structuring errors ───────────────────────────────────────────────
    /// There was no text to structure.
    #[error("No text for JSON extraction")]
    EmptyText,

    /// The model output was not a JSON object with the mandatory fields.
    ///
    /// `raw` carries the model's output unchanged so it can be shown to the
    /// user for diagnosis.
    #[error("Failed to parse model output as JSON: {reason}\n--- raw model output ---\n{raw}")]
    StructuringFailed { reason: String, raw: String },

    // ── I/O errors ───────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClarityError {
    /// Short stage label used in logs and the CLI error line.
    pub fn stage(&self) -> &'static str {
        match self {
            ClarityError::FileNotFound { .. }
            | ClarityError::PermissionDenied { .. }
            | ClarityError::InputRead { .. }
            | ClarityError::DownloadFailed { .. }
            | ClarityError::DownloadTimeout { .. }
            | ClarityError::InputTooLarge { .. }
            | ClarityError::UnsupportedMediaType { .. } => "input",
            ClarityError::ExtractionFailed { .. } => "extraction",
            ClarityError::TransportExhausted { .. } | ClarityError::UnexpectedResponse { .. } => {
                "model"
            }
            ClarityError::EmptyText | ClarityError::StructuringFailed { .. } => "structuring",
            ClarityError::OutputWriteFailed { .. } => "output",
            ClarityError::InvalidConfig(_) => "config",
            ClarityError::Internal(_) => "internal",
        }
    }
}

/// A single failed exchange with the generation endpoint.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection refused, DNS failure, TLS error, reset…
    #[error("network error: {0}")]
    Network(String),

    /// The request did not complete within the per-request timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Non-2xx HTTP status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// A 2xx response whose body could not be decoded as JSON.
    #[error("invalid response body: {0}")]
    InvalidBody(String),
}

impl TransportError {
    /// Whether backing off and re-sending the same request can help.
    ///
    /// Network, timeout and status failures are retried. A 2xx answer with an
    /// undecodable body is a protocol problem, so it is not.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::InvalidBody(_))
    }
}
