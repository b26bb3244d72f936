//! Configuration types for document summarization.
//!
//! All pipeline behaviour is controlled through [`SummaryConfig`], built via
//! its [`SummaryConfigBuilder`]. Every knob lives in one struct so a single
//! value can be shared between the extractor, the model client and the
//! structuring agent, and printed (credential redacted) when debugging a run.

use crate::cache::{InMemoryCache, SharedCache};
use crate::error::ClarityError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Default generation endpoint (Gemini `generateContent`).
pub const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";

/// Environment variable holding the generation credential.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Configuration for one summarization pipeline.
///
/// Built via [`SummaryConfig::builder()`] or using [`SummaryConfig::default()`].
///
/// # Example
/// ```rust
/// use clarity_forge::{OcrLanguage, SummaryConfig};
///
/// let config = SummaryConfig::builder()
///     .ocr_language(OcrLanguage::French)
///     .max_retries(2)
///     .build()
///     .unwrap();
/// assert!(config.api_key.is_none());
/// ```
#[derive(Clone)]
pub struct SummaryConfig {
    /// Credential for the generation endpoint. `None` switches the model
    /// client to mock mode: a fixed canned record, no network access.
    pub api_key: Option<String>,

    /// Generation endpoint URL. Default: [`DEFAULT_ENDPOINT`].
    pub endpoint: String,

    /// Total number of attempts per generation request (not extra retries). Default: 4.
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds. Default: 1000.
    ///
    /// Doubles after each failed attempt: 1 s → 2 s → 4 s.
    pub retry_backoff_ms: u64,

    /// Per-request timeout for the generation call in seconds. Default: 90.
    pub api_timeout_secs: u64,

    /// Character budget for the document text embedded in the prompt. Default: 8000.
    pub max_prompt_chars: usize,

    /// A PDF text layer is only trusted when its stripped length exceeds this. Default: 50.
    ///
    /// Scanned PDFs often carry a few stray characters (page numbers, a
    /// producer stamp) in an otherwise empty text layer; those should fall
    /// through to OCR.
    pub min_text_layer_chars: usize,

    /// Language used by the OCR engine. Default: English.
    pub ocr_language: OcrLanguage,

    /// Longest edge in pixels when rasterising PDF pages for OCR. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Explicit path to the pdfium shared library. Falls back to
    /// `PDFIUM_LIB_PATH`, then the system library search path.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Largest accepted input in bytes. Default: 200 MiB.
    pub max_input_bytes: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Memoization store for extraction and generation results.
    pub cache: SharedCache,

    /// Optional per-stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_retries: 4,
            retry_backoff_ms: 1000,
            api_timeout_secs: 90,
            max_prompt_chars: 8000,
            min_text_layer_chars: 50,
            ocr_language: OcrLanguage::default(),
            max_rendered_pixels: 2000,
            pdfium_lib_path: None,
            max_input_bytes: 200 * 1024 * 1024,
            download_timeout_secs: 120,
            cache: Arc::new(InMemoryCache::new()),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SummaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_prompt_chars", &self.max_prompt_chars)
            .field("min_text_layer_chars", &self.min_text_layer_chars)
            .field("ocr_language", &self.ocr_language)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("max_input_bytes", &self.max_input_bytes)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn SummaryProgressCallback>"),
            )
            .finish()
    }
}

impl SummaryConfig {
    /// Create a new builder for `SummaryConfig`.
    pub fn builder() -> SummaryConfigBuilder {
        SummaryConfigBuilder {
            config: Self::default(),
        }
    }

    /// Whether the model client will answer with the canned mock record.
    pub fn is_mock_mode(&self) -> bool {
        self.api_key.is_none()
    }
}

/// Builder for [`SummaryConfig`].
#[derive(Debug)]
pub struct SummaryConfigBuilder {
    config: SummaryConfig,
}

impl SummaryConfigBuilder {
    /// Set the credential. An empty string is treated as "not configured".
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.config.api_key = if key.trim().is_empty() { None } else { Some(key) };
        self
    }

    /// Read the credential from [`API_KEY_ENV`], leaving mock mode on when unset.
    pub fn api_key_from_env(self) -> Self {
        match std::env::var(API_KEY_ENV) {
            Ok(key) => self.api_key(key),
            Err(_) => self,
        }
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn max_prompt_chars(mut self, n: usize) -> Self {
        self.config.max_prompt_chars = n;
        self
    }

    pub fn min_text_layer_chars(mut self, n: usize) -> Self {
        self.config.min_text_layer_chars = n;
        self
    }

    pub fn ocr_language(mut self, lang: OcrLanguage) -> Self {
        self.config.ocr_language = lang;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn max_input_bytes(mut self, n: u64) -> Self {
        self.config.max_input_bytes = n;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn cache(mut self, cache: SharedCache) -> Self {
        self.config.cache = cache;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SummaryConfig, ClarityError> {
        let c = &self.config;
        if c.max_retries == 0 {
            return Err(ClarityError::InvalidConfig(
                "max_retries counts total attempts and must be ≥ 1".into(),
            ));
        }
        if c.max_prompt_chars == 0 {
            return Err(ClarityError::InvalidConfig(
                "max_prompt_chars must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ClarityError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if !(c.endpoint.starts_with("https://") || c.endpoint.starts_with("http://")) {
            return Err(ClarityError::InvalidConfig(format!(
                "endpoint must be an HTTP(S) URL, got '{}'",
                c.endpoint
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// OCR languages offered to the user.
///
/// `Auto` is a sentinel: Tesseract has no language detection, so it is
/// mapped to English before the engine runs (see [`OcrLanguage::ocr_code`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrLanguage {
    #[default]
    English,
    Spanish,
    French,
    Tamil,
    Auto,
}

impl OcrLanguage {
    pub const ALL: [OcrLanguage; 5] = [
        OcrLanguage::English,
        OcrLanguage::Spanish,
        OcrLanguage::French,
        OcrLanguage::Tamil,
        OcrLanguage::Auto,
    ];

    /// The tag as selected by the user (`"auto"` stays `"auto"`).
    pub fn code(&self) -> &'static str {
        match self {
            OcrLanguage::English => "eng",
            OcrLanguage::Spanish => "spa",
            OcrLanguage::French => "fra",
            OcrLanguage::Tamil => "tam",
            OcrLanguage::Auto => "auto",
        }
    }

    /// The Tesseract language code actually passed to the engine.
    pub fn ocr_code(&self) -> &'static str {
        match self {
            OcrLanguage::Auto => OcrLanguage::English.code(),
            other => other.code(),
        }
    }

    /// Human-readable name, also used as the declared document language in the prompt.
    pub fn display_name(&self) -> &'static str {
        match self {
            OcrLanguage::English => "English",
            OcrLanguage::Spanish => "Spanish",
            OcrLanguage::French => "French",
            OcrLanguage::Tamil => "Tamil",
            OcrLanguage::Auto => "Auto-detect",
        }
    }
}

impl fmt::Display for OcrLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for OcrLanguage {
    type Err = ClarityError;

    /// Accepts either the language code or the display name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        OcrLanguage::ALL
            .into_iter()
            .find(|lang| {
                wanted == lang.code() || wanted == lang.display_name().to_ascii_lowercase()
            })
            .or_else(|| (wanted == "auto-detect" || wanted == "autodetect").then_some(OcrLanguage::Auto))
            .ok_or_else(|| {
                ClarityError::InvalidConfig(format!(
                    "unknown OCR language '{s}' (expected one of: eng, spa, fra, tam, auto)"
                ))
            })
    }
}
