//! Text extraction: an ordered chain of named strategies with OCR fallback.
//!
//! ```text
//! PDF   ──▶ pdf-text-layer ──(≤ threshold / error)──▶ pdf-ocr ──▶ text | ExtractionFailed
//! image ──▶ image-ocr ─────────────────────────────────────────▶ text | ExtractionFailed
//! other ──▶ UnsupportedMediaType
//! ```
//!
//! Each strategy asks a backend for raw text and then applies its own
//! acceptance rule. Backend output (or failure) is memoized per strategy,
//! keyed by the SHA-256 of the upload and, for OCR, the language code.
//! Backends are blocking (pdfium, tesseract) and run on `spawn_blocking`.

use crate::cache::{CacheKey, CachedOutput, SharedCache};
use crate::config::SummaryConfig;
use crate::document::{Document, MediaType};
use crate::error::ClarityError;
use crate::output::ExtractedText;
use crate::pipeline::ocr::TesseractOcr;
use crate::pipeline::pdf::PdfiumBackend;
use crate::progress::ProgressCallback;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

// ── Collaborator traits ──────────────────────────────────────────────────

/// Reads the embedded text layer of a PDF, one string per page in page order.
pub trait TextLayerReader: Send + Sync {
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, BackendError>;
}

/// Renders every page of a PDF to an image, in page order.
pub trait PageRasterizer: Send + Sync {
    fn rasterize(&self, pdf: &[u8]) -> Result<Vec<DynamicImage>, BackendError>;
}

/// Recognises text in an image for a given Tesseract language code.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String, BackendError>;
}

/// Failure inside one backend call. Never terminal on its own: it rejects
/// the current strategy and the chain moves on.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("pdf: {0}")]
    Pdf(String),

    #[error("image decode: {0}")]
    Image(#[from] image::ImageError),

    #[error("ocr: {0}")]
    Ocr(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// The three collaborators the extractor drives.
#[derive(Clone)]
pub struct ExtractionBackends {
    pub text_layer: Arc<dyn TextLayerReader>,
    pub rasterizer: Arc<dyn PageRasterizer>,
    pub ocr: Arc<dyn OcrEngine>,
}

impl ExtractionBackends {
    /// pdfium for text layer and rasterisation, Tesseract for OCR.
    pub fn native(config: &SummaryConfig) -> Self {
        let pdfium = Arc::new(PdfiumBackend::from_config(config));
        Self {
            text_layer: pdfium.clone(),
            rasterizer: pdfium,
            ocr: Arc::new(TesseractOcr::default()),
        }
    }
}

// ── Strategies ───────────────────────────────────────────────────────────

/// A named way of turning document bytes into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionStrategy {
    /// Embedded PDF text, all pages concatenated.
    PdfTextLayer,
    /// Rasterise every PDF page and OCR each one.
    PdfOcr,
    /// OCR the uploaded image directly.
    ImageOcr,
}

impl ExtractionStrategy {
    /// Strategies to try, in order, for a media type. Empty for unsupported types.
    pub fn plan(media_type: &MediaType) -> &'static [ExtractionStrategy] {
        match media_type {
            MediaType::Pdf => &[ExtractionStrategy::PdfTextLayer, ExtractionStrategy::PdfOcr],
            MediaType::Image => &[ExtractionStrategy::ImageOcr],
            MediaType::Unsupported(_) => &[],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExtractionStrategy::PdfTextLayer => "pdf-text-layer",
            ExtractionStrategy::PdfOcr => "pdf-ocr",
            ExtractionStrategy::ImageOcr => "image-ocr",
        }
    }

    pub fn uses_ocr(&self) -> bool {
        !matches!(self, ExtractionStrategy::PdfTextLayer)
    }
}

impl fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of running one strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutcome {
    Accepted(String),
    Rejected(String),
}

// ── Extractor ────────────────────────────────────────────────────────────

/// Runs the strategy chain for a document.
#[derive(Clone)]
pub struct Extractor {
    backends: ExtractionBackends,
    cache: SharedCache,
    min_text_layer_chars: usize,
    progress: Option<ProgressCallback>,
}

impl Extractor {
    pub fn new(backends: ExtractionBackends, cache: SharedCache, min_text_layer_chars: usize) -> Self {
        Self {
            backends,
            cache,
            min_text_layer_chars,
            progress: None,
        }
    }

    /// Native backends, cache, threshold and progress callback from `config`.
    pub fn from_config(config: &SummaryConfig) -> Self {
        Self::new(
            ExtractionBackends::native(config),
            Arc::clone(&config.cache),
            config.min_text_layer_chars,
        )
        .with_progress(config.progress_callback.clone())
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Extract text from `document`, stopping at the first accepted strategy.
    ///
    /// # Errors
    /// * [`ClarityError::UnsupportedMediaType`] — neither PDF nor image
    /// * [`ClarityError::ExtractionFailed`] — every strategy was rejected;
    ///   the message lists each strategy with its reason
    pub async fn extract(&self, document: &Document) -> Result<ExtractedText, ClarityError> {
        let plan = ExtractionStrategy::plan(&document.media_type);
        if plan.is_empty() {
            return Err(ClarityError::UnsupportedMediaType {
                media_type: document.media_type.to_string(),
            });
        }

        if let Some(ref cb) = self.progress {
            cb.on_extraction_start(&document.media_type);
        }

        let language = document.ocr_language.ocr_code();
        let mut rejections = Vec::with_capacity(plan.len());

        for &strategy in plan {
            info!("Extracting '{}' with {}", document.name, strategy);
            if let Some(ref cb) = self.progress {
                cb.on_strategy_start(strategy, language);
            }

            match self.run_strategy(strategy, document, language).await {
                StrategyOutcome::Accepted(text) => {
                    let extracted = ExtractedText { text, strategy };
                    info!(
                        "{} succeeded: {} characters",
                        strategy,
                        extracted.char_count()
                    );
                    if let Some(ref cb) = self.progress {
                        cb.on_extraction_complete(strategy, extracted.char_count());
                    }
                    return Ok(extracted);
                }
                StrategyOutcome::Rejected(reason) => {
                    warn!("{} rejected: {}", strategy, reason);
                    if let Some(ref cb) = self.progress {
                        cb.on_strategy_rejected(strategy, &reason);
                    }
                    rejections.push(format!("{strategy}: {reason}"));
                }
            }
        }

        Err(ClarityError::ExtractionFailed {
            media_type: document.media_type.to_string(),
            attempts: rejections.join("; "),
        })
    }

    /// Run one strategy and apply its acceptance rule.
    pub async fn run_strategy(
        &self,
        strategy: ExtractionStrategy,
        document: &Document,
        language: &str,
    ) -> StrategyOutcome {
        let text = match self.backend_output(strategy, document, language).await {
            CachedOutput::Text(text) => text,
            CachedOutput::Failed(reason) => return StrategyOutcome::Rejected(reason),
        };

        let meaningful = text.trim().chars().count();
        match strategy {
            ExtractionStrategy::PdfTextLayer if meaningful <= self.min_text_layer_chars => {
                StrategyOutcome::Rejected(format!(
                    "text layer has {meaningful} characters, need more than {}",
                    self.min_text_layer_chars
                ))
            }
            _ if meaningful == 0 => StrategyOutcome::Rejected("no text recognised".to_string()),
            _ => StrategyOutcome::Accepted(text),
        }
    }

    /// Backend output for a strategy, memoized by content digest (+ language for OCR).
    async fn backend_output(
        &self,
        strategy: ExtractionStrategy,
        document: &Document,
        language: &str,
    ) -> CachedOutput {
        let params: &[&str] = if strategy.uses_ocr() { &[language] } else { &[] };
        let key = CacheKey::new(strategy.name(), &document.bytes, params);

        if let Some(hit) = self.cache.get(&key) {
            debug!("{} cache hit for '{}'", strategy, document.name);
            return hit;
        }

        let backends = self.backends.clone();
        let bytes = Arc::clone(&document.bytes);
        let language = language.to_string();

        let joined = tokio::task::spawn_blocking(move || {
            run_backend(&backends, strategy, &bytes, &language)
        })
        .await;

        let output = match joined {
            Ok(Ok(text)) => CachedOutput::Text(text),
            Ok(Err(e)) => CachedOutput::Failed(e.to_string()),
            // A panicking backend is not memoized; the next request may succeed.
            Err(e) => return CachedOutput::Failed(format!("backend task panicked: {e}")),
        };

        self.cache.insert(key, output.clone());
        output
    }
}

/// Blocking body of a strategy: call the backends and concatenate in page order.
fn run_backend(
    backends: &ExtractionBackends,
    strategy: ExtractionStrategy,
    bytes: &[u8],
    language: &str,
) -> Result<String, BackendError> {
    match strategy {
        ExtractionStrategy::PdfTextLayer => Ok(backends.text_layer.page_texts(bytes)?.concat()),
        ExtractionStrategy::PdfOcr => {
            let pages = backends.rasterizer.rasterize(bytes)?;
            let mut text = String::new();
            for (idx, page) in pages.iter().enumerate() {
                let page_text = backends.ocr.recognize(page, language)?;
                debug!("OCR page {}: {} chars", idx + 1, page_text.len());
                text.push_str(&page_text);
            }
            Ok(text)
        }
        ExtractionStrategy::ImageOcr => {
            let image = image::load_from_memory(bytes)?;
            backends.ocr.recognize(&image, language)
        }
    }
}
