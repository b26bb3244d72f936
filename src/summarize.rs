//! Top-level entry points: run one document through the whole pipeline.
//!
//! ```text
//! input ──▶ extract ──▶ structure (──▶ model) ──▶ present ──▶ SummaryReport
//! ```
//!
//! Every stage either hands a value forward or returns a terminal
//! [`ClarityError`]; there is no partial result.

use crate::config::SummaryConfig;
use crate::document::Document;
use crate::error::ClarityError;
use crate::output::{ExtractionStats, StageTimings, StructuredSummary, SummaryReport};
use crate::pipeline::extract::Extractor;
use crate::pipeline::input::{self, document_from_bytes};
use crate::pipeline::present::render_summary;
use crate::pipeline::structure::StructuringAgent;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// The assembled pipeline. Cheap to clone; reuse it to share the cache.
#[derive(Clone)]
pub struct Summarizer {
    extractor: Extractor,
    agent: StructuringAgent,
}

impl Summarizer {
    pub fn new(extractor: Extractor, agent: StructuringAgent) -> Self {
        Self { extractor, agent }
    }

    /// Native backends and the configured model client.
    pub fn from_config(config: &SummaryConfig) -> Result<Self, ClarityError> {
        Ok(Self::new(
            Extractor::from_config(config),
            StructuringAgent::from_config(config)?,
        ))
    }

    /// Extract, structure and render one document.
    pub async fn run(&self, document: &Document) -> Result<SummaryReport, ClarityError> {
        let total_start = Instant::now();
        info!(
            "Summarizing '{}' ({}, {} bytes)",
            document.name,
            document.media_type,
            document.len()
        );

        // ── Step 1: Extract text ─────────────────────────────────────────
        let extract_start = Instant::now();
        let extracted = self.extractor.extract(document).await?;
        let extraction_ms = extract_start.elapsed().as_millis() as u64;
        let stats = ExtractionStats::from_extracted(&extracted, document.ocr_language);

        // ── Step 2: Structure ────────────────────────────────────────────
        let structure_start = Instant::now();
        let summary = self
            .agent
            .structure(&extracted.text, document.ocr_language.display_name())
            .await?;
        let structuring_ms = structure_start.elapsed().as_millis() as u64;

        // ── Step 3: Present ──────────────────────────────────────────────
        let markdown = render_summary(Some(&summary));
        let total_ms = total_start.elapsed().as_millis() as u64;

        info!(
            "Done: {} via {}, {} key points in {}ms",
            document.name,
            stats.strategy,
            summary.key_points.len(),
            total_ms
        );

        Ok(SummaryReport {
            source: document.name.clone(),
            media_type: document.media_type.clone(),
            stats,
            text: extracted.text,
            summary,
            markdown,
            mock: self.agent.client().is_mock(),
            timings: StageTimings {
                extraction_ms,
                structuring_ms,
                total_ms,
            },
        })
    }

    /// Structure already-extracted text, skipping extraction.
    pub async fn structure_text(
        &self,
        text: &str,
        declared_language: &str,
    ) -> Result<StructuredSummary, ClarityError> {
        self.agent.structure(text, declared_language).await
    }
}

/// Summarize a local file or URL.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Any stage failure: input, extraction, model or structuring. See
/// [`ClarityError::stage`].
pub async fn summarize(
    input_str: impl AsRef<str>,
    config: &SummaryConfig,
) -> Result<SummaryReport, ClarityError> {
    let document = input::resolve_input(input_str.as_ref(), config).await?;
    summarize_document(&document, config).await
}

/// Summarize an already-built [`Document`].
pub async fn summarize_document(
    document: &Document,
    config: &SummaryConfig,
) -> Result<SummaryReport, ClarityError> {
    Summarizer::from_config(config)?.run(document).await
}

/// Summarize in-memory bytes; `name` is used for media-type detection and reporting.
pub async fn summarize_bytes(
    name: impl Into<String>,
    bytes: Vec<u8>,
    config: &SummaryConfig,
) -> Result<SummaryReport, ClarityError> {
    let document = document_from_bytes(name, bytes, config.ocr_language);
    summarize_document(&document, config).await
}

/// Structure plain text with the configured model, skipping extraction.
pub async fn summarize_text(
    text: &str,
    config: &SummaryConfig,
) -> Result<StructuredSummary, ClarityError> {
    StructuringAgent::from_config(config)?
        .structure(text, config.ocr_language.display_name())
        .await
}

/// Synchronous wrapper around [`summarize`].
///
/// Creates a temporary tokio runtime internally.
pub fn summarize_sync(
    input_str: impl AsRef<str>,
    config: &SummaryConfig,
) -> Result<SummaryReport, ClarityError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ClarityError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(summarize(input_str, config))
}

/// Summarize and write the rendered Markdown to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn summarize_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &SummaryConfig,
) -> Result<SummaryReport, ClarityError> {
    let report = summarize(input_str, config).await?;
    write_atomic(output_path.as_ref(), &report.markdown).await?;
    Ok(report)
}

/// Write `contents` to a sibling temp file, then rename over `path`.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), ClarityError> {
    let write_failed = |source: std::io::Error| ClarityError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, contents).await.map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_failed)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NoopCache;
    use crate::config::OcrLanguage;
    use crate::document::MediaType;
    use crate::pipeline::extract::{
        BackendError, ExtractionBackends, ExtractionStrategy, OcrEngine, PageRasterizer,
        TextLayerReader,
    };
    use crate::pipeline::llm::ModelClient;
    use image::DynamicImage;
    use std::sync::Arc;

    struct TextOnly(&'static str);

    impl TextLayerReader for TextOnly {
        fn page_texts(&self, _pdf: &[u8]) -> Result<Vec<String>, BackendError> {
            Ok(vec![self.0.to_string()])
        }
    }

    impl PageRasterizer for TextOnly {
        fn rasterize(&self, _pdf: &[u8]) -> Result<Vec<DynamicImage>, BackendError> {
            Err(BackendError::Unavailable("no rasterizer in tests".into()))
        }
    }

    impl OcrEngine for TextOnly {
        fn recognize(&self, _image: &DynamicImage, _language: &str) -> Result<String, BackendError> {
            Err(BackendError::Unavailable("no ocr in tests".into()))
        }
    }

    fn summarizer(text: &'static str) -> Summarizer {
        let backend = Arc::new(TextOnly(text));
        let backends = ExtractionBackends {
            text_layer: backend.clone(),
            rasterizer: backend.clone(),
            ocr: backend,
        };
        Summarizer::new(
            Extractor::new(backends, Arc::new(NoopCache), 50),
            StructuringAgent::new(ModelClient::mock(), 8000),
        )
    }

    #[tokio::test]
    async fn run_produces_full_report() {
        let text = "Annual report of the widget cooperative, covering production and sales.";
        let doc = Document::new(b"%PDF-1.7".to_vec(), MediaType::Pdf, OcrLanguage::English)
            .with_name("annual.pdf");

        let report = summarizer(text).run(&doc).await.unwrap();

        assert_eq!(report.source, "annual.pdf");
        assert_eq!(report.text, text);
        assert_eq!(report.stats.strategy, ExtractionStrategy::PdfTextLayer);
        assert_eq!(report.stats.characters, text.chars().count());
        assert_eq!(report.summary.document_title, "Mock Document");
        assert!(report.markdown.starts_with("### Mock Document"));
        assert!(report.mock);
    }

    #[tokio::test]
    async fn extraction_failure_stops_the_pipeline() {
        let doc = Document::new(b"%PDF-1.7".to_vec(), MediaType::Pdf, OcrLanguage::English);
        let err = summarizer("too short").run(&doc).await.unwrap_err();
        assert_eq!(err.stage(), "extraction");
        assert!(err.to_string().contains("no ocr in tests") || err.to_string().contains("no rasterizer"));
    }

    #[tokio::test]
    async fn write_atomic_creates_parents_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.md");

        write_atomic(&path, "### Title").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "### Title");
        assert!(!path.with_extension("md.tmp").exists());
    }
}
