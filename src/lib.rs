//! # clarity-forge
//!
//! Summarize PDFs and scanned images into a structured record using a
//! hosted generation model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / PNG / JPEG
//!  │
//!  ├─ 1. Input      resolve local file or download from URL, sniff media type
//!  ├─ 2. Extract    PDF text layer → OCR fallback (pdfium + Tesseract, spawn_blocking)
//!  ├─ 3. Structure  truncate, prompt for strict JSON, parse the record
//!  ├─ 4. Model      generateContent with retry/backoff (or mock without a key)
//!  └─ 5. Present    Markdown rendering of the record
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clarity_forge::{summarize, SummaryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Live mode when GEMINI_API_KEY is set, mock mode otherwise
//!     let config = SummaryConfig::builder().api_key_from_env().build()?;
//!     let report = summarize("report.pdf", &config).await?;
//!     println!("{}", report.markdown);
//!     eprintln!("{} chars via {}", report.stats.characters, report.stats.strategy);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `clarity` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! clarity-forge = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime Requirements
//!
//! PDF support needs a pdfium shared library (`PDFIUM_LIB_PATH` or the
//! system library path). OCR needs the `tesseract` binary with trained data
//! for `eng`, `spa`, `fra` and `tam`. Either one missing only disables the
//! strategies that need it.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod summarize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cache::{CacheKey, CachedOutput, InMemoryCache, MemoCache, NoopCache, SharedCache};
pub use config::{OcrLanguage, SummaryConfig, SummaryConfigBuilder};
pub use document::{Document, MediaType};
pub use error::{ClarityError, TransportError};
pub use output::{ExtractedText, ExtractionStats, StageTimings, StructuredSummary, SummaryReport};
pub use pipeline::extract::{ExtractionStrategy, Extractor};
pub use pipeline::llm::{GenerationTransport, ModelClient, ModelRequest};
pub use pipeline::present::render_summary;
pub use pipeline::structure::StructuringAgent;
pub use progress::{NoopProgressCallback, ProgressCallback, SummaryProgressCallback};
pub use summarize::{
    summarize, summarize_bytes, summarize_document, summarize_sync, summarize_text,
    summarize_to_file, Summarizer,
};
