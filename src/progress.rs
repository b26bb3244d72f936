//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn SummaryProgressCallback>`] via
//! [`crate::config::SummaryConfigBuilder::progress_callback`] to receive
//! events as a document moves through extraction, generation and
//! structuring. The CLI turns them into spinner messages; a server could
//! forward them to a WebSocket without the library knowing.
//!
//! # Example
//!
//! ```rust
//! use clarity_forge::{ExtractionStrategy, SummaryConfig, SummaryProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicU32, Ordering}};
//!
//! struct RetryCounter {
//!     retries: AtomicU32,
//! }
//!
//! impl SummaryProgressCallback for RetryCounter {
//!     fn on_model_retry(&self, attempt: u32, delay_ms: u64, error: &str) {
//!         self.retries.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("attempt {attempt} failed ({error}); waiting {delay_ms}ms");
//!     }
//! }
//!
//! let config = SummaryConfig::builder()
//!     .progress_callback(Arc::new(RetryCounter { retries: AtomicU32::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::document::MediaType;
use crate::pipeline::extract::ExtractionStrategy;
use std::sync::Arc;

/// Called by the pipeline as each stage progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`; extraction
/// runs on the blocking thread pool.
pub trait SummaryProgressCallback: Send + Sync {
    /// Called once before the first extraction strategy runs.
    fn on_extraction_start(&self, media_type: &MediaType) {
        let _ = media_type;
    }

    /// Called before each extraction strategy.
    ///
    /// # Arguments
    /// * `strategy` — the strategy about to run
    /// * `language` — OCR language code in effect (ignored by text-layer extraction)
    fn on_strategy_start(&self, strategy: ExtractionStrategy, language: &str) {
        let _ = (strategy, language);
    }

    /// Called when a strategy did not produce usable text.
    fn on_strategy_rejected(&self, strategy: ExtractionStrategy, reason: &str) {
        let _ = (strategy, reason);
    }

    /// Called when a strategy succeeded.
    ///
    /// # Arguments
    /// * `characters` — character count of the extracted text
    fn on_extraction_complete(&self, strategy: ExtractionStrategy, characters: usize) {
        let _ = (strategy, characters);
    }

    /// Called instead of any network traffic when no credential is configured.
    fn on_mock_mode(&self) {}

    /// Called before each generation request is sent.
    ///
    /// # Arguments
    /// * `attempt`      — 1-indexed attempt number
    /// * `max_attempts` — configured attempt bound
    fn on_model_attempt(&self, attempt: u32, max_attempts: u32) {
        let _ = (attempt, max_attempts);
    }

    /// Called after a retryable failure, just before sleeping.
    ///
    /// # Arguments
    /// * `attempt`  — the attempt that failed (1-indexed)
    /// * `delay_ms` — backoff before the next attempt
    /// * `error`    — human-readable transport error
    fn on_model_retry(&self, attempt: u32, delay_ms: u64, error: &str) {
        let _ = (attempt, delay_ms, error);
    }

    /// Called once the model output parsed into a summary record.
    fn on_structuring_complete(&self, key_points: usize) {
        let _ = key_points;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SummaryProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SummaryConfig`].
pub type ProgressCallback = Arc<dyn SummaryProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl SummaryProgressCallback for Recorder {
        fn on_strategy_rejected(&self, strategy: ExtractionStrategy, reason: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("{}: {reason}", strategy.name()));
        }

        fn on_model_retry(&self, attempt: u32, delay_ms: u64, _error: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("retry {attempt} {delay_ms}"));
        }
    }

    #[test]
    fn noop_callback_accepts_every_event() {
        let cb = NoopProgressCallback;
        cb.on_extraction_start(&MediaType::Pdf);
        cb.on_strategy_start(ExtractionStrategy::PdfTextLayer, "eng");
        cb.on_strategy_rejected(ExtractionStrategy::PdfOcr, "empty");
        cb.on_extraction_complete(ExtractionStrategy::ImageOcr, 10);
        cb.on_mock_mode();
        cb.on_model_attempt(1, 4);
        cb.on_model_retry(1, 1000, "HTTP 503");
        cb.on_structuring_complete(3);
    }

    #[test]
    fn overridden_methods_receive_events() {
        let rec = Arc::new(Recorder {
            events: Mutex::new(Vec::new()),
        });
        let cb: ProgressCallback = rec.clone();
        cb.on_strategy_rejected(ExtractionStrategy::PdfTextLayer, "too short");
        cb.on_model_retry(2, 2000, "timeout");
        cb.on_mock_mode();

        let events = rec.events.lock().unwrap();
        assert_eq!(
            *events,
            vec!["pdf-text-layer: too short".to_string(), "retry 2 2000".to_string()]
        );
    }
}
