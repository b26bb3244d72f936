//! Structuring agent: turn extracted text into a [`StructuredSummary`].
//!
//! The agent truncates the text to the prompt budget, asks the model for a
//! schema-constrained JSON object and parses the answer. Models sometimes
//! wrap the object in commentary despite the prompt, so parsing first cuts
//! the span from the first `{` to the last `}`. That span is greedy: two
//! separate objects in one answer parse as one invalid span and fail.
//!
//! Malformed or incomplete JSON is never repaired. It surfaces as
//! [`ClarityError::StructuringFailed`] with the raw output attached.

use crate::config::SummaryConfig;
use crate::error::ClarityError;
use crate::output::StructuredSummary;
use crate::pipeline::llm::ModelClient;
use crate::progress::ProgressCallback;
use crate::prompts::{structuring_prompt, summary_schema, TRUNCATION_MARKER};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

static JSON_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Keep whole leading lines of `text` within `max_chars` characters.
///
/// Text that already fits is returned unchanged. Otherwise lines are taken
/// while `count + line_len + 1 <= max_chars`, joined with `\n`, and
/// [`TRUNCATION_MARKER`] is appended.
pub fn truncate_by_lines(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let mut kept: Vec<&str> = Vec::new();
    let mut count = 0usize;
    for line in text.lines() {
        let len = line.chars().count();
        if count + len + 1 > max_chars {
            break;
        }
        kept.push(line);
        count += len + 1;
    }

    let mut out = kept.join("\n");
    out.push_str(TRUNCATION_MARKER);
    out
}

/// Parse the model's raw output into a summary record.
pub fn coerce_json(raw: &str) -> Result<StructuredSummary, ClarityError> {
    let trimmed = raw.trim();
    let candidate = JSON_SPAN
        .find(trimmed)
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    let failed = |reason: String| ClarityError::StructuringFailed {
        reason,
        raw: raw.to_string(),
    };

    let value: Value = serde_json::from_str(candidate).map_err(|e| failed(e.to_string()))?;
    if !value.is_object() {
        return Err(failed("expected a JSON object".to_string()));
    }
    serde_json::from_value(value).map_err(|e| failed(e.to_string()))
}

/// Builds the prompt, calls the model and parses the answer.
#[derive(Clone)]
pub struct StructuringAgent {
    client: ModelClient,
    max_prompt_chars: usize,
    progress: Option<ProgressCallback>,
}

impl StructuringAgent {
    pub fn new(client: ModelClient, max_prompt_chars: usize) -> Self {
        Self {
            client,
            max_prompt_chars,
            progress: None,
        }
    }

    pub fn from_config(config: &SummaryConfig) -> Result<Self, ClarityError> {
        let client = ModelClient::from_config(config)?;
        Ok(Self::new(client, config.max_prompt_chars).with_progress(config.progress_callback.clone()))
    }

    pub fn with_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    pub fn client(&self) -> &ModelClient {
        &self.client
    }

    /// Summarise `text`, telling the model it is written in `declared_language`.
    ///
    /// # Errors
    /// * [`ClarityError::EmptyText`] — `text` is empty or whitespace; no model call is made
    /// * any error from [`ModelClient::generate`]
    /// * [`ClarityError::StructuringFailed`] — the answer is not a JSON object
    ///   with `document_title`, `summary` and `key_points`
    pub async fn structure(
        &self,
        text: &str,
        declared_language: &str,
    ) -> Result<StructuredSummary, ClarityError> {
        if text.trim().is_empty() {
            return Err(ClarityError::EmptyText);
        }

        let truncated = truncate_by_lines(text, self.max_prompt_chars);
        if truncated.len() != text.len() {
            info!(
                "Truncated document from {} to {} chars for the prompt",
                text.chars().count(),
                truncated.chars().count()
            );
        }

        let prompt = structuring_prompt(&truncated, declared_language);
        let schema = summary_schema();
        let raw = self.client.generate(&prompt, Some(&schema)).await?;
        debug!("Model returned {} chars", raw.len());

        let summary = coerce_json(&raw).inspect_err(|e| warn!("Structuring failed: {}", e))?;
        if let Some(ref cb) = self.progress {
            cb.on_structuring_complete(summary.key_points.len());
        }
        Ok(summary)
    }
}
