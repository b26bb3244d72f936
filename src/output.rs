//! Values produced by the pipeline.

use crate::config::OcrLanguage;
use crate::document::MediaType;
use crate::pipeline::extract::ExtractionStrategy;
use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder the model is told to use for unknown optional fields.
pub const NOT_AVAILABLE: &str = "N/A";

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

/// `null` for an optional field means the same as leaving it out.
fn string_or_not_available<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(not_available))
}

/// The fixed-shape record the structuring agent asks the model for.
///
/// `document_title`, `summary` and `key_points` are mandatory when
/// deserializing; `author` and `date` become [`NOT_AVAILABLE`] when missing
/// or `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredSummary {
    pub document_title: String,
    #[serde(default = "not_available", deserialize_with = "string_or_not_available")]
    pub author: String,
    #[serde(default = "not_available", deserialize_with = "string_or_not_available")]
    pub date: String,
    pub summary: String,
    pub key_points: Vec<String>,
}

/// Text produced by the extractor, tagged with the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    pub strategy: ExtractionStrategy,
}

impl ExtractedText {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Shape of the extracted text, shown next to the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub strategy: ExtractionStrategy,
    pub characters: usize,
    /// Rough token estimate: one token per four characters, at least one.
    pub approx_tokens: usize,
    pub language: OcrLanguage,
}

impl ExtractionStats {
    pub fn from_extracted(extracted: &ExtractedText, language: OcrLanguage) -> Self {
        let characters = extracted.char_count();
        Self {
            strategy: extracted.strategy,
            characters,
            approx_tokens: (characters / 4).max(1),
            language,
        }
    }
}

/// Everything a single pipeline run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    /// File name or URL of the input.
    pub source: String,
    pub media_type: MediaType,
    pub stats: ExtractionStats,
    /// Full extracted text (before prompt truncation).
    pub text: String,
    pub summary: StructuredSummary,
    /// Human-readable Markdown rendering of `summary`.
    pub markdown: String,
    /// Whether the summary came from the canned mock response.
    pub mock: bool,
    pub timings: StageTimings,
}

/// Wall-clock time spent per stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimings {
    pub extraction_ms: u64,
    pub structuring_ms: u64,
    pub total_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_default_to_na() {
        let s: StructuredSummary = serde_json::from_str(
            r#"{"document_title":"T","summary":"S","key_points":["a"]}"#,
        )
        .unwrap();
        assert_eq!(s.author, "N/A");
        assert_eq!(s.date, "N/A");
    }

    #[test]
    fn null_optional_fields_become_na() {
        let s: StructuredSummary = serde_json::from_str(
            r#"{"document_title":"T","author":null,"date":"2024","summary":"S","key_points":[]}"#,
        )
        .unwrap();
        assert_eq!(s.author, "N/A");
        assert_eq!(s.date, "2024");
    }

    #[test]
    fn missing_key_points_is_an_error() {
        let r = serde_json::from_str::<StructuredSummary>(
            r#"{"document_title":"T","summary":"S"}"#,
        );
        assert!(r.is_err());
    }

    #[test]
    fn approx_tokens_is_at_least_one() {
        let short = ExtractedText {
            text: "abc".into(),
            strategy: ExtractionStrategy::ImageOcr,
        };
        assert_eq!(
            ExtractionStats::from_extracted(&short, OcrLanguage::English).approx_tokens,
            1
        );

        let long = ExtractedText {
            text: "x".repeat(401),
            strategy: ExtractionStrategy::PdfTextLayer,
        };
        let stats = ExtractionStats::from_extracted(&long, OcrLanguage::French);
        assert_eq!(stats.characters, 401);
        assert_eq!(stats.approx_tokens, 100);
        assert_eq!(stats.language, OcrLanguage::French);
    }
}
