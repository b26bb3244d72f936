//! Prompt, response schema and mock payload for the structuring agent.
//!
//! Keeping every model-facing string here means the wording of the prompt
//! can change without touching retry or parsing logic, and tests can inspect
//! the prompt directly without a live model.

use serde_json::{json, Value};

/// Appended to the document text when it was cut to fit the prompt budget.
pub const TRUNCATION_MARKER: &str = "\n\n…(truncated)";

/// Canned model output used when no credential is configured.
pub const MOCK_RESPONSE: &str = r#"{
  "document_title": "Mock Document",
  "author": "N/A",
  "date": "N/A",
  "summary": "Mock summary for offline demo.",
  "key_points": [
    "Works without API key",
    "Set GEMINI_API_KEY for live results"
  ]
}"#;

/// JSON schema sent as `responseSchema`, in the endpoint's OpenAPI-subset dialect.
pub fn summary_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "document_title": {"type": "STRING"},
            "author": {"type": "STRING"},
            "date": {"type": "STRING"},
            "summary": {"type": "STRING"},
            "key_points": {"type": "ARRAY", "items": {"type": "STRING"}}
        },
        "required": ["document_title", "summary", "key_points"]
    })
}

/// Build the structuring prompt around already-truncated document text.
pub fn structuring_prompt(document_text: &str, document_language: &str) -> String {
    format!(
        "You are a highly efficient AI agent. Your task is to extract key information from a document and return a STRICT JSON object.\n\
**Instructions:**\n\
1.  Set `document_title`, `author`, `date`, and `summary`.\n\
2.  For `key_points`, provide a concise list of the most important takeaways.\n\
3.  If any field (like `author` or `date`) is not present in the document, use 'N/A' for its value.\n\
4.  The output must be JSON ONLY, with no extra text or explanations.\n\
**Document Language:** {document_language}\n\
**Input Document:**\n```\n{document_text}\n```\n\
**Strict JSON Output:**"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_states_fields_language_and_json_only() {
        let p = structuring_prompt("Title: X", "French");
        for field in ["document_title", "author", "date", "summary", "key_points"] {
            assert!(p.contains(field), "prompt should mention {field}");
        }
        assert!(p.contains("'N/A'"));
        assert!(p.contains("JSON ONLY"));
        assert!(p.contains("**Document Language:** French"));
        assert!(p.contains("```\nTitle: X\n```"));
    }

    #[test]
    fn schema_requires_mandatory_fields() {
        let schema = summary_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(required, vec!["document_title", "summary", "key_points"]);
        assert_eq!(schema["properties"]["key_points"]["items"]["type"], "STRING");
    }

    #[test]
    fn mock_response_is_valid_json() {
        let v: Value = serde_json::from_str(MOCK_RESPONSE).unwrap();
        assert_eq!(v["document_title"], "Mock Document");
        assert_eq!(v["key_points"].as_array().unwrap().len(), 2);
    }
}
