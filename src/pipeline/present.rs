//! Presenter: render a [`StructuredSummary`] as Markdown.

use crate::output::StructuredSummary;

/// Shown when there is no record to render.
pub const NO_DATA: &str = "No data.";

/// Shown under the Summary heading when the summary is empty.
pub const EMPTY_SUMMARY: &str = "—";

/// Render `summary` as Markdown. Pure and infallible.
pub fn render_summary(summary: Option<&StructuredSummary>) -> String {
    let Some(s) = summary else {
        return NO_DATA.to_string();
    };

    let mut lines: Vec<String> = Vec::new();
    if !s.document_title.is_empty() {
        lines.push(format!("### {}", s.document_title));
    }
    if !s.author.is_empty() {
        lines.push(format!("**Author:** {}", s.author));
    }
    if !s.date.is_empty() {
        lines.push(format!("**Date:** {}", s.date));
    }

    lines.push("\n#### Summary".to_string());
    if s.summary.is_empty() {
        lines.push(EMPTY_SUMMARY.to_string());
    } else {
        lines.push(s.summary.clone());
    }

    if !s.key_points.is_empty() {
        lines.push("\n#### Key Points".to_string());
        lines.extend(s.key_points.iter().map(|p| format!("- {p}")));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> StructuredSummary {
        StructuredSummary {
            document_title: "Mock Document".into(),
            author: "N/A".into(),
            date: "N/A".into(),
            summary: "Mock summary for offline demo.".into(),
            key_points: vec!["one".into(), "two".into()],
        }
    }

    #[test]
    fn renders_full_record() {
        let md = render_summary(Some(&record()));
        assert_eq!(
            md,
            "### Mock Document\n**Author:** N/A\n**Date:** N/A\n\n#### Summary\nMock summary for offline demo.\n\n#### Key Points\n- one\n- two"
        );
    }

    #[test]
    fn empty_fields_are_skipped_or_replaced() {
        let s = StructuredSummary {
            document_title: String::new(),
            author: String::new(),
            date: String::new(),
            summary: String::new(),
            key_points: vec![],
        };
        let md = render_summary(Some(&s));
        assert_eq!(md, "\n#### Summary\n—");
        assert!(!md.contains("Key Points"));
    }

    #[test]
    fn absent_record() {
        assert_eq!(render_summary(None), "No data.");
    }
}
