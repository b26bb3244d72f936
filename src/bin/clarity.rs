//! CLI binary for clarity-forge.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `SummaryConfig` and prints the rendered summary.

use anyhow::{Context, Result};
use clap::Parser;
use clarity_forge::{
    summarize, ExtractionStrategy, MediaType, OcrLanguage, ProgressCallback, SummaryConfig,
    SummaryProgressCallback, SummaryReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that mirrors the pipeline's stage events.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl SummaryProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, media_type: &MediaType) {
        self.bar.set_prefix("Extracting");
        self.bar.set_message(format!("{media_type} input"));
    }

    fn on_strategy_start(&self, strategy: ExtractionStrategy, language: &str) {
        if strategy.uses_ocr() {
            self.bar.set_message(format!("{strategy} ({language})"));
        } else {
            self.bar.set_message(strategy.to_string());
        }
    }

    fn on_strategy_rejected(&self, strategy: ExtractionStrategy, reason: &str) {
        self.bar
            .println(format!("{} {}  {}", cyan("⚠"), strategy, dim(reason)));
    }

    fn on_extraction_complete(&self, strategy: ExtractionStrategy, characters: usize) {
        self.bar.println(format!(
            "{} {} characters via {}",
            green("✔"),
            bold(&characters.to_string()),
            strategy
        ));
        self.bar.set_prefix("Summarizing");
        self.bar.set_message("waiting for the model…");
    }

    fn on_mock_mode(&self) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            "No API key set: using the mock response (set GEMINI_API_KEY for live results)"
        ));
    }

    fn on_model_attempt(&self, attempt: u32, max_attempts: u32) {
        if attempt > 1 {
            self.bar
                .set_message(format!("attempt {attempt}/{max_attempts}"));
        }
    }

    fn on_model_retry(&self, attempt: u32, delay_ms: u64, error: &str) {
        self.bar.println(format!(
            "{} attempt {} failed, retrying in {}ms  {}",
            red("✘"),
            attempt,
            delay_ms,
            dim(error)
        ));
    }

    fn on_structuring_complete(&self, key_points: usize) {
        self.bar.println(format!(
            "{} summary with {} key points",
            green("✔"),
            bold(&key_points.to_string())
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarize a PDF (mock mode without an API key)
  clarity report.pdf

  # Live summary of a scanned French letter
  GEMINI_API_KEY=... clarity --language fra letter.jpg

  # Write the Markdown summary to a file
  clarity report.pdf -o summary.md

  # Full JSON report, including extracted text and stats
  clarity --json https://example.org/paper.pdf > report.json

LANGUAGES (OCR):
  eng  English (default)    spa  Spanish
  fra  French               tam  Tamil
  auto Auto-detect (OCR runs as English)

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY     Generation API key; without it the CLI runs in mock mode
  CLARITY_ENDPOINT   Override the generateContent endpoint URL
  PDFIUM_LIB_PATH    Path to libpdfium (otherwise the system library path)
  RUST_LOG           Tracing filter, e.g. clarity_forge=debug

REQUIREMENTS:
  PDF support needs a pdfium shared library. OCR needs the `tesseract`
  binary with the eng/spa/fra/tam trained data installed.
"#;

/// Summarize PDFs and images with a hosted generation model.
#[derive(Parser, Debug)]
#[command(
    name = "clarity",
    version,
    about = "Summarize PDF and image documents into a structured record",
    long_about = "Extract text from a PDF (text layer, falling back to OCR) or an image \
(OCR), then ask a generation model for a strict JSON summary: title, author, date, \
summary and key points. Runs offline in mock mode when no API key is configured.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF/PNG/JPEG path or HTTP/HTTPS URL.
    input: String,

    /// Write the Markdown summary to this file instead of stdout.
    #[arg(short, long, env = "CLARITY_OUTPUT")]
    output: Option<PathBuf>,

    /// OCR language: eng, spa, fra, tam or auto.
    #[arg(long, env = "CLARITY_LANGUAGE", default_value = "eng", value_parser = parse_language)]
    language: OcrLanguage,

    /// Generation API key. Without one, a canned mock summary is returned.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// generateContent endpoint URL.
    #[arg(long, env = "CLARITY_ENDPOINT")]
    endpoint: Option<String>,

    /// Total attempts for the generation request.
    #[arg(long, env = "CLARITY_MAX_RETRIES", default_value_t = 4)]
    max_retries: u32,

    /// Base backoff between attempts; doubles after each failure.
    #[arg(long, env = "CLARITY_RETRY_BACKOFF_MS", default_value_t = 1000)]
    retry_backoff_ms: u64,

    /// Per-request generation timeout in seconds.
    #[arg(long, env = "CLARITY_API_TIMEOUT", default_value_t = 90)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "CLARITY_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Character budget for the document text embedded in the prompt.
    #[arg(long, env = "CLARITY_MAX_CHARS", default_value_t = 8000)]
    max_chars: usize,

    /// A PDF text layer must have more than this many characters to skip OCR.
    #[arg(long, env = "CLARITY_MIN_TEXT_CHARS", default_value_t = 50)]
    min_text_chars: usize,

    /// Longest edge, in pixels, of PDF pages rasterised for OCR.
    #[arg(long, env = "CLARITY_MAX_PIXELS", default_value_t = 2000)]
    max_pixels: u32,

    /// Path to libpdfium.
    #[arg(long)]
    pdfium_lib: Option<PathBuf>,

    /// Output the full report (stats, text, summary) as JSON on stdout.
    #[arg(long, env = "CLARITY_JSON", conflicts_with = "output")]
    json: bool,

    /// Also print the extracted text after the summary.
    #[arg(long)]
    show_text: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "CLARITY_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CLARITY_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CLARITY_QUIET")]
    quiet: bool,
}

fn parse_language(s: &str) -> Result<OcrLanguage, String> {
    s.parse::<OcrLanguage>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO logs; verbose mode always shows everything.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(
        &cli,
        progress.clone().map(|cb| cb as Arc<dyn SummaryProgressCallback>),
    )?;

    // ── Run pipeline ─────────────────────────────────────────────────────
    let result = summarize(&cli.input, &config).await;
    if let Some(ref cb) = progress {
        cb.finish();
    }
    let report = result.map_err(|e| {
        let stage = e.stage();
        anyhow::Error::new(e).context(format!("Summarization failed ({stage} stage)"))
    })?;

    if let Some(ref output_path) = cli.output {
        clarity_forge::summarize::write_atomic(output_path, &report.markdown)
            .await
            .context("Failed to write summary")?;
        if !cli.quiet {
            eprintln!(
                "{}  {}  →  {}",
                green("✔"),
                report.summary.document_title,
                bold(&output_path.display().to_string()),
            );
        }
    } else if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else {
        print_markdown(&report.markdown)?;
    }

    if cli.show_text && !cli.json {
        eprintln!("\n{}", bold("Extracted text:"));
        print_markdown(&report.text)?;
    }

    if !cli.quiet && !cli.json {
        print_stats(&report);
    }

    Ok(())
}

/// Map CLI args to `SummaryConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SummaryConfig> {
    let mut builder = SummaryConfig::builder()
        .ocr_language(cli.language)
        .max_retries(cli.max_retries)
        .retry_backoff_ms(cli.retry_backoff_ms)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .max_prompt_chars(cli.max_chars)
        .min_text_layer_chars(cli.min_text_chars)
        .max_rendered_pixels(cli.max_pixels);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint.clone());
    }
    if let Some(ref path) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(path.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_markdown(text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

fn print_stats(report: &SummaryReport) {
    let stats = &report.stats;
    eprintln!(
        "   {} chars  /  ~{} tokens  via {}  ({})  —  {}ms total{}",
        dim(&stats.characters.to_string()),
        dim(&stats.approx_tokens.to_string()),
        stats.strategy,
        stats.language.display_name(),
        report.timings.total_ms,
        if report.mock { "  [mock]" } else { "" },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_and_output_file_conflict() {
        let err = Cli::try_parse_from(["clarity", "--json", "-o", "out.md", "report.pdf"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn json_alone_and_output_alone_parse() {
        let cli = Cli::try_parse_from(["clarity", "--json", "report.pdf"]).unwrap();
        assert!(cli.json && cli.output.is_none());

        let cli = Cli::try_parse_from(["clarity", "-o", "out.md", "--language", "fra", "report.pdf"])
            .unwrap();
        assert_eq!(cli.output, Some(PathBuf::from("out.md")));
        assert_eq!(cli.language, OcrLanguage::French);
    }
}
