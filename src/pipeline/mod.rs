//! Pipeline stages for document summarization.
//!
//! Each submodule implements exactly one step, so each can be tested with
//! fakes for its neighbours.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ structure ──▶ llm ──▶ present
//! (path/URL) (text/OCR)  (prompt+parse) (HTTP)  (Markdown)
//! ```
//!
//! 1. [`input`]     — read a local file or download a URL; sniff the media type
//! 2. [`extract`]   — strategy chain: PDF text layer, then OCR; memoized
//!    - [`pdf`]     — pdfium text layer and page rasterisation
//!    - [`ocr`]     — Tesseract OCR
//! 3. [`structure`] — truncate, prompt, parse the JSON record
//! 4. [`llm`]       — generation endpoint with retry/backoff; the only stage
//!    that talks to the model
//! 5. [`present`]   — render the record as Markdown

pub mod extract;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod pdf;
pub mod present;
pub mod structure;
