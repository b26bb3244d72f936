//! PDF backends: text-layer reading and page rasterisation via pdfium.
//!
//! ## Why bind per call?
//!
//! The extractor calls these backends from `spawn_blocking`. Binding pdfium
//! inside the blocking closure keeps the library handle on the thread that
//! uses it, and the binding cost is negligible next to rendering a page.
//!
//! ## Why cap pixels?
//!
//! Page sizes vary wildly: an A0 poster rendered at print resolution would
//! produce a 12,000 × 17,000 px image. `max_rendered_pixels` caps the
//! longest edge, keeping memory bounded while staying well above the
//! resolution Tesseract needs for body text.

use crate::config::SummaryConfig;
use crate::pipeline::extract::{BackendError, PageRasterizer, TextLayerReader};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// Environment variable pointing at an existing libpdfium.
pub const PDFIUM_LIB_ENV: &str = "PDFIUM_LIB_PATH";

/// pdfium-backed implementation of [`TextLayerReader`] and [`PageRasterizer`].
#[derive(Debug, Clone)]
pub struct PdfiumBackend {
    lib_path: Option<PathBuf>,
    max_rendered_pixels: u32,
}

impl PdfiumBackend {
    pub fn new(lib_path: Option<PathBuf>, max_rendered_pixels: u32) -> Self {
        Self {
            lib_path,
            max_rendered_pixels,
        }
    }

    pub fn from_config(config: &SummaryConfig) -> Self {
        Self::new(config.pdfium_lib_path.clone(), config.max_rendered_pixels)
    }

    /// Resolve the library location: explicit path, then `PDFIUM_LIB_PATH`,
    /// then the system search path.
    fn bind(&self) -> Result<Pdfium, BackendError> {
        let path = self
            .lib_path
            .clone()
            .or_else(|| std::env::var_os(PDFIUM_LIB_ENV).map(PathBuf::from));

        let bindings = match path {
            Some(ref p) => Pdfium::bind_to_library(p).map_err(|e| {
                BackendError::Unavailable(format!("pdfium at '{}': {e}", p.display()))
            })?,
            None => Pdfium::bind_to_system_library()
                .map_err(|e| BackendError::Unavailable(format!("system pdfium: {e}")))?,
        };

        Ok(Pdfium::new(bindings))
    }
}

fn load_error(e: PdfiumError) -> BackendError {
    BackendError::Pdf(format!("cannot open document: {e:?}"))
}

impl TextLayerReader for PdfiumBackend {
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<String>, BackendError> {
        let pdfium = self.bind()?;
        let document = pdfium.load_pdf_from_byte_slice(pdf, None).map_err(load_error)?;

        let mut texts = Vec::with_capacity(document.pages().len() as usize);
        for (idx, page) in document.pages().iter().enumerate() {
            let text = page
                .text()
                .map_err(|e| BackendError::Pdf(format!("page {}: {e:?}", idx + 1)))?
                .all();
            debug!("Page {}: {} chars in text layer", idx + 1, text.len());
            texts.push(text);
        }

        info!("Read text layer of {} pages", texts.len());
        Ok(texts)
    }
}

impl PageRasterizer for PdfiumBackend {
    fn rasterize(&self, pdf: &[u8]) -> Result<Vec<DynamicImage>, BackendError> {
        let pdfium = self.bind()?;
        let document = pdfium.load_pdf_from_byte_slice(pdf, None).map_err(load_error)?;

        let render_config = PdfRenderConfig::new()
            .set_target_width(self.max_rendered_pixels as i32)
            .set_maximum_height(self.max_rendered_pixels as i32);

        let mut images = Vec::with_capacity(document.pages().len() as usize);
        for (idx, page) in document.pages().iter().enumerate() {
            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|e| BackendError::Pdf(format!("rasterising page {}: {e:?}", idx + 1)))?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            images.push(image);
        }

        info!("Rasterised {} pages", images.len());
        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_missing_library_reports_unavailable() {
        let backend = PdfiumBackend::new(Some(PathBuf::from("/definitely/not/libpdfium.so")), 2000);
        let err = backend.page_texts(b"%PDF-1.7").unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)), "got: {err}");
        assert!(err.to_string().contains("/definitely/not/libpdfium.so"));
    }

    #[test]
    fn from_config_copies_render_cap() {
        let config = SummaryConfig::builder().max_rendered_pixels(1200).build().unwrap();
        let backend = PdfiumBackend::from_config(&config);
        assert_eq!(backend.max_rendered_pixels, 1200);
        assert!(backend.lib_path.is_none());
    }
}
