//! OCR backend: Tesseract through `rusty-tesseract`.
//!
//! `rusty-tesseract` shells out to the `tesseract` binary, so the engine must
//! be installed (with the trained data for every language offered in
//! [`crate::config::OcrLanguage`]). A missing binary or language pack
//! surfaces as [`BackendError::Ocr`] and the extractor moves on.

use crate::pipeline::extract::{BackendError, OcrEngine};
use image::DynamicImage;
use rusty_tesseract::{Args, Image};
use tracing::debug;

/// Tesseract-backed [`OcrEngine`].
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    /// Resolution hint passed to Tesseract for rasterised pages.
    pub dpi: Option<i32>,
    /// Page segmentation mode; 3 is Tesseract's fully automatic default.
    pub psm: Option<i32>,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self {
            dpi: Some(300),
            psm: Some(3),
        }
    }
}

impl TesseractOcr {
    fn args(&self, language: &str) -> Args {
        Args {
            lang: language.to_string(),
            dpi: self.dpi,
            psm: self.psm,
            ..Args::default()
        }
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String, BackendError> {
        let tess_image = Image::from_dynamic_image(image)
            .map_err(|e| BackendError::Ocr(format!("preparing image: {e}")))?;
        let text = rusty_tesseract::image_to_string(&tess_image, &self.args(language))
            .map_err(|e| BackendError::Ocr(format!("lang {language}: {e}")))?;
        debug!(
            "Tesseract ({language}) read {} chars from {}x{} image",
            text.len(),
            image.width(),
            image.height()
        );
        Ok(text)
    }
}
