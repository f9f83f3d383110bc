//! OCR fallback word source. Rasterizes pages with `pdfium-render` (sourced,
//! like `pdf-extract`, from the `dropbox-dKNOW` example's dependency list)
//! and hands bitmaps to an injected `OcrEngine` — the recognition engine
//! itself is left external per spec §6's "OCR provider exposing
//! recognize(image, languages) -> words" note, so this crate never hard-wires
//! a specific OCR implementation.

use super::WordSource;
use crate::config::WordSourceConfig;
use crate::types::{BBox, FontFlags, Page, Token};
use anyhow::{Context, Result};
use image::DynamicImage;
use pdfium_render::prelude::*;

/// One recognized word and its pixel-space bounding box, as reported by an
/// `OcrEngine` implementation.
#[derive(Debug, Clone)]
pub struct RecognizedWord {
    pub text: String,
    pub bbox: BBox,
    pub confidence: f32,
}

/// External OCR capability. The crate ships only `NullOcrEngine`; a caller
/// wires in a real engine (e.g. a Tesseract or cloud-OCR binding) by
/// implementing this trait.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &DynamicImage, languages: &[String]) -> Result<Vec<RecognizedWord>>;

    fn name(&self) -> &str;
}

/// Default engine: always reports unavailable. Keeps the pipeline
/// compiling and runnable without dragging in an OCR dependency by default
/// (spec §9 — OCR provider is an external collaborator, not a hard
/// dependency).
pub struct NullOcrEngine;

impl OcrEngine for NullOcrEngine {
    fn recognize(&self, _image: &DynamicImage, _languages: &[String]) -> Result<Vec<RecognizedWord>> {
        Err(anyhow::anyhow!(
            "no OCR engine configured; pass a WordSourceConfig-compatible OcrEngine to OcrSource::new"
        ))
    }

    fn name(&self) -> &str {
        "null-ocr"
    }
}

pub struct OcrSource<'a> {
    config: &'a WordSourceConfig,
    engine: &'a dyn OcrEngine,
}

impl<'a> OcrSource<'a> {
    pub fn new(config: &'a WordSourceConfig, engine: &'a dyn OcrEngine) -> Self {
        Self { config, engine }
    }

    fn render_page(&self, pdfium: &Pdfium, document: &[u8], page_index: u32) -> Result<(DynamicImage, f32, f32)> {
        let doc = pdfium
            .load_pdf_from_byte_slice(document, None)
            .context("opening PDF for OCR rasterization")?;
        let page = doc
            .pages()
            .get(page_index as u16)
            .context("page index out of range")?;

        let render_config = PdfRenderConfig::new()
            .set_target_width((page.width().value * self.config.ocr_dpi as f32 / 72.0) as i32)
            .set_maximum_height((page.height().value * self.config.ocr_dpi as f32 / 72.0) as i32);

        let bitmap = page
            .render_with_config(&render_config)
            .context("rendering page to bitmap")?;
        let image = bitmap.as_image();
        Ok((image, page.width().value, page.height().value))
    }
}

impl<'a> WordSource for OcrSource<'a> {
    fn acquire(&self, document: &[u8]) -> Result<Vec<Page>> {
        let pdfium = Pdfium::default();
        let doc = pdfium
            .load_pdf_from_byte_slice(document, None)
            .context("opening PDF for OCR page count")?;
        let page_count = doc.pages().len();

        println!(
            "   🔍 OCR fallback engaged ({}), {} page(s), {} dpi",
            self.engine.name(),
            page_count,
            self.config.ocr_dpi
        );

        // Pages are rasterized at ocr_dpi; recognized word boxes come back in
        // that bitmap's pixel space and must be mapped back to PDF points
        // (72 dpi) before they can sit alongside text-layer tokens on the
        // same Page (spec §4.1).
        let scale = self.config.ocr_dpi as f32 / 72.0;

        let mut pages = Vec::with_capacity(page_count as usize);
        for page_index in 0..page_count as u32 {
            let (image, width, height) = self.render_page(&pdfium, document, page_index)?;
            let words = self.engine.recognize(&image, &self.config.ocr_languages)?;

            let tokens: Vec<Token> = words
                .into_iter()
                .map(|w| {
                    let bbox = BBox::new(w.bbox.x0 / scale, w.bbox.y0 / scale, w.bbox.x1 / scale, w.bbox.y1 / scale);
                    Token {
                        text: w.text,
                        page: page_index,
                        font_size: bbox.height(),
                        bbox,
                        font_flags: FontFlags::default(),
                        color: None,
                        confidence: w.confidence,
                    }
                })
                .collect();

            pages.push(Page::new(page_index, width, height, tokens));
        }

        Ok(pages)
    }

    fn name(&self) -> &str {
        "ocr-fallback"
    }
}
