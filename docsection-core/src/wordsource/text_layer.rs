//! Text-layer word source, backed by `pdf-extract`. Direct successor to the
//! teacher's Tika/JNI backend (`preprocessors/pdf/backends/jni.rs`), which
//! shelled out to a bundled JVM; this implementation stays in-process and
//! pure Rust, sourced from the `dropbox-dKNOW` example's dependency on
//! `pdf-extract` for PDF text extraction.

use super::{has_extractable_text, WordSource};
use crate::config::WordSourceConfig;
use crate::types::{BBox, FontFlags, Page, Token};
use anyhow::{anyhow, Context, Result};
use pdf_extract::OutputDev;

pub struct TextLayerSource<'a> {
    config: &'a WordSourceConfig,
}

impl<'a> TextLayerSource<'a> {
    pub fn new(config: &'a WordSourceConfig) -> Self {
        Self { config }
    }
}

impl<'a> WordSource for TextLayerSource<'a> {
    fn acquire(&self, document: &[u8]) -> Result<Vec<Page>> {
        let doc = pdf_extract::Document::load_mem(document).context("opening PDF document")?;
        let mut collector = PositionCollector::default();
        pdf_extract::output_doc(&doc, &mut collector).context("extracting positioned text")?;

        for page in &collector.pages {
            let all_text = page.tokens.iter().map(|t| t.text.as_str()).collect::<String>();
            if !has_extractable_text(&all_text, self.config.min_alpha_chars) {
                println!(
                    "   📝 page {} has under {} alphabetic characters, text layer considered empty",
                    page.page_index, self.config.min_alpha_chars
                );
            }
        }

        if collector.pages.is_empty() {
            return Err(anyhow!("document contains no pages"));
        }

        Ok(collector.pages)
    }

    fn name(&self) -> &str {
        "pdf-extract-text-layer"
    }
}

#[derive(Default)]
struct PositionCollector {
    pages: Vec<Page>,
    current_page_index: u32,
    current_tokens: Vec<Token>,
    current_word: String,
    current_word_bbox: Option<BBox>,
    page_width: f32,
    page_height: f32,
}

impl PositionCollector {
    fn flush_word(&mut self) {
        if self.current_word.is_empty() {
            return;
        }
        if let Some(bbox) = self.current_word_bbox.take() {
            self.current_tokens.push(Token {
                text: std::mem::take(&mut self.current_word),
                page: self.current_page_index,
                bbox,
                font_size: bbox.height(),
                font_flags: FontFlags::default(),
                color: None,
                confidence: 1.0,
            });
        } else {
            self.current_word.clear();
        }
    }
}

impl OutputDev for PositionCollector {
    fn begin_page(&mut self, page_num: u32, media_box: &pdf_extract::MediaBox, _art_box: Option<(f64, f64, f64, f64)>) -> Result<(), pdf_extract::OutputError> {
        self.flush_word();
        if !self.current_tokens.is_empty() {
            let page = Page::new(
                self.current_page_index,
                self.page_width,
                self.page_height,
                std::mem::take(&mut self.current_tokens),
            );
            self.pages.push(page);
        }
        self.current_page_index = page_num.saturating_sub(1);
        self.page_width = media_box.width as f32;
        self.page_height = media_box.height as f32;
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), pdf_extract::OutputError> {
        self.flush_word();
        let page = Page::new(
            self.current_page_index,
            self.page_width,
            self.page_height,
            std::mem::take(&mut self.current_tokens),
        );
        self.pages.push(page);
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &pdf_extract::Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        text: &str,
    ) -> Result<(), pdf_extract::OutputError> {
        if text.trim().is_empty() {
            self.flush_word();
            return Ok(());
        }

        let x0 = trm.m31 as f32;
        let y0 = self.page_height - trm.m32 as f32 - font_size as f32;
        let x1 = x0 + width as f32;
        let y1 = y0 + font_size as f32;
        let glyph_bbox = BBox::new(x0, y0.max(0.0), x1.max(x0 + 0.5), y1.max(y0 + 0.5));

        self.current_word.push_str(text);
        self.current_word_bbox = Some(match self.current_word_bbox {
            Some(existing) => BBox::new(
                existing.x0.min(glyph_bbox.x0),
                existing.y0.min(glyph_bbox.y0),
                existing.x1.max(glyph_bbox.x1),
                existing.y1.max(glyph_bbox.y1),
            ),
            None => glyph_bbox,
        });
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), pdf_extract::OutputError> {
        self.flush_word();
        Ok(())
    }
}
