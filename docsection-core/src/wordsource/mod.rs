//! Word acquisition (C1, spec §4.1) — the single `WordSource` capability the
//! rest of the pipeline depends on (spec §9 redesign: one capability instead
//! of the teacher's two-step "document -> markup -> structured output"
//! preprocessor boundary in `preprocessors/preprocessor.rs`). A source turns
//! document bytes into `Page`s of positioned `Token`s; callers don't care
//! whether the words came from a text layer or an OCR pass.

#[cfg(feature = "pdf-backend")]
pub mod ocr;
#[cfg(feature = "pdf-backend")]
pub mod text_layer;

#[cfg(feature = "pdf-backend")]
pub use ocr::{NullOcrEngine, OcrEngine};
#[cfg(feature = "pdf-backend")]
pub use text_layer::TextLayerSource;

use crate::error::ParseError;
use crate::types::Page;
use anyhow::Result;

/// Acquires positioned words from a document (spec §4.1). Implementors
/// decide internally whether to fall back to OCR; the orchestrator only
/// sees the resulting pages and the confidence they carry.
pub trait WordSource {
    fn acquire(&self, document: &[u8]) -> Result<Vec<Page>>;

    fn name(&self) -> &str;
}

/// Minimum alphabetic character count below which a page's text layer is
/// considered empty and a fallback is warranted (spec §4.1 edge case).
pub fn has_extractable_text(text: &str, min_alpha_chars: usize) -> bool {
    text.chars().filter(|c| c.is_alphabetic()).count() >= min_alpha_chars
}

pub(crate) fn no_extractable_text(page: u32) -> ParseError {
    ParseError::NoExtractableText { page }
}
