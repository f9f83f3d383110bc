//! Core data model (spec §3). All entities are immutable value records
//! unless noted — Tokens are owned by their Page and never mutated; Column,
//! Line, Header, and Section are derived and discarded once the orchestrator
//! emits a result; a `SectionDatabaseEntry` alone has process-lifetime plus
//! persistence.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Capability set over the three style flags a token carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontFlags {
    pub bold: bool,
    pub italic: bool,
    pub monospace: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Axis-aligned bounding box in a page's coordinate space, origin top-left.
/// Invariant: `x0 < x1`, `y0 < y1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        debug_assert!(x0 < x1 && y0 < y1, "degenerate bbox: ({x0},{y0})-({x1},{y1})");
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn x_center(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    /// Vertical overlap with another bbox, in the same units as the bbox.
    pub fn vertical_overlap(&self, other: &BBox) -> f32 {
        let top = self.y0.max(other.y0);
        let bottom = self.y1.min(other.y1);
        (bottom - top).max(0.0)
    }
}

/// One positioned word in the document (spec §3 Token).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub page: u32,
    pub bbox: BBox,
    pub font_size: f32,
    pub font_flags: FontFlags,
    pub color: Option<RgbColor>,
    /// 1.0 for text-layer tokens, OCR engine score for OCR tokens.
    pub confidence: f32,
}

impl Token {
    pub fn is_bold(&self) -> bool {
        self.font_flags.bold
    }
}

/// A page's tokens plus its dimensions (spec §3 Page). The token list is
/// sorted by `(y0, x0)` for downstream consumers; no semantic ordering is
/// assumed prior to segmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub page_index: u32,
    pub width: f32,
    pub height: f32,
    pub tokens: Vec<Token>,
}

impl Page {
    pub fn new(page_index: u32, width: f32, height: f32, mut tokens: Vec<Token>) -> Self {
        tokens.sort_by(|a, b| {
            a.bbox
                .y0
                .partial_cmp(&b.bbox.y0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(std::cmp::Ordering::Equal))
        });
        Self {
            page_index,
            width,
            height,
            tokens,
        }
    }
}

/// One vertical slab of a page with its token partition (spec §3
/// ColumnRegion). Column indices are unique within a page, ordered
/// left-to-right. A `column_index` of `None` marks a full-width band (header,
/// footer, or Type 3 full-width band).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnRegion {
    pub page_index: u32,
    pub column_index: Option<u32>,
    pub x_bounds: (f32, f32),
    pub tokens: Vec<Token>,
}

/// A maximal horizontal cluster of tokens sharing vertical overlap within a
/// column (spec §3 Line). Tokens are ordered by `x0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    pub page_index: u32,
    pub column_index: Option<u32>,
    pub y_top: f32,
    pub y_bot: f32,
    pub tokens: Vec<Token>,
}

impl Line {
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn height(&self) -> f32 {
        self.y_bot - self.y_top
    }

    pub fn max_font_size(&self) -> f32 {
        self.tokens
            .iter()
            .map(|t| t.font_size)
            .fold(0.0_f32, f32::max)
    }

    pub fn avg_font_size(&self) -> f32 {
        if self.tokens.is_empty() {
            return 0.0;
        }
        self.tokens.iter().map(|t| t.font_size).sum::<f32>() / self.tokens.len() as f32
    }

    pub fn bold_ratio(&self) -> f32 {
        if self.tokens.is_empty() {
            return 0.0;
        }
        let bold = self.tokens.iter().filter(|t| t.is_bold()).count();
        bold as f32 / self.tokens.len() as f32
    }

    pub fn x0(&self) -> f32 {
        self.tokens.first().map(|t| t.bbox.x0).unwrap_or(0.0)
    }
}

/// How a header string was resolved to a canonical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    Exact,
    Normalized,
    Embedding,
    Pattern,
    Unknown,
}

/// A Line classified as a section boundary (spec §3 SectionHeader).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionHeader {
    pub line_index: usize,
    pub canonical_name: CanonicalName,
    pub match_kind: MatchKind,
    pub score: f32,
}

/// A contiguous run of body lines attached to a header (spec §3 Section).
/// Invariant: `ordered_body_lines` contains no SectionHeader; lines are in
/// the reading order produced by the assembler (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub canonical_name: CanonicalName,
    pub source_column_refs: Vec<(u32, Option<u32>)>,
    pub ordered_body_lines: Vec<Line>,
    pub page_span: (u32, u32),
}

/// Layout classification of a page (spec §3 LayoutClass).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LayoutClass {
    Type1,
    Type2 {
        column_bounds: Vec<(f32, f32)>,
    },
    Type3 {
        bands: Vec<(f32, f32)>,
        column_bounds_per_band: Vec<Vec<(f32, f32)>>,
    },
}

impl LayoutClass {
    pub fn label(&self) -> &'static str {
        match self {
            LayoutClass::Type1 => "single",
            LayoutClass::Type2 { .. } => "multi",
            LayoutClass::Type3 { .. } => "hybrid",
        }
    }

    pub fn column_count(&self) -> usize {
        match self {
            LayoutClass::Type1 => 1,
            LayoutClass::Type2 { column_bounds } => column_bounds.len(),
            LayoutClass::Type3 {
                column_bounds_per_band,
                ..
            } => column_bounds_per_band
                .iter()
                .map(|b| b.len().max(1))
                .max()
                .unwrap_or(1),
        }
    }
}

/// The closed enum of canonical section identifiers (spec §4.6, ~15
/// sections plus `Unknown`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalName {
    Contact,
    Summary,
    Skills,
    Experience,
    Projects,
    Education,
    Certifications,
    Achievements,
    Publications,
    Languages,
    Volunteer,
    Hobbies,
    References,
    Declarations,
    Unknown,
}

impl CanonicalName {
    pub const ALL: [CanonicalName; 15] = [
        CanonicalName::Contact,
        CanonicalName::Summary,
        CanonicalName::Skills,
        CanonicalName::Experience,
        CanonicalName::Projects,
        CanonicalName::Education,
        CanonicalName::Certifications,
        CanonicalName::Achievements,
        CanonicalName::Publications,
        CanonicalName::Languages,
        CanonicalName::Volunteer,
        CanonicalName::Hobbies,
        CanonicalName::References,
        CanonicalName::Declarations,
        CanonicalName::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalName::Contact => "Contact",
            CanonicalName::Summary => "Summary",
            CanonicalName::Skills => "Skills",
            CanonicalName::Experience => "Experience",
            CanonicalName::Projects => "Projects",
            CanonicalName::Education => "Education",
            CanonicalName::Certifications => "Certifications",
            CanonicalName::Achievements => "Achievements",
            CanonicalName::Publications => "Publications",
            CanonicalName::Languages => "Languages",
            CanonicalName::Volunteer => "Volunteer",
            CanonicalName::Hobbies => "Hobbies",
            CanonicalName::References => "References",
            CanonicalName::Declarations => "Declarations",
            CanonicalName::Unknown => "Unknown",
        }
    }
}

/// A persisted entry in the section database (spec §3
/// SectionDatabaseEntry). Created on first learned variant, mutated by the
/// learner, flushed to stable storage on commit (§4.6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionDatabaseEntry {
    pub variants: HashSet<String>,
    pub embedding_centroid: Option<Vec<f32>>,
    pub usage_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_vertical_overlap() {
        let a = BBox::new(0.0, 10.0, 50.0, 20.0);
        let b = BBox::new(5.0, 15.0, 55.0, 25.0);
        assert_eq!(a.vertical_overlap(&b), 5.0);
    }

    #[test]
    fn bbox_vertical_overlap_disjoint() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(0.0, 20.0, 10.0, 30.0);
        assert_eq!(a.vertical_overlap(&b), 0.0);
    }

    #[test]
    fn page_sorts_tokens_by_y_then_x() {
        let tok = |x, y| Token {
            text: "w".into(),
            page: 0,
            bbox: BBox::new(x, y, x + 5.0, y + 5.0),
            font_size: 12.0,
            font_flags: FontFlags::default(),
            color: None,
            confidence: 1.0,
        };
        let page = Page::new(0, 600.0, 800.0, vec![tok(50.0, 20.0), tok(10.0, 20.0), tok(0.0, 5.0)]);
        let ys: Vec<f32> = page.tokens.iter().map(|t| t.bbox.y0).collect();
        assert_eq!(ys, vec![5.0, 20.0, 20.0]);
        assert_eq!(page.tokens[1].bbox.x0, 10.0);
        assert_eq!(page.tokens[2].bbox.x0, 50.0);
    }
}
