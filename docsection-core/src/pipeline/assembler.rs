//! C7 — Section Assembler (spec §4.7).
//!
//! Walks a page's columns in reading order, opens a new `Section` at each
//! detected header, and folds lines before the first header into a
//! synthetic Contact/Unknown bucket based on email/phone/URL signals.
//! Occurrences of the same canonical name (a resume's "Experience" section
//! spanning a page break) are merged rather than duplicated. The
//! column-walk/merge shape is grounded in the teacher's
//! `graphs/builder.rs::group_elements_into_chunks`, and the final
//! reading-order sort follows the `(None, None) => Equal` idiom from
//! `graphs/graph.rs`.

use crate::types::{CanonicalName, ColumnRegion, LayoutClass, Line, MatchKind, Section, SectionHeader};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[\w.+-]+@[\w-]+\.[\w.-]+").unwrap());
static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\+?\d[\d\-\s()]{7,}\d)").unwrap());
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(https?://|www\.)\S+").unwrap());

pub struct SectionAssembler {
    sections: Vec<Section>,
    open_index: Option<usize>,
    seen_any_header: bool,
    preamble: Vec<Line>,
}

impl SectionAssembler {
    pub fn new() -> Self {
        Self {
            sections: Vec::new(),
            open_index: None,
            seen_any_header: false,
            preamble: Vec::new(),
        }
    }

    /// Reading order for one page: Type1 is a single top-down stream;
    /// Type2/Type3 walk columns left-to-right, each column top-to-bottom,
    /// in the order the layout classifier produced column bounds (spec
    /// §4.7 step 1).
    pub fn reading_order(&self, class: &LayoutClass, lines_by_column: Vec<Vec<Line>>) -> Vec<Line> {
        match class {
            LayoutClass::Type1 => lines_by_column.into_iter().flatten().collect(),
            LayoutClass::Type2 { .. } => lines_by_column.into_iter().flatten().collect(),
            LayoutClass::Type3 { .. } => lines_by_column.into_iter().flatten().collect(),
        }
    }

    /// Feed one page's already-ordered line stream plus the headers
    /// detected within it (indices into `ordered_lines`).
    pub fn push_page(&mut self, page_index: u32, ordered_lines: Vec<Line>, headers: Vec<SectionHeader>) {
        let mut header_at = vec![None; ordered_lines.len()];
        for h in &headers {
            if h.line_index < header_at.len() {
                header_at[h.line_index] = Some(h);
            }
        }

        for (i, line) in ordered_lines.into_iter().enumerate() {
            if let Some(header) = header_at[i] {
                self.open_section(page_index, header, &line);
                self.seen_any_header = true;
                continue;
            }

            if self.seen_any_header {
                self.append_to_open(page_index, line);
            } else {
                self.preamble.push(line);
            }
        }
    }

    fn open_section(&mut self, page_index: u32, header: &SectionHeader, header_line: &Line) {
        if let Some(existing) = self
            .sections
            .iter()
            .position(|s| s.canonical_name == header.canonical_name)
        {
            self.open_index = Some(existing);
            self.sections[existing].page_span.1 = page_index;
            self.record_column_ref(existing, page_index, header_line.column_index);
            return;
        }

        self.sections.push(Section {
            canonical_name: header.canonical_name,
            source_column_refs: vec![(page_index, header_line.column_index)],
            ordered_body_lines: Vec::new(),
            page_span: (page_index, page_index),
        });
        self.open_index = Some(self.sections.len() - 1);
    }

    fn append_to_open(&mut self, page_index: u32, line: Line) {
        if let Some(idx) = self.open_index {
            self.record_column_ref(idx, page_index, line.column_index);
            self.sections[idx].page_span.1 = page_index;
            self.sections[idx].ordered_body_lines.push(line);
        } else {
            self.preamble.push(line);
        }
    }

    fn record_column_ref(&mut self, idx: usize, page_index: u32, column_index: Option<u32>) {
        let key = (page_index, column_index);
        if !self.sections[idx].source_column_refs.contains(&key) {
            self.sections[idx].source_column_refs.push(key);
        }
    }

    /// Resolve preamble lines (everything before the first real header):
    /// ones carrying an email, phone number, or URL form a synthetic
    /// `Contact` section; everything else attaches to `Summary` — creating
    /// it if no header resolved to `Summary` directly, or prepending to an
    /// existing one so the preamble still reads first (spec §4.7 step 3;
    /// also the `NoSections` fallback shape from spec §7, where a
    /// header-free document's lines all land under `Summary`).
    pub fn finish(mut self) -> Vec<Section> {
        if self.preamble.is_empty() {
            return self.sections;
        }

        let preamble = std::mem::take(&mut self.preamble);
        let (contact_lines, remainder): (Vec<Line>, Vec<Line>) = preamble.into_iter().partition(|line| {
            let text = line.text();
            EMAIL.is_match(&text) || PHONE.is_match(&text) || URL.is_match(&text)
        });

        let inserted_contact = !contact_lines.is_empty();
        if inserted_contact {
            let page_span = (
                contact_lines.first().map(|l| l.page_index).unwrap_or(0),
                contact_lines.last().map(|l| l.page_index).unwrap_or(0),
            );
            let refs: Vec<(u32, Option<u32>)> = contact_lines.iter().map(|l| (l.page_index, l.column_index)).collect();
            self.sections.insert(
                0,
                Section {
                    canonical_name: CanonicalName::Contact,
                    source_column_refs: dedup(refs),
                    ordered_body_lines: contact_lines,
                    page_span,
                },
            );
        }

        if !remainder.is_empty() {
            let page_span = (
                remainder.first().map(|l| l.page_index).unwrap_or(0),
                remainder.last().map(|l| l.page_index).unwrap_or(0),
            );
            let refs = dedup(remainder.iter().map(|l| (l.page_index, l.column_index)).collect());

            match self.sections.iter().position(|s| s.canonical_name == CanonicalName::Summary) {
                Some(existing) => {
                    let mut merged = remainder;
                    merged.extend(self.sections[existing].ordered_body_lines.drain(..));
                    self.sections[existing].ordered_body_lines = merged;
                    self.sections[existing].page_span.0 = self.sections[existing].page_span.0.min(page_span.0);
                    for r in refs {
                        if !self.sections[existing].source_column_refs.contains(&r) {
                            self.sections[existing].source_column_refs.push(r);
                        }
                    }
                }
                None => {
                    let insert_at = if inserted_contact { 1 } else { 0 };
                    self.sections.insert(
                        insert_at,
                        Section {
                            canonical_name: CanonicalName::Summary,
                            source_column_refs: refs,
                            ordered_body_lines: remainder,
                            page_span,
                        },
                    );
                }
            }
        }

        self.sections
    }

    pub fn match_kind_hint(header: &SectionHeader) -> MatchKind {
        header.match_kind
    }
}

fn dedup(mut refs: Vec<(u32, Option<u32>)>) -> Vec<(u32, Option<u32>)> {
    refs.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| match (a.1, b.1) {
        (None, None) => std::cmp::Ordering::Equal,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (Some(_), None) => std::cmp::Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(&y),
    }));
    refs.dedup();
    refs
}

impl Default for SectionAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BBox, FontFlags, Token};

    fn line(text: &str, y: f32, column: Option<u32>) -> Line {
        let tokens: Vec<Token> = text
            .split_whitespace()
            .enumerate()
            .map(|(i, w)| Token {
                text: w.to_string(),
                page: 0,
                bbox: BBox::new(10.0 + i as f32 * 40.0, y, 10.0 + i as f32 * 40.0 + 35.0, y + 12.0),
                font_size: 12.0,
                font_flags: FontFlags::default(),
                color: None,
                confidence: 1.0,
            })
            .collect();
        Line {
            page_index: 0,
            column_index: column,
            y_top: y,
            y_bot: y + 12.0,
            tokens,
        }
    }

    #[test]
    fn preamble_with_email_becomes_contact_section() {
        let mut assembler = SectionAssembler::new();
        let lines = vec![
            line("Jane Doe jane.doe@example.com", 10.0, Some(0)),
            line("EXPERIENCE", 60.0, Some(0)),
            line("Worked at a company for years", 90.0, Some(0)),
        ];
        let headers = vec![SectionHeader {
            line_index: 1,
            canonical_name: CanonicalName::Experience,
            match_kind: MatchKind::Exact,
            score: 0.9,
        }];
        assembler.push_page(0, lines, headers);
        let sections = assembler.finish();
        assert_eq!(sections[0].canonical_name, CanonicalName::Contact);
        assert_eq!(sections[1].canonical_name, CanonicalName::Experience);
        assert_eq!(sections[1].ordered_body_lines.len(), 1);
    }

    #[test]
    fn repeated_canonical_name_merges_into_one_section() {
        let mut assembler = SectionAssembler::new();
        let lines = vec![
            line("EXPERIENCE", 10.0, Some(0)),
            line("Role one details", 40.0, Some(0)),
            line("EXPERIENCE", 100.0, Some(1)),
            line("Role two details", 130.0, Some(1)),
        ];
        let headers = vec![
            SectionHeader {
                line_index: 0,
                canonical_name: CanonicalName::Experience,
                match_kind: MatchKind::Exact,
                score: 0.9,
            },
            SectionHeader {
                line_index: 2,
                canonical_name: CanonicalName::Experience,
                match_kind: MatchKind::Exact,
                score: 0.9,
            },
        ];
        assembler.push_page(0, lines, headers);
        let sections = assembler.finish();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].ordered_body_lines.len(), 2);
    }

    #[test]
    fn preamble_without_contact_signal_becomes_summary_section() {
        let mut assembler = SectionAssembler::new();
        let lines = vec![
            line("Results driven engineer with years of delivery experience", 10.0, Some(0)),
            line("EXPERIENCE", 60.0, Some(0)),
            line("Worked at a company for years", 90.0, Some(0)),
        ];
        let headers = vec![SectionHeader {
            line_index: 1,
            canonical_name: CanonicalName::Experience,
            match_kind: MatchKind::Exact,
            score: 0.9,
        }];
        assembler.push_page(0, lines, headers);
        let sections = assembler.finish();
        assert_eq!(sections[0].canonical_name, CanonicalName::Summary);
        assert_eq!(sections[0].ordered_body_lines.len(), 1);
        assert_eq!(sections[1].canonical_name, CanonicalName::Experience);
    }

    #[test]
    fn summary_preamble_prepends_to_an_existing_summary_header() {
        let mut assembler = SectionAssembler::new();
        let lines = vec![
            line("Results driven engineer with years of delivery experience", 10.0, Some(0)),
            line("SUMMARY", 60.0, Some(0)),
            line("Seeking a senior platform role", 90.0, Some(0)),
        ];
        let headers = vec![SectionHeader {
            line_index: 1,
            canonical_name: CanonicalName::Summary,
            match_kind: MatchKind::Exact,
            score: 0.9,
        }];
        assembler.push_page(0, lines, headers);
        let sections = assembler.finish();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].canonical_name, CanonicalName::Summary);
        assert_eq!(sections[0].ordered_body_lines.len(), 2);
        assert_eq!(
            sections[0].ordered_body_lines[0].text(),
            "Results driven engineer with years of delivery experience"
        );
    }
}
