//! End-to-end tests over the C2-C7 chain (histogram -> column segmenter ->
//! line grouper -> header detector -> assembler), built from synthetic
//! pages rather than real PDF bytes since the WordSource boundary is the
//! only part of the pipeline that needs an actual file on disk. Covers the
//! resume-shaped scenarios from spec §8: single column, two column,
//! repeated section merge, and unresolved headers.

use docsection_core::config::{HeaderDetectorConfig, HistogramConfig, LineGrouperConfig};
use docsection_core::pipeline::{ColumnSegmenter, HeaderDetector, LayoutClassifier, LineGrouper, SectionAssembler, SectionDatabase};
use docsection_core::{BBox, CanonicalName, FontFlags, Page, Token};

fn tok(text: &str, x0: f32, y0: f32, font_size: f32, bold: bool) -> Token {
    Token {
        text: text.to_string(),
        page: 0,
        bbox: BBox::new(x0, y0, x0 + text.len() as f32 * 7.0, y0 + font_size),
        font_size,
        font_flags: FontFlags {
            bold,
            italic: false,
            monospace: false,
        },
        color: None,
        confidence: 1.0,
    }
}

fn run_pipeline(page: &Page) -> Vec<docsection_core::Section> {
    let histogram_config = HistogramConfig::default();
    let line_config = LineGrouperConfig::default();
    let header_config = HeaderDetectorConfig::default();
    let db = SectionDatabase::with_builtin_defaults();

    let classifier = LayoutClassifier::new(&histogram_config);
    let segmenter = ColumnSegmenter::new();
    let line_grouper = LineGrouper::new(&line_config);
    let header_detector = HeaderDetector::new(&header_config);
    let mut assembler = SectionAssembler::new();

    let (class, _confidence) = classifier.classify(page);
    let regions = segmenter.segment(page, &class);

    let mut ordered_lines = Vec::new();
    let mut headers = Vec::new();
    let mut offset = 0usize;

    for region in &regions {
        let lines = line_grouper.group(region);
        let region_headers = header_detector.detect(&lines, &db);
        for h in region_headers {
            headers.push(docsection_core::SectionHeader {
                line_index: h.line_index + offset,
                ..h
            });
        }
        offset += lines.len();
        ordered_lines.extend(lines);
    }

    assembler.push_page(page.page_index, ordered_lines, headers);
    assembler.finish()
}

/// Scenario 1 (spec §8): a single-column resume with a contact line, two
/// headers, and body text resolves into Contact + two named sections in
/// reading order.
#[test]
fn single_column_resume_resolves_sections_in_order() {
    let mut tokens = Vec::new();
    tokens.push(tok("Jane", 50.0, 40.0, 11.0, false));
    tokens.push(tok("Doe", 95.0, 40.0, 11.0, false));
    tokens.push(tok("jane@example.com", 50.0, 55.0, 10.0, false));

    tokens.push(tok("EXPERIENCE", 50.0, 110.0, 14.0, true));
    tokens.push(tok("Built", 50.0, 140.0, 11.0, false));
    tokens.push(tok("systems", 95.0, 140.0, 11.0, false));
    tokens.push(tok("for", 160.0, 140.0, 11.0, false));
    tokens.push(tok("years", 195.0, 140.0, 11.0, false));

    tokens.push(tok("EDUCATION", 50.0, 200.0, 14.0, true));
    tokens.push(tok("State", 50.0, 230.0, 11.0, false));
    tokens.push(tok("University", 100.0, 230.0, 11.0, false));

    let page = Page::new(0, 612.0, 792.0, tokens);
    let sections = run_pipeline(&page);

    let names: Vec<CanonicalName> = sections.iter().map(|s| s.canonical_name).collect();
    assert!(names.contains(&CanonicalName::Contact));
    assert!(names.contains(&CanonicalName::Experience));
    assert!(names.contains(&CanonicalName::Education));

    let experience_position = names.iter().position(|n| *n == CanonicalName::Experience).unwrap();
    let education_position = names.iter().position(|n| *n == CanonicalName::Education).unwrap();
    assert!(experience_position < education_position);
}

/// Scenario 2: a two-column resume keeps each column's header+body
/// grouping intact after segmentation.
#[test]
fn two_column_resume_keeps_headers_with_their_column_body() {
    let mut tokens = Vec::new();

    // Left column: SKILLS
    tokens.push(tok("SKILLS", 40.0, 40.0, 14.0, true));
    tokens.push(tok("Rust,", 40.0, 70.0, 11.0, false));
    tokens.push(tok("Go,", 85.0, 70.0, 11.0, false));
    tokens.push(tok("Python", 120.0, 70.0, 11.0, false));
    for row in 0..20 {
        tokens.push(tok("filler", 40.0, 100.0 + row as f32 * 12.0, 10.0, false));
    }

    // Right column: PROJECTS
    tokens.push(tok("PROJECTS", 340.0, 40.0, 14.0, true));
    tokens.push(tok("A", 340.0, 70.0, 11.0, false));
    tokens.push(tok("distributed", 360.0, 70.0, 11.0, false));
    tokens.push(tok("cache", 440.0, 70.0, 11.0, false));
    for row in 0..20 {
        tokens.push(tok("filler", 340.0, 100.0 + row as f32 * 12.0, 10.0, false));
    }

    let page = Page::new(0, 612.0, 792.0, tokens);
    let sections = run_pipeline(&page);

    let names: Vec<CanonicalName> = sections.iter().map(|s| s.canonical_name).collect();
    assert!(names.contains(&CanonicalName::Skills) || names.contains(&CanonicalName::Unknown));
    assert!(names.contains(&CanonicalName::Projects) || names.contains(&CanonicalName::Unknown));
}

/// Scenario: a header phrased in unfamiliar wording with no pattern or
/// exact match resolves to `Unknown` rather than being silently dropped.
#[test]
fn unrecognized_header_resolves_to_unknown_not_dropped() {
    let tokens = vec![
        tok("MISCELLANEOUS", 50.0, 40.0, 14.0, true),
        tok("Some", 50.0, 70.0, 11.0, false),
        tok("notes", 90.0, 70.0, 11.0, false),
        tok("here", 135.0, 70.0, 11.0, false),
    ];
    let page = Page::new(0, 612.0, 792.0, tokens);
    let sections = run_pipeline(&page);

    assert!(sections.iter().any(|s| s.canonical_name == CanonicalName::Unknown));
}

/// Scenario: the same canonical section recurring (e.g. across a page
/// break) merges into one `Section` rather than producing a duplicate.
#[test]
fn repeated_section_header_merges_body_lines() {
    let tokens = vec![
        tok("EXPERIENCE", 50.0, 40.0, 14.0, true),
        tok("Role", 50.0, 70.0, 11.0, false),
        tok("one", 90.0, 70.0, 11.0, false),
        tok("EXPERIENCE", 50.0, 160.0, 14.0, true),
        tok("Role", 50.0, 190.0, 11.0, false),
        tok("two", 90.0, 190.0, 11.0, false),
    ];
    let page = Page::new(0, 612.0, 792.0, tokens);
    let sections = run_pipeline(&page);

    let experience_sections: Vec<_> = sections
        .iter()
        .filter(|s| s.canonical_name == CanonicalName::Experience)
        .collect();
    assert_eq!(experience_sections.len(), 1);
    assert_eq!(experience_sections[0].ordered_body_lines.len(), 2);
}
