//! C5 — Section Header Detector (spec §4.5).
//!
//! Scores each line as a header candidate using a weighted blend of cheap,
//! independent signals, then compares against an adaptive threshold θ that
//! tightens or loosens with how strongly the page's font sizes cluster.
//! Generalizes the signal-based classification shape of the teacher's
//! `rules/section_detection.rs` (there: hierarchy-depth tracking from style
//! heuristics) into the spec's explicit weighted-score model.

use crate::config::HeaderDetectorConfig;
use crate::pipeline::section_db::SectionDatabase;
use crate::types::{CanonicalName, Line, MatchKind, SectionHeader};

pub struct HeaderDetector<'a> {
    config: &'a HeaderDetectorConfig,
}

/// Two distinct section headers sharing a single line within one column
/// region — the multi-section header case from spec §4.3 step 3 / §4.5
/// multi-section, where the column classifier grouped two side-by-side
/// sections into one region. `anchor_x` is the midpoint of the gap between
/// the two header token groups, handed to
/// `ColumnSegmenter::resplit_at_anchor` to re-split the region.
#[derive(Debug, Clone)]
pub struct MultiHeaderSplit {
    pub line_index: usize,
    pub anchor_x: f32,
    pub left_text: String,
    pub right_text: String,
    pub left_name: CanonicalName,
    pub right_name: CanonicalName,
}

struct Signals {
    known_variant: f32,
    short_line: f32,
    case_pattern: f32,
    bold_majority: f32,
    large_font: f32,
    space_above: f32,
    trailing_colon: f32,
}

impl<'a> HeaderDetector<'a> {
    pub fn new(config: &'a HeaderDetectorConfig) -> Self {
        Self { config }
    }

    /// Score every line in a column's line sequence and emit the subset that
    /// crosses θ as `SectionHeader`s, in line order.
    pub fn detect(&self, lines: &[Line], db: &SectionDatabase) -> Vec<SectionHeader> {
        let median_font = self.median_font_size(lines);
        let theta = self.adaptive_theta(lines, median_font);

        let mut headers = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            if self.looks_like_bullet_body(line) {
                continue;
            }

            let signals = self.compute_signals(line, lines.get(i.wrapping_sub(1)), median_font, db);
            let score = self.weighted_score(&signals);

            if score >= theta {
                let (canonical_name, match_kind, _hint_confidence) = db.match_line(&line.text());
                headers.push(SectionHeader {
                    line_index: i,
                    canonical_name,
                    match_kind,
                    score,
                });
            }
        }

        self.demote_consecutive(headers, lines)
    }

    /// Look for a line whose largest inter-token horizontal gap separates
    /// two groups of tokens that each resolve, independently, to a distinct
    /// known canonical name. That shape means the column region spans two
    /// side-by-side sections rather than one (spec §4.3 step 3).
    pub fn detect_multi_header(&self, lines: &[Line], db: &SectionDatabase) -> Option<MultiHeaderSplit> {
        for (i, line) in lines.iter().enumerate() {
            if line.tokens.len() < 2 {
                continue;
            }

            let (gap_idx, gap_size) = line
                .tokens
                .windows(2)
                .enumerate()
                .map(|(idx, pair)| (idx, pair[1].bbox.x0 - pair[0].bbox.x1))
                .fold((0usize, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

            let min_gap = line.height().max(1.0) * self.config.multi_header_gap_multiple;
            if gap_size < min_gap {
                continue;
            }

            let left_tokens = &line.tokens[..=gap_idx];
            let right_tokens = &line.tokens[gap_idx + 1..];
            let left_text = left_tokens.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" ");
            let right_text = right_tokens.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" ");

            let (left_name, _, _) = db.match_line(&left_text);
            let (right_name, _, _) = db.match_line(&right_text);

            if left_name != CanonicalName::Unknown && right_name != CanonicalName::Unknown && left_name != right_name {
                let anchor_x = (left_tokens.last().unwrap().bbox.x1 + right_tokens.first().unwrap().bbox.x0) / 2.0;
                return Some(MultiHeaderSplit {
                    line_index: i,
                    anchor_x,
                    left_text,
                    right_text,
                    left_name,
                    right_name,
                });
            }
        }
        None
    }

    fn looks_like_bullet_body(&self, line: &Line) -> bool {
        let trimmed = line.text().trim_start();
        trimmed.starts_with('•') || trimmed.starts_with('-') || trimmed.starts_with('*') || trimmed.starts_with('·')
    }

    fn median_font_size(&self, lines: &[Line]) -> f32 {
        if lines.is_empty() {
            return 12.0;
        }
        let mut sizes: Vec<f32> = lines.iter().map(|l| l.max_font_size()).collect();
        sizes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        sizes[sizes.len() / 2]
    }

    /// σ/μ of line font sizes drives θ: strongly clustered sizes (low σ/μ)
    /// imply any outlier is meaningful, so θ lowers; noisy sizes raise θ to
    /// resist false positives (spec §4.5 adaptive threshold).
    fn adaptive_theta(&self, lines: &[Line], mean: f32) -> f32 {
        if let Some(override_theta) = self.config.theta_override {
            return override_theta;
        }
        if lines.is_empty() || mean <= 0.0 {
            return self.config.theta_default;
        }

        let sizes: Vec<f32> = lines.iter().map(|l| l.max_font_size()).collect();
        let variance = sizes.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / sizes.len() as f32;
        let sigma = variance.sqrt();
        let ratio = sigma / mean;

        if ratio >= self.config.sigma_mu_high {
            self.config.theta_min
        } else if ratio <= self.config.sigma_mu_low {
            self.config.theta_max
        } else {
            self.config.theta_default
        }
    }

    fn compute_signals(
        &self,
        line: &Line,
        previous: Option<&Line>,
        median_font: f32,
        db: &SectionDatabase,
    ) -> Signals {
        let text = line.text();
        let trimmed = text.trim();
        let word_count = line.tokens.len();

        let (_, _, known_variant) = db.match_line(trimmed);

        let short_line = if word_count <= 4 {
            1.0
        } else {
            (1.0 - (word_count as f32 - 4.0) / 8.0).max(0.0)
        };

        let case_pattern = if Self::is_all_caps(trimmed) || Self::is_title_case(trimmed) {
            1.0
        } else {
            0.0
        };

        let bold_majority = line.bold_ratio();

        let large_font = if median_font > 0.0 {
            ((line.max_font_size() / median_font) - 1.0).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let space_above = match previous {
            Some(prev) => {
                let gap = line.y_top - prev.y_bot;
                let typical = prev.height().max(1.0);
                (gap / typical - 1.0).clamp(0.0, 1.0)
            }
            None => 1.0,
        };

        let trailing_colon = if trimmed.ends_with(':') { 1.0 } else { 0.0 };

        Signals {
            known_variant,
            short_line,
            case_pattern,
            bold_majority,
            large_font,
            space_above,
            trailing_colon,
        }
    }

    fn weighted_score(&self, s: &Signals) -> f32 {
        let w = &self.config.weights;
        w.known_variant * s.known_variant
            + w.short_line * s.short_line
            + w.case_pattern * s.case_pattern
            + w.bold_majority * s.bold_majority
            + w.large_font * s.large_font
            + w.space_above * s.space_above
            + w.trailing_colon * s.trailing_colon
    }

    fn is_all_caps(text: &str) -> bool {
        let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
        !letters.is_empty() && letters.iter().all(|c| c.is_uppercase())
    }

    fn is_title_case(text: &str) -> bool {
        let words: Vec<&str> = text.split_whitespace().collect();
        !words.is_empty()
            && words
                .iter()
                .all(|w| w.chars().next().map(|c| c.is_uppercase()).unwrap_or(false))
    }

    /// When two header-scored lines sit closer than
    /// `demotion_gap_multiple * line height` apart, only the higher-scoring
    /// one survives as a header; the other reverts to body text (spec §4.5
    /// demotion rule — guards against a subtitle under a title both scoring
    /// above θ).
    fn demote_consecutive(&self, mut headers: Vec<SectionHeader>, lines: &[Line]) -> Vec<SectionHeader> {
        let mut i = 1;
        while i < headers.len() {
            let prev_idx = headers[i - 1].line_index;
            let cur_idx = headers[i].line_index;
            let prev_line = &lines[prev_idx];
            let cur_line = &lines[cur_idx];
            let gap = cur_line.y_top - prev_line.y_bot;
            let typical = prev_line.height().max(1.0);

            if gap < self.config.demotion_gap_multiple * typical {
                if headers[i - 1].score >= headers[i].score {
                    headers.remove(i);
                } else {
                    headers.remove(i - 1);
                }
            } else {
                i += 1;
            }
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BBox, FontFlags, Token};

    fn line(text: &str, y_top: f32, font_size: f32, bold: bool) -> Line {
        let tokens: Vec<Token> = text
            .split_whitespace()
            .enumerate()
            .map(|(i, w)| Token {
                text: w.to_string(),
                page: 0,
                bbox: BBox::new(10.0 + i as f32 * 40.0, y_top, 10.0 + i as f32 * 40.0 + 35.0, y_top + font_size),
                font_size,
                font_flags: FontFlags {
                    bold,
                    italic: false,
                    monospace: false,
                },
                color: None,
                confidence: 1.0,
            })
            .collect();
        Line {
            page_index: 0,
            column_index: Some(0),
            y_top,
            y_bot: y_top + font_size,
            tokens,
        }
    }

    fn db() -> SectionDatabase {
        SectionDatabase::with_builtin_defaults()
    }

    #[test]
    fn bold_all_caps_short_line_scores_as_header() {
        let lines = vec![
            line("Professional Summary filler text continues on and on here", 100.0, 11.0, false),
            line("EXPERIENCE", 160.0, 14.0, true),
            line("Worked on various projects across several teams", 190.0, 11.0, false),
        ];
        let config = HeaderDetectorConfig::default();
        let detector = HeaderDetector::new(&config);
        let headers = detector.detect(&lines, &db());
        assert!(headers.iter().any(|h| h.line_index == 1));
    }

    #[test]
    fn wide_gap_line_with_two_known_names_is_a_multi_header_split() {
        let mut tokens = Vec::new();
        tokens.push(Token {
            text: "Skills".into(),
            page: 0,
            bbox: BBox::new(10.0, 100.0, 60.0, 112.0),
            font_size: 12.0,
            font_flags: FontFlags::default(),
            color: None,
            confidence: 1.0,
        });
        tokens.push(Token {
            text: "Experience".into(),
            page: 0,
            bbox: BBox::new(400.0, 100.0, 470.0, 112.0),
            font_size: 12.0,
            font_flags: FontFlags::default(),
            color: None,
            confidence: 1.0,
        });
        let lines = vec![Line {
            page_index: 0,
            column_index: Some(0),
            y_top: 100.0,
            y_bot: 112.0,
            tokens,
        }];
        let config = HeaderDetectorConfig::default();
        let detector = HeaderDetector::new(&config);
        let split = detector.detect_multi_header(&lines, &db()).expect("two known names at a wide gap");
        assert_eq!(split.left_name, crate::types::CanonicalName::Skills);
        assert_eq!(split.right_name, crate::types::CanonicalName::Experience);
        assert!(split.anchor_x > 60.0 && split.anchor_x < 400.0);
    }

    #[test]
    fn plain_body_line_does_not_score_as_header() {
        let lines = vec![line(
            "This is a long body sentence describing prior work experience in detail",
            100.0,
            11.0,
            false,
        )];
        let config = HeaderDetectorConfig::default();
        let detector = HeaderDetector::new(&config);
        let headers = detector.detect(&lines, &db());
        assert!(headers.is_empty());
    }
}
