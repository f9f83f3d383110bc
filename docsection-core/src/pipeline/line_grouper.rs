//! C4 — Line Grouper (spec §4.4).
//!
//! Sweeps a column's tokens top-down, opening a new `Line` whenever a token
//! falls outside the current line's vertical-overlap tolerance, then merges
//! continuation fragments left behind by rotated glyphs or sub/superscripts.
//! Grounded in the sort-by-`(y,x)`-then-walk idiom from the teacher's
//! `preprocessors/pdf/xhtml_parser.rs`, and the vertical-gap merge logic from
//! `rules/spatial_clustering.rs`.

use crate::config::LineGrouperConfig;
use crate::types::{ColumnRegion, Line, Token};

pub struct LineGrouper<'a> {
    config: &'a LineGrouperConfig,
}

impl<'a> LineGrouper<'a> {
    pub fn new(config: &'a LineGrouperConfig) -> Self {
        Self { config }
    }

    pub fn group(&self, region: &ColumnRegion) -> Vec<Line> {
        let mut tokens = region.tokens.clone();
        tokens.sort_by(|a, b| {
            a.bbox
                .y0
                .partial_cmp(&b.bbox.y0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(std::cmp::Ordering::Equal))
        });

        let lines = self.sweep(region, tokens);
        self.merge_continuations(lines)
    }

    /// Sweep top-down opening a new line whenever a token's `y0` exceeds the
    /// current line's tolerance band: `y0 > line.y_bot - τ * line.height`
    /// (spec §4.4 step 2).
    fn sweep(&self, region: &ColumnRegion, tokens: Vec<Token>) -> Vec<Line> {
        let mut lines: Vec<Line> = Vec::new();

        for token in tokens {
            let opens_new_line = match lines.last() {
                None => true,
                Some(current) => {
                    let tau = self.config.y_tolerance_fraction;
                    let height = current.height().max(token.bbox.height());
                    token.bbox.y0 > current.y_bot - tau * height
                }
            };

            if opens_new_line {
                lines.push(Line {
                    page_index: region.page_index,
                    column_index: region.column_index,
                    y_top: token.bbox.y0,
                    y_bot: token.bbox.y1,
                    tokens: vec![token],
                });
            } else {
                let current = lines.last_mut().unwrap();
                current.y_top = current.y_top.min(token.bbox.y0);
                current.y_bot = current.y_bot.max(token.bbox.y1);
                current.tokens.push(token);
            }
        }

        for line in &mut lines {
            line.tokens
                .sort_by(|a, b| a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(std::cmp::Ordering::Equal));
        }

        lines
    }

    /// Merge a line into its predecessor when the vertical gap between them
    /// is under `continuation_gap_fraction * min(line heights)` and their
    /// x-ranges do not overlap — a fragment left by a rotated glyph or a
    /// footnote marker rather than a true new line (spec §4.4 step 4).
    fn merge_continuations(&self, lines: Vec<Line>) -> Vec<Line> {
        let mut merged: Vec<Line> = Vec::new();

        for line in lines {
            let should_merge = merged.last().map_or(false, |prev: &Line| {
                let gap = line.y_top - prev.y_bot;
                let min_height = prev.height().min(line.height()).max(1.0);
                let threshold = self.config.continuation_gap_fraction * min_height;
                let line_x_max = line.tokens.last().map(|t| t.bbox.x1).unwrap_or(0.0);
                let x_disjoint = line.x0() > prev_x_max(prev) || line_x_max < prev.x0();
                gap >= 0.0 && gap < threshold && x_disjoint
            });

            if should_merge {
                let prev = merged.last_mut().unwrap();
                prev.y_bot = prev.y_bot.max(line.y_bot);
                prev.tokens.extend(line.tokens);
                prev.tokens
                    .sort_by(|a, b| a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(std::cmp::Ordering::Equal));
            } else {
                merged.push(line);
            }
        }

        merged
    }
}

fn prev_x_max(line: &Line) -> f32 {
    line.tokens.last().map(|t| t.bbox.x1).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BBox, FontFlags};

    fn tok(x0: f32, y0: f32, h: f32) -> Token {
        Token {
            text: "w".into(),
            page: 0,
            bbox: BBox::new(x0, y0, x0 + 8.0, y0 + h),
            font_size: 12.0,
            font_flags: FontFlags::default(),
            color: None,
            confidence: 1.0,
        }
    }

    fn region(tokens: Vec<Token>) -> ColumnRegion {
        ColumnRegion {
            page_index: 0,
            column_index: Some(0),
            x_bounds: (0.0, 600.0),
            tokens,
        }
    }

    #[test]
    fn tokens_on_same_baseline_join_one_line() {
        let r = region(vec![tok(10.0, 100.0, 12.0), tok(60.0, 101.0, 12.0), tok(110.0, 100.0, 12.0)]);
        let config = LineGrouperConfig::default();
        let lines = LineGrouper::new(&config).group(&r);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].tokens.len(), 3);
    }

    #[test]
    fn tokens_on_different_baselines_split_into_lines() {
        let r = region(vec![tok(10.0, 100.0, 12.0), tok(10.0, 130.0, 12.0)]);
        let config = LineGrouperConfig::default();
        let lines = LineGrouper::new(&config).group(&r);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn fragment_left_of_previous_line_merges_as_continuation() {
        // A footnote marker or rotated-glyph fragment sitting entirely to the
        // left of the previous line's x-range, at a small vertical gap.
        let prev = Line {
            page_index: 0,
            column_index: Some(0),
            y_top: 100.0,
            y_bot: 112.0,
            tokens: vec![tok(100.0, 100.0, 12.0), tok(150.0, 100.0, 12.0)],
        };
        let fragment = Line {
            page_index: 0,
            column_index: Some(0),
            y_top: 113.0,
            y_bot: 123.0,
            tokens: vec![tok(5.0, 113.0, 10.0)],
        };
        let config = LineGrouperConfig {
            y_tolerance_fraction: 0.5,
            continuation_gap_fraction: 1.0,
        };
        let grouper = LineGrouper::new(&config);
        let merged = grouper.merge_continuations(vec![prev, fragment]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].tokens.len(), 3);
    }

    #[test]
    fn line_ordered_left_to_right() {
        let r = region(vec![tok(100.0, 100.0, 12.0), tok(10.0, 100.0, 12.0)]);
        let config = LineGrouperConfig::default();
        let lines = LineGrouper::new(&config).group(&r);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].tokens[0].bbox.x0, 10.0);
    }
}
