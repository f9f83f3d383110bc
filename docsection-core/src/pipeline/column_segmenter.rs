//! C3 — Column Segmenter (spec §4.3).
//!
//! Partitions a page's tokens into `ColumnRegion`s according to the
//! `LayoutClass` produced by C2. Token-to-column assignment and the
//! multi-header re-split rule are grounded in the adjacency/merge shape of
//! the teacher's `rules/spatial_clustering.rs`.

use crate::types::{ColumnRegion, LayoutClass, Page, Token};

pub struct ColumnSegmenter;

impl ColumnSegmenter {
    const MIN_RESPLIT_TOKENS: usize = 5;

    pub fn new() -> Self {
        Self
    }

    pub fn segment(&self, page: &Page, class: &LayoutClass) -> Vec<ColumnRegion> {
        let regions = match class {
            LayoutClass::Type1 => vec![ColumnRegion {
                page_index: page.page_index,
                column_index: Some(0),
                x_bounds: (0.0, page.width),
                tokens: page.tokens.clone(),
            }],
            LayoutClass::Type2 { column_bounds } => {
                self.assign_to_bounds(page, column_bounds, None)
            }
            LayoutClass::Type3 {
                bands,
                column_bounds_per_band,
            } => self.segment_bands(page, bands, column_bounds_per_band),
        };

        self.resplit_multi_header_columns(regions)
    }

    /// Assign each token to the column whose bounds contain its x-center,
    /// breaking ties toward the closer centroid (spec §4.3 step 1).
    fn assign_to_bounds(
        &self,
        page: &Page,
        bounds: &[(f32, f32)],
        y_range: Option<(f32, f32)>,
    ) -> Vec<ColumnRegion> {
        let mut buckets: Vec<Vec<Token>> = vec![Vec::new(); bounds.len().max(1)];

        let tokens_iter = page.tokens.iter().filter(|t| match y_range {
            Some((y0, y1)) => t.bbox.y0 >= y0 && t.bbox.y0 < y1,
            None => true,
        });

        for token in tokens_iter {
            let center = token.bbox.x_center();
            let idx = bounds
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    let da = Self::distance_to_bounds(center, *a);
                    let db = Self::distance_to_bounds(center, *b);
                    da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(i, _)| i)
                .unwrap_or(0);
            buckets[idx].push(token.clone());
        }

        bounds
            .iter()
            .enumerate()
            .map(|(i, x_bounds)| ColumnRegion {
                page_index: page.page_index,
                column_index: Some(i as u32),
                x_bounds: *x_bounds,
                tokens: buckets[i].clone(),
            })
            .collect()
    }

    fn distance_to_bounds(center: f32, bounds: &(f32, f32)) -> f32 {
        if center >= bounds.0 && center <= bounds.1 {
            0.0
        } else if center < bounds.0 {
            bounds.0 - center
        } else {
            center - bounds.1
        }
    }

    fn segment_bands(
        &self,
        page: &Page,
        bands: &[(f32, f32)],
        column_bounds_per_band: &[Vec<(f32, f32)>],
    ) -> Vec<ColumnRegion> {
        let mut out = Vec::new();
        for (band, bounds) in bands.iter().zip(column_bounds_per_band.iter()) {
            if bounds.len() <= 1 {
                let tokens: Vec<Token> = page
                    .tokens
                    .iter()
                    .filter(|t| t.bbox.y0 >= band.0 && t.bbox.y0 < band.1)
                    .cloned()
                    .collect();
                out.push(ColumnRegion {
                    page_index: page.page_index,
                    column_index: None,
                    x_bounds: (0.0, page.width),
                    tokens,
                });
            } else {
                out.extend(self.assign_to_bounds(page, bounds, Some(*band)));
            }
        }
        out
    }

    /// Columns left with under 5 tokens after layout classification are
    /// folded back into their nearest surviving neighbor rather than
    /// emitted as a degenerate region. The multi-section-header case (two
    /// distinct headers sharing one column at the same vertical extent) is
    /// handled separately by `resplit_at_anchor`, once `HeaderDetector` has
    /// located the header line and its anchor x-position.
    fn resplit_multi_header_columns(&self, mut regions: Vec<ColumnRegion>) -> Vec<ColumnRegion> {
        let mut i = 0;
        while i < regions.len() {
            if regions[i].tokens.len() < Self::MIN_RESPLIT_TOKENS && regions.len() > 1 {
                let donor_tokens = std::mem::take(&mut regions[i].tokens);
                let target = if i == 0 { 1 } else { i - 1 };
                regions[target].tokens.extend(donor_tokens);
                regions.remove(i);
            } else {
                i += 1;
            }
        }
        regions
    }

    /// Re-anchor one column region into two at `anchor_x` — the midpoint
    /// between two header token groups `HeaderDetector::detect_multi_header`
    /// found sharing a single line (spec §4.3 step 3). Tokens are assigned
    /// by x-center, same rule as `assign_to_bounds`. Returns `None` when
    /// either side would fall under the 5-token minimum, in which case the
    /// caller keeps the region unsplit.
    pub fn resplit_at_anchor(&self, region: &ColumnRegion, anchor_x: f32) -> Option<(ColumnRegion, ColumnRegion)> {
        let (left, right): (Vec<Token>, Vec<Token>) =
            region.tokens.iter().cloned().partition(|t| t.bbox.x_center() < anchor_x);

        if left.len() < Self::MIN_RESPLIT_TOKENS || right.len() < Self::MIN_RESPLIT_TOKENS {
            return None;
        }

        let left_region = ColumnRegion {
            page_index: region.page_index,
            column_index: region.column_index,
            x_bounds: (region.x_bounds.0, anchor_x),
            tokens: left,
        };
        let right_region = ColumnRegion {
            page_index: region.page_index,
            column_index: region.column_index.map(|i| i + 1),
            x_bounds: (anchor_x, region.x_bounds.1),
            tokens: right,
        };
        Some((left_region, right_region))
    }
}

impl Default for ColumnSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BBox, FontFlags};

    fn tok(x0: f32, y0: f32) -> Token {
        Token {
            text: "w".into(),
            page: 0,
            bbox: BBox::new(x0, y0, x0 + 8.0, y0 + 10.0),
            font_size: 12.0,
            font_flags: FontFlags::default(),
            color: None,
            confidence: 1.0,
        }
    }

    #[test]
    fn type1_produces_single_region_with_all_tokens() {
        let page = Page::new(0, 600.0, 800.0, vec![tok(10.0, 10.0), tok(500.0, 10.0)]);
        let regions = ColumnSegmenter::new().segment(&page, &LayoutClass::Type1);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].tokens.len(), 2);
    }

    #[test]
    fn type2_splits_tokens_by_column_bounds() {
        let page = Page::new(
            0,
            600.0,
            800.0,
            vec![tok(10.0, 10.0), tok(20.0, 10.0), tok(500.0, 10.0), tok(520.0, 10.0), tok(540.0, 10.0), tok(560.0, 10.0)],
        );
        let class = LayoutClass::Type2 {
            column_bounds: vec![(0.0, 300.0), (300.0, 600.0)],
        };
        let regions = ColumnSegmenter::new().segment(&page, &class);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].tokens.len(), 2);
        assert_eq!(regions[1].tokens.len(), 4);
    }

    #[test]
    fn sparse_column_merges_into_neighbor() {
        let page = Page::new(
            0,
            600.0,
            800.0,
            vec![
                tok(10.0, 10.0),
                tok(20.0, 10.0),
                tok(30.0, 10.0),
                tok(40.0, 10.0),
                tok(50.0, 10.0),
                tok(60.0, 10.0),
                tok(500.0, 10.0),
            ],
        );
        let class = LayoutClass::Type2 {
            column_bounds: vec![(0.0, 300.0), (300.0, 600.0)],
        };
        let regions = ColumnSegmenter::new().segment(&page, &class);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].tokens.len(), 7);
    }

    #[test]
    fn resplit_at_anchor_splits_when_both_sides_clear_the_gate() {
        let mut tokens: Vec<Token> = (0..6).map(|i| tok(10.0 + i as f32 * 20.0, 10.0)).collect();
        tokens.extend((0..6).map(|i| tok(400.0 + i as f32 * 20.0, 10.0)));
        let region = ColumnRegion {
            page_index: 0,
            column_index: Some(0),
            x_bounds: (0.0, 600.0),
            tokens,
        };
        let split = ColumnSegmenter::new().resplit_at_anchor(&region, 300.0);
        let (left, right) = split.expect("both sides clear the 5-token gate");
        assert_eq!(left.tokens.len(), 6);
        assert_eq!(right.tokens.len(), 6);
    }

    #[test]
    fn resplit_at_anchor_refuses_when_one_side_is_too_sparse() {
        let mut tokens: Vec<Token> = vec![tok(10.0, 10.0), tok(30.0, 10.0)];
        tokens.extend((0..6).map(|i| tok(400.0 + i as f32 * 20.0, 10.0)));
        let region = ColumnRegion {
            page_index: 0,
            column_index: Some(0),
            x_bounds: (0.0, 600.0),
            tokens,
        };
        let split = ColumnSegmenter::new().resplit_at_anchor(&region, 300.0);
        assert!(split.is_none());
    }
}
