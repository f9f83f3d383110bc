//! Pipeline configuration: built-in defaults, optional YAML override file,
//! then environment-knob overrides (spec §6), in that precedence order —
//! the same three-tier layering the teacher's `ConfigManager` uses for its
//! per-document-type configs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_bin_count() -> u32 {
    150
}
fn default_peak_threshold() -> f32 {
    0.35
}
fn default_valley_floor() -> f32 {
    0.08
}
fn default_top_margin_pct() -> f32 {
    0.08
}
fn default_bottom_margin_pct() -> f32 {
    0.05
}
fn default_min_column_width_pct() -> f32 {
    0.08
}
fn default_min_tokens_for_classification() -> usize {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramConfig {
    /// Number of x-axis bins, `N ∈ [100,200]` (spec §4.2 step 1).
    #[serde(default = "default_bin_count")]
    pub bin_count: u32,
    /// Local-maxima threshold on the normalized histogram.
    #[serde(default = "default_peak_threshold")]
    pub peak_threshold: f32,
    /// Valley depth below which a gutter is considered to "reach floor".
    #[serde(default = "default_valley_floor")]
    pub valley_floor: f32,
    #[serde(default = "default_top_margin_pct")]
    pub top_margin_pct: f32,
    #[serde(default = "default_bottom_margin_pct")]
    pub bottom_margin_pct: f32,
    /// Columns narrower than this fraction of page width merge into a neighbor.
    #[serde(default = "default_min_column_width_pct")]
    pub min_column_width_pct: f32,
    #[serde(default = "default_min_tokens_for_classification")]
    pub min_tokens_for_classification: usize,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            bin_count: default_bin_count(),
            peak_threshold: default_peak_threshold(),
            valley_floor: default_valley_floor(),
            top_margin_pct: default_top_margin_pct(),
            bottom_margin_pct: default_bottom_margin_pct(),
            min_column_width_pct: default_min_column_width_pct(),
            min_tokens_for_classification: default_min_tokens_for_classification(),
        }
    }
}

fn default_y_tolerance_fraction() -> f32 {
    0.5
}
fn default_continuation_gap_fraction() -> f32 {
    0.15
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineGrouperConfig {
    /// `τ` in spec §4.4 step 2.
    #[serde(default = "default_y_tolerance_fraction")]
    pub y_tolerance_fraction: f32,
    /// Gap fraction below which two adjacent lines are merged as a
    /// continuation fragment (spec §4.4 step 4).
    #[serde(default = "default_continuation_gap_fraction")]
    pub continuation_gap_fraction: f32,
}

impl Default for LineGrouperConfig {
    fn default() -> Self {
        Self {
            y_tolerance_fraction: default_y_tolerance_fraction(),
            continuation_gap_fraction: default_continuation_gap_fraction(),
        }
    }
}

/// Header-detector signal weights (spec §4.5 table). Must sum to ≤ 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderWeights {
    pub known_variant: f32,
    pub short_line: f32,
    pub case_pattern: f32,
    pub bold_majority: f32,
    pub large_font: f32,
    pub space_above: f32,
    pub trailing_colon: f32,
}

impl Default for HeaderWeights {
    fn default() -> Self {
        Self {
            known_variant: 0.40,
            short_line: 0.10,
            case_pattern: 0.15,
            bold_majority: 0.10,
            large_font: 0.10,
            space_above: 0.10,
            trailing_colon: 0.05,
        }
    }
}

fn default_theta_min() -> f32 {
    0.25
}
fn default_theta_max() -> f32 {
    0.40
}
fn default_theta_default() -> f32 {
    0.30
}
fn default_sigma_mu_high() -> f32 {
    0.5
}
fn default_sigma_mu_low() -> f32 {
    0.3
}
fn default_demotion_gap_multiple() -> f32 {
    2.0
}
fn default_multi_header_gap_multiple() -> f32 {
    4.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderDetectorConfig {
    #[serde(default)]
    pub weights: HeaderWeights,
    #[serde(default = "default_theta_min")]
    pub theta_min: f32,
    #[serde(default = "default_theta_max")]
    pub theta_max: f32,
    #[serde(default = "default_theta_default")]
    pub theta_default: f32,
    /// σ/μ of line font sizes above which contrast is "strong" (lower θ).
    #[serde(default = "default_sigma_mu_high")]
    pub sigma_mu_high: f32,
    /// σ/μ below which contrast is "weak" (raise θ).
    #[serde(default = "default_sigma_mu_low")]
    pub sigma_mu_low: f32,
    /// Explicit override disabling adaptive θ (`HEADER_SCORE_THRESHOLD_OVERRIDE`).
    #[serde(default)]
    pub theta_override: Option<f32>,
    #[serde(default = "default_demotion_gap_multiple")]
    pub demotion_gap_multiple: f32,
    /// A line's largest inter-token gap must be at least this multiple of
    /// its height to be considered a candidate multi-section-header split
    /// (spec §4.3 step 3).
    #[serde(default = "default_multi_header_gap_multiple")]
    pub multi_header_gap_multiple: f32,
}

impl Default for HeaderDetectorConfig {
    fn default() -> Self {
        Self {
            weights: HeaderWeights::default(),
            theta_min: default_theta_min(),
            theta_max: default_theta_max(),
            theta_default: default_theta_default(),
            sigma_mu_high: default_sigma_mu_high(),
            sigma_mu_low: default_sigma_mu_low(),
            theta_override: None,
            demotion_gap_multiple: default_demotion_gap_multiple(),
            multi_header_gap_multiple: default_multi_header_gap_multiple(),
        }
    }
}

fn default_ocr_dpi() -> u32 {
    300
}
fn default_ocr_languages() -> Vec<String> {
    vec!["en".to_string()]
}
fn default_min_alpha_chars() -> usize {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordSourceConfig {
    #[serde(default = "default_ocr_dpi")]
    pub ocr_dpi: u32,
    #[serde(default = "default_ocr_languages")]
    pub ocr_languages: Vec<String>,
    #[serde(default)]
    pub ocr_gpu: bool,
    /// Minimum alphabetic-character count below which a page's text layer
    /// is treated as empty (spec §4.1).
    #[serde(default = "default_min_alpha_chars")]
    pub min_alpha_chars: usize,
}

impl Default for WordSourceConfig {
    fn default() -> Self {
        Self {
            ocr_dpi: default_ocr_dpi(),
            ocr_languages: default_ocr_languages(),
            ocr_gpu: false,
            min_alpha_chars: default_min_alpha_chars(),
        }
    }
}

fn default_section_db_path() -> String {
    "config/sections_database".to_string()
}
fn default_embedding_similarity_threshold() -> f32 {
    0.68
}
fn default_learn_score_threshold() -> f32 {
    0.70
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionDbConfig {
    #[serde(default = "default_section_db_path")]
    pub path: String,
    #[serde(default)]
    pub embeddings_enabled: bool,
    #[serde(default = "default_embedding_similarity_threshold")]
    pub embedding_similarity_threshold: f32,
    #[serde(default = "default_learn_score_threshold")]
    pub learn_score_threshold: f32,
}

impl Default for SectionDbConfig {
    fn default() -> Self {
        Self {
            path: default_section_db_path(),
            embeddings_enabled: false,
            embedding_similarity_threshold: default_embedding_similarity_threshold(),
            learn_score_threshold: default_learn_score_threshold(),
        }
    }
}

fn default_max_fallback_strategies() -> u32 {
    3
}
fn default_quality_excellent() -> f32 {
    0.8
}
fn default_quality_acceptable() -> f32 {
    0.6
}
fn default_quality_poor() -> f32 {
    0.4
}
fn default_token_acquisition_timeout_secs() -> u64 {
    60
}
fn default_ocr_page_timeout_secs() -> u64 {
    30
}
fn default_embedding_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_max_fallback_strategies")]
    pub max_fallback_strategies: u32,
    #[serde(default = "default_quality_excellent")]
    pub quality_excellent: f32,
    #[serde(default = "default_quality_acceptable")]
    pub quality_acceptable: f32,
    #[serde(default = "default_quality_poor")]
    pub quality_poor: f32,
    #[serde(default = "default_token_acquisition_timeout_secs")]
    pub token_acquisition_timeout_secs: u64,
    #[serde(default = "default_ocr_page_timeout_secs")]
    pub ocr_page_timeout_secs: u64,
    #[serde(default = "default_embedding_timeout_secs")]
    pub embedding_timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_fallback_strategies: default_max_fallback_strategies(),
            quality_excellent: default_quality_excellent(),
            quality_acceptable: default_quality_acceptable(),
            quality_poor: default_quality_poor(),
            token_acquisition_timeout_secs: default_token_acquisition_timeout_secs(),
            ocr_page_timeout_secs: default_ocr_page_timeout_secs(),
            embedding_timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

/// Top-level pipeline configuration consumed by every stage, C1 through C8.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub histogram: HistogramConfig,
    #[serde(default)]
    pub line_grouper: LineGrouperConfig,
    #[serde(default)]
    pub header_detector: HeaderDetectorConfig,
    #[serde(default)]
    pub word_source: WordSourceConfig,
    #[serde(default)]
    pub section_db: SectionDbConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

impl PipelineConfig {
    /// Built-in defaults, optionally overridden by a YAML file, then by
    /// recognized environment variables (spec §6). Mirrors the teacher's
    /// `ConfigManager::get_config` fallback-to-default pattern.
    pub fn load(yaml_path: Option<&str>) -> Self {
        let mut config = match yaml_path {
            Some(path) => Self::from_yaml_file(path).unwrap_or_else(|e| {
                println!("⚠️  Failed to load config from {path}: {e}. Using defaults.");
                Self::default()
            }),
            None => Self::default(),
        };
        config.apply_env_overrides();
        config
    }

    fn from_yaml_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(Path::new(path))
            .with_context(|| format!("reading config file {path}"))?;
        serde_yaml::from_str(&contents).with_context(|| format!("parsing config file {path}"))
    }

    /// Layer `OCR_DPI`, `OCR_LANGUAGES`, `OCR_GPU`, `SECTION_DB_PATH`,
    /// `EMBEDDINGS_ENABLED`, and `HEADER_SCORE_THRESHOLD_OVERRIDE` on top of
    /// whatever the file/defaults produced.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("OCR_DPI") {
            if let Ok(n) = v.parse() {
                self.word_source.ocr_dpi = n;
            }
        }
        if let Ok(v) = std::env::var("OCR_LANGUAGES") {
            self.word_source.ocr_languages =
                v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = std::env::var("OCR_GPU") {
            self.word_source.ocr_gpu = matches!(v.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(v) = std::env::var("SECTION_DB_PATH") {
            self.section_db.path = v;
        }
        if let Ok(v) = std::env::var("EMBEDDINGS_ENABLED") {
            self.section_db.embeddings_enabled =
                matches!(v.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(v) = std::env::var("HEADER_SCORE_THRESHOLD_OVERRIDE") {
            if let Ok(n) = v.parse() {
                self.header_detector.theta_override = Some(n);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_bounds() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.histogram.bin_count, 150);
        assert!((100..=200).contains(&(cfg.histogram.bin_count as i32)));
        assert_eq!(cfg.header_detector.theta_default, 0.30);
        assert_eq!(cfg.section_db.embedding_similarity_threshold, 0.68);
    }

    #[test]
    fn header_weights_sum_to_at_most_one() {
        let w = HeaderWeights::default();
        let sum = w.known_variant
            + w.short_line
            + w.case_pattern
            + w.bold_majority
            + w.large_font
            + w.space_above
            + w.trailing_colon;
        assert!(sum <= 1.0 + 1e-6);
    }

    #[test]
    fn env_override_wins_over_default() {
        std::env::set_var("OCR_DPI", "220");
        let cfg = PipelineConfig::load(None);
        assert_eq!(cfg.word_source.ocr_dpi, 220);
        std::env::remove_var("OCR_DPI");
    }
}
