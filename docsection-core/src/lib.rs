//! docsection-core
//!
//! Layout-aware structural extraction: turns a paginated document into
//! labeled, ordered sections, preserving reading order across single,
//! multi-column, and hybrid layouts (spec §1-§2). The pipeline is the
//! C1-C8 chain described in `SPEC_FULL.md`: a `WordSource` acquires
//! positioned tokens, `pipeline::histogram` classifies each page's column
//! structure, `pipeline::column_segmenter` and `pipeline::line_grouper`
//! build lines, `pipeline::header_detector` and `pipeline::section_db`
//! resolve section boundaries, `pipeline::assembler` walks reading order,
//! and `orchestrator` drives the whole thing with fallback and a quality
//! gate.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod types;
pub mod worker_pool;
pub mod wordsource;

pub use config::PipelineConfig;
pub use error::ParseError;
pub use orchestrator::{
    LayoutSummary, Orchestrator, OutputRecord, OutputSection, ParseOutcome, QualitySummary, RunMetadata,
};
pub use types::*;
pub use worker_pool::{CancellationToken, WorkerPool};
pub use wordsource::WordSource;
#[cfg(feature = "pdf-backend")]
pub use wordsource::{NullOcrEngine, OcrEngine, TextLayerSource};
