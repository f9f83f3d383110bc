// Pipeline stages C2-C7. Each module owns one concern the way the teacher's
// `rules/` directory splits section detection, spatial clustering, pattern
// detection, and validation into separate files coordinated by the
// orchestrator (here: `crate::orchestrator`).
//
// - histogram.rs:          C2 page histogram & layout classifier
// - column_segmenter.rs:   C3 column segmenter
// - line_grouper.rs:       C4 line grouper
// - header_detector.rs:    C5 header detector
// - section_db.rs:         C6 section database & matcher
// - assembler.rs:          C7 section assembler

pub mod assembler;
pub mod column_segmenter;
pub mod header_detector;
pub mod line_grouper;
pub mod histogram;
pub mod section_db;

pub use assembler::SectionAssembler;
pub use column_segmenter::ColumnSegmenter;
pub use header_detector::HeaderDetector;
pub use histogram::LayoutClassifier;
pub use line_grouper::LineGrouper;
pub use section_db::SectionDatabase;
