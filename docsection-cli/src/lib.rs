// All core functionality lives in docsection-core; this crate is a thin
// command-line wrapper around it.

pub use docsection_core::*;
