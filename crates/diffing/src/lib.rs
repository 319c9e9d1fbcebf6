//! Line diffing and replacement refinement.
//!
//! A coarse replacement produced by a suggestion model often rewrites a
//! whole region; refinement narrows it to the characters that actually
//! change, via a line-level Histogram diff and per-hunk character
//! narrowing, so later rebasing can reason about fine-grained pieces.

/// Terminator-inclusive line splitting.
pub mod lines;
/// The pluggable line-diff capability and its default provider.
pub mod provider;
/// Coarse-to-fine replacement refinement.
pub mod refine;

pub use lines::{Line, split_lines};
pub use provider::{HistogramDiff, LineChange, LineDiff, LineDiffOptions, LineDiffResult};
pub use refine::refine_replacement;
