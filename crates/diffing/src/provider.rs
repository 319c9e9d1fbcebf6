//! Pluggable line-diff capability.

use drift_edits::OffsetRange;
use imara_diff::{Algorithm, Diff, InternedInput};

use crate::lines::Line;

/// Budget for one diff computation. Inputs past the budget are not
/// diffed; the provider reports `hit_timeout` instead so the caller can
/// fall back to the coarse replacement.
#[derive(Debug, Clone, Copy)]
pub struct LineDiffOptions {
	/// Combined line count above which the diff is abandoned.
	pub max_lines: usize,
	/// Changed-chunk byte size up to which character-level refinement runs.
	pub max_inner_bytes: usize,
}

impl Default for LineDiffOptions {
	fn default() -> Self {
		Self {
			max_lines: 10_000,
			max_inner_bytes: 4096,
		}
	}
}

/// One changed region: line index ranges into the before and after inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineChange {
	pub before: OffsetRange,
	pub after: OffsetRange,
}

#[derive(Debug, Clone, Default)]
pub struct LineDiffResult {
	pub changes: Vec<LineChange>,
	pub hit_timeout: bool,
}

impl LineDiffResult {
	fn timed_out() -> Self {
		Self {
			changes: Vec::new(),
			hit_timeout: true,
		}
	}
}

/// A deterministic line-level diff.
pub trait LineDiff {
	fn diff(&self, before: &[Line<'_>], after: &[Line<'_>], options: &LineDiffOptions) -> LineDiffResult;
}

/// Histogram-diff provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct HistogramDiff;

impl LineDiff for HistogramDiff {
	fn diff(&self, before: &[Line<'_>], after: &[Line<'_>], options: &LineDiffOptions) -> LineDiffResult {
		if before.len() + after.len() > options.max_lines {
			return LineDiffResult::timed_out();
		}

		let mut input = InternedInput::default();
		input.update_before(before.iter().map(|l| l.text));
		input.update_after(after.iter().map(|l| l.text));
		let diff = Diff::compute(Algorithm::Histogram, &input);

		let changes = diff
			.hunks()
			.map(|hunk| LineChange {
				before: OffsetRange::new(hunk.before.start as usize, hunk.before.end as usize),
				after: OffsetRange::new(hunk.after.start as usize, hunk.after.end as usize),
			})
			.collect();
		LineDiffResult {
			changes,
			hit_timeout: false,
		}
	}
}

/// Character-level diff of two small chunks, as `(before, after)` byte
/// ranges relative to the chunk starts.
pub(crate) fn char_level_changes(before: &str, after: &str) -> Vec<(OffsetRange, OffsetRange)> {
	let before_offsets: Vec<usize> = before
		.char_indices()
		.map(|(i, _)| i)
		.chain(std::iter::once(before.len()))
		.collect();
	let after_offsets: Vec<usize> = after
		.char_indices()
		.map(|(i, _)| i)
		.chain(std::iter::once(after.len()))
		.collect();

	let mut input = InternedInput::default();
	input.update_before(before.chars());
	input.update_after(after.chars());
	let diff = Diff::compute(Algorithm::Histogram, &input);

	diff.hunks()
		.map(|hunk| {
			(
				OffsetRange::new(
					before_offsets[hunk.before.start as usize],
					before_offsets[hunk.before.end as usize],
				),
				OffsetRange::new(
					after_offsets[hunk.after.start as usize],
					after_offsets[hunk.after.end as usize],
				),
			)
		})
		.collect()
}
