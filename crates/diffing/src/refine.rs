//! Replacement refinement: turn a coarse replacement into the finest set
//! of replacements with the same effect, via a line diff plus inner
//! character narrowing.

use drift_edits::replacement::{common_prefix_len, common_suffix_len};
use drift_edits::{OffsetRange, Replacement, StringReplacement};

use crate::lines::{line_start_or_eof, split_lines};
use crate::provider::{LineDiff, LineDiffOptions, char_level_changes};

/// Refines `replacement` against `base` into finer-grained replacements,
/// each tagged with `data`.
///
/// Returns `None` when the diff budget is exhausted; the caller keeps the
/// coarse replacement in that case. Applying the returned sequence to
/// `base` yields exactly `replacement.apply(base)`.
pub fn refine_replacement<D: Clone>(
	provider: &dyn LineDiff,
	base: &str,
	replacement: &StringReplacement,
	data: D,
	options: &LineDiffOptions,
) -> Option<Vec<Replacement<D>>> {
	debug_assert!(replacement.range.end <= base.len());
	let original = &base[replacement.range.start..replacement.range.end];
	let new_text = replacement.new_text.as_str();

	let before_lines = split_lines(original);
	let after_lines = split_lines(new_text);
	let result = provider.diff(&before_lines, &after_lines, options);
	if result.hit_timeout {
		return None;
	}

	let mut out = Vec::new();
	for change in &result.changes {
		let before_start = line_start_or_eof(&before_lines, change.before.start, original.len());
		let before_end = line_start_or_eof(&before_lines, change.before.end, original.len());
		let after_start = line_start_or_eof(&after_lines, change.after.start, new_text.len());
		let after_end = line_start_or_eof(&after_lines, change.after.end, new_text.len());
		let old_chunk = &original[before_start..before_end];
		let new_chunk = &new_text[after_start..after_end];

		// Narrow the changed lines to the characters that differ.
		let p = common_prefix_len(old_chunk, new_chunk);
		let q = common_suffix_len(&old_chunk[p..], &new_chunk[p..]);
		let old_mid = &old_chunk[p..old_chunk.len() - q];
		let new_mid = &new_chunk[p..new_chunk.len() - q];
		if old_mid.is_empty() && new_mid.is_empty() {
			continue;
		}

		let abs = replacement.range.start + before_start + p;
		if !old_mid.is_empty()
			&& !new_mid.is_empty()
			&& old_mid.len().max(new_mid.len()) <= options.max_inner_bytes
		{
			for (before, after) in char_level_changes(old_mid, new_mid) {
				out.push(Replacement {
					range: OffsetRange::new(abs + before.start, abs + before.end),
					new_text: new_mid[after.start..after.end].to_string(),
					data: data.clone(),
				});
			}
		} else {
			out.push(Replacement {
				range: OffsetRange::new(abs, abs + old_mid.len()),
				new_text: new_mid.to_string(),
				data: data.clone(),
			});
		}
	}
	Some(out)
}
