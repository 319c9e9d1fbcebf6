//! The three-way rebase.
//!
//! Given a document snapshot, a suggested edit against it, and the edit
//! the user has made since, the rebaser decides whether the suggestion
//! still applies to the current document and reshapes it if so. The walk
//! absorbs user replacements that agree with the suggestion's text and
//! translates everything else by the accumulated byte deltas.


use drift_diffing::{LineDiff, LineDiffOptions, refine_replacement};
use drift_edits::range::offset_add;
use drift_edits::{IndexData, OffsetRange, Replacement, StringEdit, StringReplacement};

use crate::outcome::{
	RebaseConfig, RebaseError, RebaseOutcome, RebasedEdit, ResolutionMode,
};

/// Inputs of one rebase call. The rebaser is pure; all state lives here.
pub struct RebaseInput<'a> {
	pub snapshot: &'a str,
	pub edit_window: Option<OffsetRange>,
	/// The suggestion's replacements, sorted, in snapshot coordinates.
	pub original_edits: &'a [StringReplacement],
	/// Per original replacement, its refined splinters; trailing entries
	/// may be missing and are backfilled from the refiner.
	pub detailed_edits: &'a [Vec<Replacement<IndexData>>],
	/// Everything the user did since the snapshot.
	pub user_edit_since: &'a StringEdit,
	pub current_doc: &'a str,
	pub current_selection: &'a [OffsetRange],
	pub mode: ResolutionMode,
}

/// Rebases suggestions across concurrent user edits.
pub struct Rebaser<'p> {
	provider: &'p dyn LineDiff,
	config: RebaseConfig,
	diff_options: LineDiffOptions,
}

impl<'p> Rebaser<'p> {
	pub fn new(provider: &'p dyn LineDiff, config: RebaseConfig, diff_options: LineDiffOptions) -> Self {
		Self {
			provider,
			config,
			diff_options,
		}
	}

	pub fn rebase(&self, input: &RebaseInput<'_>) -> RebaseOutcome {
		// A desynchronized user edit is recoverable, not a bug: report it
		// as a value before touching anything else.
		if !ranges_fit(input.user_edit_since.replacements(), input.snapshot) {
			return RebaseOutcome::InconsistentEdits;
		}
		if input.user_edit_since.apply(input.snapshot) != input.current_doc {
			log::trace!("rebase: user edit does not reproduce the current document");
			return RebaseOutcome::InconsistentEdits;
		}
		for (index, pair) in input.original_edits.windows(2).enumerate() {
			if pair[0].range.end > pair[1].range.start {
				return RebaseOutcome::Error(RebaseError::UnorderedOriginals { index });
			}
		}
		if !ranges_fit(input.original_edits, input.snapshot) {
			return RebaseOutcome::Error(RebaseError::RangeOutOfBounds {
				end: input.original_edits.iter().map(|r| r.range.end).max().unwrap_or(0),
				len: input.snapshot.len(),
			});
		}

		// Canonicalizing the user edit first avoids spurious conflicts
		// when its replacement text re-contains its own context.
		let user = input.user_edit_since.remove_common_suffix_and_prefix(input.snapshot);

		if let Some(window) = input.edit_window
			&& let Some(cursor) = input.current_selection.first()
		{
			match user.apply_to_offset_range(window) {
				Some(mapped) if mapped.contains_range(cursor) => {}
				_ => return RebaseOutcome::OutsideEditWindow,
			}
		}

		let ours = self.backfill(input);
		for (index, pair) in ours.windows(2).enumerate() {
			if pair[0].range.end > pair[1].range.start {
				return RebaseOutcome::Error(RebaseError::OutOfOrder { index: index + 1 });
			}
		}
		if ours.iter().any(|o| {
			o.range.end > input.snapshot.len()
				|| !input.snapshot.is_char_boundary(o.range.start)
				|| !input.snapshot.is_char_boundary(o.range.end)
		}) {
			return RebaseOutcome::Error(RebaseError::RangeOutOfBounds {
				end: ours.iter().map(|o| o.range.end).max().unwrap_or(0),
				len: input.snapshot.len(),
			});
		}

		let walked = match self.walk(input.mode, input.snapshot, &ours, user.replacements()) {
			Ok(pieces) => pieces,
			Err(outcome) => return outcome,
		};

		let rebased = match regroup(&walked, input.current_doc) {
			Ok(groups) => groups,
			Err(error) => return RebaseOutcome::Error(error),
		};

		if input.mode == ResolutionMode::Strict
			&& !rebased.is_empty()
			&& !self.consistent(input, &rebased)
		{
			log::trace!("rebase: regrouped edit diverges from the original suggestion");
			return RebaseOutcome::InconsistentEdits;
		}

		RebaseOutcome::Rebased(rebased)
	}

	/// Extends the detailed list to cover every original, refining each
	/// missing original against the snapshot. Preceding originals only
	/// shift offsets, so refining against the snapshot is byte-identical
	/// to refining against the intermediate document.
	fn backfill(&self, input: &RebaseInput<'_>) -> Vec<Replacement<IndexData>> {
		let mut ours: Vec<Replacement<IndexData>> = Vec::new();
		for group in input.detailed_edits.iter().take(input.original_edits.len()) {
			ours.extend(group.iter().cloned());
		}
		for (index, coarse) in input
			.original_edits
			.iter()
			.enumerate()
			.skip(input.detailed_edits.len())
		{
			let data = IndexData::new(index);
			match refine_replacement(self.provider, input.snapshot, coarse, data, &self.diff_options) {
				Some(refined) => ours.extend(refined),
				None => ours.push(Replacement::with_data(
					coarse.range,
					coarse.new_text.clone(),
					data,
				)),
			}
		}
		ours
	}

	/// The core two-stream walk. Returns the surviving suggestion pieces
	/// in current-document coordinates.
	fn walk(
		&self,
		mode: ResolutionMode,
		snapshot: &str,
		ours: &[Replacement<IndexData>],
		user: &[StringReplacement],
	) -> Result<Vec<Replacement<IndexData>>, RebaseOutcome> {
		let strict = mode == ResolutionMode::Strict;
		let mut out = Vec::with_capacity(ours.len());
		let mut users = user.iter().peekable();
		// Running byte delta of user replacements already accounted for.
		let mut offset = 0isize;
		let mut absorbed_any = false;

		for (o_idx, o) in ours.iter().enumerate() {
			let is_last = o_idx + 1 == ours.len();
			let mut o_range = o.range;
			let mut o_text = o.new_text.clone();
			let mut absorbed_delta = 0isize;
			let mut search_pos = 0usize;
			let mut last_absorbed_end: Option<usize> = None;
			let mut absorbed_here = false;

			while let Some(&u) = users.peek() {
				if !o_range.contains_range(&u.range) {
					// Shift expansion: widen the suggestion piece over
					// adjacent snapshot text it re-states, so a user edit
					// at the seam can be absorbed. Widening carries the
					// covered text into `o_text`, preserving the effect.
					if u.range.start < o_range.start {
						let gap = &snapshot[u.range.start..o_range.start];
						if o_text.starts_with(gap) {
							o_range = OffsetRange::new(u.range.start, o_range.end);
							o_text.insert_str(0, gap);
						}
					}
					// Right expansion only for the last piece; in the
					// middle it would interact with a following piece
					// that may need to merge, so those overlaps fall
					// through to the conflict rule.
					if is_last && u.range.end > o_range.end && u.range.end <= snapshot.len() {
						let gap = &snapshot[o_range.end..u.range.end];
						if o_text.ends_with(gap) {
							o_range = OffsetRange::new(o_range.start, u.range.end);
							o_text.push_str(gap);
						}
					}
				}

				if o_range.contains_range(&u.range) {
					if o_text.len() < u.new_text.len() {
						log::trace!("rebase: user typed more than the suggestion at {:?}", u.range);
						return Err(RebaseOutcome::RebaseFailed);
					}
					// Compare against a contiguous document region: any
					// untouched snapshot text between this and the
					// previously absorbed replacement must match too.
					let gapped = match last_absorbed_end {
						Some(prev_end) if prev_end < u.range.start => Some(format!(
							"{}{}",
							&snapshot[prev_end..u.range.start],
							u.new_text
						)),
						_ => None,
					};
					let needle = gapped.as_deref().unwrap_or(u.new_text.as_str());
					let mut matched = o_text[search_pos..]
						.find(needle)
						.map(|j| (j, needle.len()));
					if matched.is_none() && !strict && gapped.is_some() {
						// Lenient tolerates a gap that the suggestion does
						// not re-state, as long as the typing itself
						// appears.
						matched = o_text[search_pos..]
							.find(u.new_text.as_str())
							.map(|j| (j, u.new_text.len()));
					}
					let Some((agreement_offset, matched_len)) = matched else {
						log::trace!("rebase: user typing diverged inside {:?}", o_range);
						return Err(RebaseOutcome::RebaseFailed);
					};
					if strict
						&& (agreement_offset > self.config.max_agreement_offset
							|| (agreement_offset > 0
								&& u.new_text.len() > self.config.max_imperfect_agreement_length))
					{
						log::trace!("rebase: agreement offset {agreement_offset} over threshold");
						return Err(RebaseOutcome::RebaseFailed);
					}
					search_pos += agreement_offset + matched_len;
					absorbed_delta += u.len_delta();
					last_absorbed_end = Some(u.range.end);
					absorbed_here = true;
					absorbed_any = true;
					users.next();
				} else if o_range.intersects_or_touches(&u.range) {
					log::trace!("rebase: conflicting overlap {:?} / {:?}", o_range, u.range);
					return Err(RebaseOutcome::RebaseFailed);
				} else if o_range.end < u.range.start {
					// Disjoint, suggestion piece first. Strict mode
					// rejects a user edit bracketing an untouched piece:
					// once typing has been absorbed somewhere, skipping a
					// piece is interleaving, not agreement.
					if strict && absorbed_any && !absorbed_here {
						log::trace!("rebase: interleaved edits around {:?}", o_range);
						return Err(RebaseOutcome::RebaseFailed);
					}
					break;
				} else {
					// Disjoint, user edit first.
					if strict {
						log::trace!("rebase: unmatched user edit {:?}", u.range);
						return Err(RebaseOutcome::RebaseFailed);
					}
					offset += u.len_delta();
					users.next();
				}
			}

			out.push(Replacement {
				range: OffsetRange::new(
					offset_add(o_range.start, offset),
					offset_add(o_range.end, offset + absorbed_delta),
				),
				new_text: o_text,
				data: o.data,
			});
			offset += absorbed_delta;
		}

		if strict && users.peek().is_some() {
			log::trace!("rebase: trailing user edits with no suggestion piece left");
			return Err(RebaseOutcome::RebaseFailed);
		}
		Ok(out)
	}

	/// Byte-for-byte check that the regrouped edit reproduces the original
	/// suggestion's effect.
	fn consistent(&self, input: &RebaseInput<'_>, rebased: &[RebasedEdit]) -> bool {
		let rebased_edit = StringEdit::new(
			rebased
				.iter()
				.map(|r| r.replacement.clone())
				.collect(),
		);
		let original = StringEdit::new(input.original_edits.to_vec());
		rebased_edit.apply(input.current_doc) == original.apply(input.snapshot)
	}
}

/// Whether every replacement lies inside `text` on character boundaries.
fn ranges_fit(replacements: &[StringReplacement], text: &str) -> bool {
	replacements.iter().all(|r| {
		r.range.end <= text.len()
			&& text.is_char_boundary(r.range.start)
			&& text.is_char_boundary(r.range.end)
	})
}

/// Groups walked pieces by their original index. A group's range spans
/// its first to last piece; its text is the pieces joined with verbatim
/// current-document text between them, since the gaps are parts of the
/// original coarse edit the user has already satisfied. Groups that
/// canonicalize to empty are dropped.
fn regroup(
	pieces: &[Replacement<IndexData>],
	current_doc: &str,
) -> Result<Vec<RebasedEdit>, RebaseError> {
	let mut result = Vec::new();
	let mut iter = pieces.iter().enumerate().peekable();
	while let Some((_, first)) = iter.next() {
		let index = first.data.index;
		if first.range.end > current_doc.len() {
			return Err(RebaseError::RangeOutOfBounds {
				end: first.range.end,
				len: current_doc.len(),
			});
		}
		let mut range = first.range;
		let mut text = first.new_text.clone();
		while let Some(&(piece_idx, next)) = iter.peek() {
			if next.data.index != index {
				break;
			}
			if next.range.start < range.end {
				return Err(RebaseError::OutOfOrder { index: piece_idx });
			}
			if next.range.end > current_doc.len() {
				return Err(RebaseError::RangeOutOfBounds {
					end: next.range.end,
					len: current_doc.len(),
				});
			}
			text.push_str(&current_doc[range.end..next.range.start]);
			text.push_str(&next.new_text);
			range = OffsetRange::new(range.start, next.range.end);
			iter.next();
		}

		let replacement = StringReplacement::new(range, text);
		if !replacement
			.remove_common_suffix_and_prefix(current_doc)
			.is_empty()
		{
			result.push(RebasedEdit { replacement, index });
		}
	}
	Ok(result)
}
