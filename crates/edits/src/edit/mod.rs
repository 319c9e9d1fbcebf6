//! Ordered, non-overlapping replacement sets over a single base string.

#[cfg(test)]
mod tests;

use std::fmt;

use smallvec::SmallVec;

use crate::data::EditData;
use crate::range::{OffsetRange, offset_add};
use crate::replacement::{Replacement, StringReplacement};

/// An edit: replacements sorted by start, pairwise non-overlapping.
///
/// Touching replacements are representable; composition produces them when
/// two fragments carry annotations whose join refuses. Applying an edit
/// substitutes every range left to right.
#[derive(Clone, PartialEq, Eq)]
pub struct Edit<D> {
	replacements: SmallVec<[Replacement<D>; 1]>,
}

/// An edit with no annotations.
pub type StringEdit = Edit<()>;
/// An edit whose replacements carry join-capable annotations.
pub type AnnotatedStringEdit<D> = Edit<D>;

impl<D> Edit<D> {
	/// The identity edit.
	pub fn empty() -> Self {
		Self {
			replacements: SmallVec::new(),
		}
	}

	pub fn single(replacement: Replacement<D>) -> Self {
		Self {
			replacements: smallvec::smallvec![replacement],
		}
	}

	/// Builds an edit from replacements already sorted by start.
	///
	/// # Panics
	/// Panics if the replacements are unsorted or overlap.
	pub fn new(replacements: Vec<Replacement<D>>) -> Self {
		let edit = Self {
			replacements: replacements.into(),
		};
		edit.assert_invariants();
		edit
	}

	/// Builds an edit from replacements in arbitrary order. The sort is
	/// stable, so same-position insertions keep their given sequence.
	///
	/// # Panics
	/// Panics if the sorted replacements overlap.
	pub fn from_unsorted(mut replacements: Vec<Replacement<D>>) -> Self {
		replacements.sort_by_key(|r| r.range.start);
		Self::new(replacements)
	}

	fn assert_invariants(&self) {
		for pair in self.replacements.windows(2) {
			assert!(
				pair[0].range.end <= pair[1].range.start,
				"replacements overlap: {:?} then {:?}",
				pair[0].range,
				pair[1].range
			);
		}
	}

	pub fn is_empty(&self) -> bool {
		self.replacements.is_empty()
	}

	pub fn len(&self) -> usize {
		self.replacements.len()
	}

	pub fn replacements(&self) -> &[Replacement<D>] {
		&self.replacements
	}

	pub fn iter(&self) -> impl Iterator<Item = &Replacement<D>> {
		self.replacements.iter()
	}

	pub fn into_replacements(self) -> Vec<Replacement<D>> {
		self.replacements.into_vec()
	}

	/// Net change in document length.
	pub fn len_delta(&self) -> isize {
		self.replacements.iter().map(Replacement::len_delta).sum()
	}

	/// Applies the edit to `base`.
	///
	/// # Panics
	/// Panics if any replacement reaches past the end of `base`.
	pub fn apply(&self, base: &str) -> String {
		let mut out = String::with_capacity(base.len().saturating_add_signed(self.len_delta()));
		let mut pos = 0;
		for r in &self.replacements {
			assert!(
				r.range.end <= base.len(),
				"replacement {:?} out of bounds for base of length {}",
				r.range,
				base.len()
			);
			out.push_str(&base[pos..r.range.start]);
			out.push_str(&r.new_text);
			pos = r.range.end;
		}
		out.push_str(&base[pos..]);
		out
	}

	/// The range of each replacement in the post-apply coordinate system.
	pub fn new_ranges(&self) -> Vec<OffsetRange> {
		let mut delta = 0isize;
		self.replacements
			.iter()
			.map(|r| {
				let start = offset_add(r.range.start, delta);
				delta += r.len_delta();
				OffsetRange::new(start, start + r.new_text.len())
			})
			.collect()
	}

	/// Maps a base offset into the post-apply coordinate system. Offsets
	/// interior to a replaced span land at the span's new end.
	pub fn apply_to_offset(&self, offset: usize) -> usize {
		let mut delta = 0isize;
		for r in &self.replacements {
			if r.range.end <= offset {
				delta += r.len_delta();
			} else if r.range.start < offset {
				return offset_add(r.range.start, delta) + r.new_text.len();
			} else {
				break;
			}
		}
		offset_add(offset, delta)
	}

	/// Maps a base range into the post-apply coordinate system.
	///
	/// Replacements entirely before the range shift it; replacements
	/// entirely inside stretch it. A replacement straddling either
	/// boundary leaves no meaningful image and yields `None`.
	pub fn apply_to_offset_range(&self, range: OffsetRange) -> Option<OffsetRange> {
		let mut start = range.start as isize;
		let mut end = range.end as isize;
		for r in &self.replacements {
			if r.range.end <= range.start {
				start += r.len_delta();
				end += r.len_delta();
			} else if range.contains_range(&r.range) {
				end += r.len_delta();
			} else if r.range.start >= range.end {
				break;
			} else {
				return None;
			}
		}
		debug_assert!(start >= 0 && end >= start);
		Some(OffsetRange::new(start as usize, end as usize))
	}

	/// Canonicalizes each replacement against `base` and drops the ones
	/// that turn out to change nothing.
	pub fn remove_common_suffix_and_prefix(&self, base: &str) -> Self
	where
		D: Clone,
	{
		Self {
			replacements: self
				.replacements
				.iter()
				.map(|r| r.remove_common_suffix_and_prefix(base))
				.filter(|r| !r.is_empty())
				.collect(),
		}
	}

	/// The edit that undoes this one against `self.apply(base)`.
	pub fn inverse(&self, base: &str) -> Self
	where
		D: Clone,
	{
		let mut delta = 0isize;
		Self {
			replacements: self
				.replacements
				.iter()
				.map(|r| {
					let start = offset_add(r.range.start, delta);
					delta += r.len_delta();
					Replacement {
						range: OffsetRange::new(start, start + r.new_text.len()),
						new_text: base[r.range.start..r.range.end].to_string(),
						data: r.data.clone(),
					}
				})
				.collect(),
		}
	}

	/// Re-annotates every replacement.
	pub fn map_data<E>(&self, f: impl Fn(&D) -> E) -> Edit<E> {
		Edit {
			replacements: self
				.replacements
				.iter()
				.map(|r| Replacement {
					range: r.range,
					new_text: r.new_text.clone(),
					data: f(&r.data),
				})
				.collect(),
		}
	}

	/// Drops all annotations.
	pub fn unannotated(&self) -> StringEdit {
		self.map_data(|_| ())
	}

	/// Partitions into `(matching, rest)` where `matching` keeps this
	/// edit's base coordinates and `rest` is re-based through `matching`,
	/// so `matching.compose(&rest)` has the effect of `self`.
	pub fn decompose_split(&self, pred: impl Fn(&D) -> bool) -> (Self, Self)
	where
		D: Clone,
	{
		let mut matching = SmallVec::new();
		let mut rest = SmallVec::new();
		let mut delta = 0isize;
		for r in &self.replacements {
			if pred(&r.data) {
				delta += r.len_delta();
				matching.push(r.clone());
			} else {
				rest.push(r.delta(delta));
			}
		}
		(
			Self {
				replacements: matching,
			},
			Self { replacements: rest },
		)
	}
}

impl StringEdit {
	/// Single-replacement edit substituting `range` with `text`.
	pub fn replace(range: OffsetRange, text: impl Into<String>) -> Self {
		Self::single(StringReplacement::new(range, text))
	}

	/// Single-replacement edit inserting `text` at `offset`.
	pub fn insert(offset: usize, text: impl Into<String>) -> Self {
		Self::single(StringReplacement::insert(offset, text))
	}
}

/// A `self` replacement mid-composition: its image in the intermediate
/// document, how much of its text and old range is already attributed to
/// emitted pieces, and whether the other edit has cut into it.
struct Pending<D> {
	image: OffsetRange,
	text: String,
	text_pos: usize,
	t_start: usize,
	t_end: usize,
	t_taken: bool,
	data: D,
	split: bool,
}

impl<D: Clone> Pending<D> {
	fn from_replacement(r: &Replacement<D>, image_start: usize) -> Self {
		Self {
			image: OffsetRange::new(image_start, image_start + r.new_text.len()),
			text: r.new_text.clone(),
			text_pos: 0,
			t_start: r.range.start,
			t_end: r.range.end,
			t_taken: false,
			data: r.data.clone(),
			split: false,
		}
	}

	fn len_delta(&self) -> isize {
		self.text.len() as isize - (self.t_end - self.t_start) as isize
	}

	/// Emits whatever part of the replacement no piece has claimed yet.
	fn flush(self, pieces: &mut Vec<(Replacement<D>, bool)>) {
		if self.t_taken && self.text_pos == self.text.len() {
			return;
		}
		let range = if self.t_taken {
			OffsetRange::empty_at(self.t_end)
		} else {
			OffsetRange::new(self.t_start, self.t_end)
		};
		pieces.push((
			Replacement {
				range,
				new_text: self.text[self.text_pos..].to_string(),
				data: self.data,
			},
			self.split,
		));
	}
}

impl<D: EditData> Edit<D> {
	/// Composes `self` then `other` into one edit over `self`'s base.
	///
	/// `other`'s replacements are walked in intermediate-document order and
	/// translated back through `self`. Where `other` cuts into a `self`
	/// replacement, the replacement splits into fragments; fragments fuse
	/// back with a touching neighbor only when the annotations join.
	/// Composing with the identity returns the other operand unchanged.
	pub fn compose(&self, other: &Edit<D>) -> Edit<D> {
		if other.is_empty() {
			return self.clone();
		}
		if self.is_empty() {
			return other.clone();
		}

		// (piece, fused): fused pieces arose from a split or cross-edit
		// coverage and may coalesce with a touching neighbor.
		let mut pieces: Vec<(Replacement<D>, bool)> = Vec::new();
		let mut ai = self.replacements.iter();
		let mut next_a = ai.next();
		let mut pending: Option<Pending<D>> = None;
		// Intermediate position minus base position, for retained text.
		let mut delta = 0isize;

		for b in &other.replacements {
			let (bs, be) = (b.range.start, b.range.end);

			// Flush replacements whose images lie wholly before `b`. A
			// zero-width `b` at an image end stays attached to the image.
			loop {
				if pending.is_none() {
					let Some(a) = next_a else { break };
					pending = Some(Pending::from_replacement(a, offset_add(a.range.start, delta)));
					next_a = ai.next();
				}
				let image_end = pending.as_ref().map(|p| p.image.end).unwrap_or_default();
				if image_end < bs || (image_end == bs && be > bs) {
					let pend = pending.take().expect("pending was just filled");
					delta += pend.len_delta();
					pend.flush(&mut pieces);
				} else {
					break;
				}
			}

			// Where the atom for `b` starts in base coordinates.
			let mut fused = false;
			let t_start_atom = match pending.as_mut() {
				Some(pend) if bs >= pend.image.start => {
					fused = true;
					let cut = bs - pend.image.start;
					if cut > pend.text_pos {
						// Uncovered image text before `b` becomes its own
						// fragment; the first fragment claims the old range.
						let range = if pend.t_taken {
							OffsetRange::empty_at(pend.t_end)
						} else {
							pend.t_taken = true;
							OffsetRange::new(pend.t_start, pend.t_end)
						};
						pieces.push((
							Replacement {
								range,
								new_text: pend.text[pend.text_pos..cut].to_string(),
								data: pend.data.clone(),
							},
							true,
						));
						pend.text_pos = cut;
						pend.split = true;
					}
					if pend.t_taken { pend.t_end } else { pend.t_start }
				}
				_ => offset_add(bs, -delta),
			};

			// Sweep `b`'s span, consuming covered image text and retained
			// text; consuming an unclaimed image extends the atom over the
			// image's whole old range.
			let mut t_end_atom = t_start_atom;
			let mut p = bs;
			while p < be {
				let mut image_consumed = false;
				match pending.as_mut() {
					Some(pend) if p >= pend.image.start => {
						fused = true;
						pend.split = true;
						let seg_end = be.min(pend.image.end);
						pend.text_pos = seg_end - pend.image.start;
						if !pend.t_taken {
							pend.t_taken = true;
							t_end_atom = pend.t_end;
						}
						image_consumed = seg_end == pend.image.end;
						p = seg_end;
					}
					_ => {
						let limit = pending.as_ref().map(|p| p.image.start).unwrap_or(usize::MAX);
						let seg_end = be.min(limit);
						t_end_atom = offset_add(seg_end, -delta);
						p = seg_end;
					}
				}
				if image_consumed {
					let pend = pending.take().expect("an image was just consumed");
					delta += pend.len_delta();
					if let Some(a) = next_a {
						pending = Some(Pending::from_replacement(a, offset_add(a.range.start, delta)));
						next_a = ai.next();
					}
				}
			}

			pieces.push((
				Replacement {
					range: OffsetRange::new(t_start_atom, t_end_atom),
					new_text: b.new_text.clone(),
					data: b.data.clone(),
				},
				fused,
			));
		}

		if let Some(pend) = pending.take() {
			pend.flush(&mut pieces);
		}
		while let Some(a) = next_a {
			pieces.push((a.clone(), false));
			next_a = ai.next();
		}

		Self::coalesce(pieces)
	}

	/// Merges touching fragments whose annotations join; drops pieces that
	/// change nothing.
	fn coalesce(pieces: Vec<(Replacement<D>, bool)>) -> Edit<D> {
		let mut out: SmallVec<[Replacement<D>; 1]> = SmallVec::new();
		let mut last_fused = false;
		for (piece, fused) in pieces {
			if piece.is_empty() {
				continue;
			}
			if let Some(last) = out.last_mut()
				&& (last_fused || fused)
				&& last.range.end == piece.range.start
				&& let Some(joined) = last.data.join(&piece.data)
			{
				last.new_text.push_str(&piece.new_text);
				last.range = OffsetRange::new(last.range.start, piece.range.end);
				last.data = joined;
				last_fused = true;
				continue;
			}
			out.push(piece);
			last_fused = fused;
		}
		Edit { replacements: out }
	}
}

impl<D: fmt::Debug> fmt::Debug for Edit<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.replacements.iter()).finish()
	}
}

impl<D> Default for Edit<D> {
	fn default() -> Self {
		Self::empty()
	}
}
