use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;
use crate::data::ArcData;

fn repl(start: usize, end: usize, text: &str) -> StringReplacement {
	StringReplacement::new(OffsetRange::new(start, end), text)
}

#[test]
fn apply_multiple_replacements() {
	let edit = StringEdit::new(vec![repl(0, 1, "A"), repl(3, 3, "!"), repl(4, 6, "")]);
	assert_eq!(edit.apply("abcdef"), "Abc!d");
}

#[test]
fn apply_empty_edit_is_identity() {
	assert_eq!(StringEdit::empty().apply("abc"), "abc");
}

#[test]
#[should_panic(expected = "overlap")]
fn overlapping_replacements_panic() {
	let _ = StringEdit::new(vec![repl(0, 3, "x"), repl(2, 4, "y")]);
}

#[test]
fn compose_with_identity_is_structural_noop() {
	let edit = StringEdit::new(vec![repl(1, 2, "XY"), repl(4, 4, "Q")]);
	assert_eq!(edit.compose(&StringEdit::empty()), edit);
	assert_eq!(StringEdit::empty().compose(&edit), edit);
}

#[test]
fn compose_disjoint_edits() {
	// "abcdef" -> "aXcdef" -> "aXcdQef"
	let a = StringEdit::replace(OffsetRange::new(1, 2), "X");
	let b = StringEdit::insert(4, "Q");
	let composed = a.compose(&b);
	assert_eq!(composed.apply("abcdef"), "aXcdQef");
	assert_eq!(composed.len(), 2);
}

#[test]
fn compose_merges_consecutive_typing() {
	// Typing "h", then "e" right after it, collapses into one insertion.
	let a = StringEdit::insert(5, "h");
	let b = StringEdit::insert(6, "e");
	let composed = a.compose(&b);
	assert_eq!(composed.replacements(), &[repl(5, 5, "he")]);
	let c = composed.compose(&StringEdit::insert(7, "y"));
	assert_eq!(c.replacements(), &[repl(5, 5, "hey")]);
}

#[test]
fn compose_overwrite_inside_insertion() {
	// Insert "hello", then delete its "e".
	let a = StringEdit::insert(5, "hello");
	let b = StringEdit::replace(OffsetRange::new(6, 7), "");
	let composed = a.compose(&b);
	assert_eq!(composed.apply("01234"), "01234hllo");
	assert_eq!(composed.replacements(), &[repl(5, 5, "hllo")]);
}

#[test]
fn compose_overlapping_tail_and_retained_text() {
	// "abcdef": replace "cd" with "XY", then replace "Ye" with "Q".
	let a = StringEdit::replace(OffsetRange::new(2, 4), "XY");
	let b = StringEdit::replace(OffsetRange::new(3, 5), "Q");
	let composed = a.compose(&b);
	assert_eq!(composed.apply("abcdef"), "abXQf");
	assert_eq!(composed.replacements(), &[repl(2, 5, "XQ")]);
}

#[test]
fn compose_covering_two_replacements() {
	let a = StringEdit::new(vec![repl(1, 2, "X"), repl(4, 5, "Y")]);
	// "abcdef" -> "aXcdYf"; replace "XcdY" with "Z".
	let b = StringEdit::replace(OffsetRange::new(1, 5), "Z");
	let composed = a.compose(&b);
	assert_eq!(composed.apply("abcdef"), "aZf");
	assert_eq!(composed.replacements(), &[repl(1, 5, "Z")]);
}

#[test]
fn compose_deletion_of_insertion_cancels() {
	let a = StringEdit::insert(2, "XY");
	let b = StringEdit::replace(OffsetRange::new(2, 4), "");
	let composed = a.compose(&b);
	assert_eq!(composed.apply("abcd"), "abcd");
	assert!(composed.is_empty());
}

#[test]
fn compose_keeps_mixed_annotations_apart() {
	// Tracked insertion, untracked overwrite of its middle: the tracked
	// fragments must not fuse with the untracked piece.
	let tracked = ArcData { tracked: true };
	let untracked = ArcData { tracked: false };
	let a = Edit::single(Replacement::with_data(
		OffsetRange::empty_at(3),
		"hello",
		tracked,
	));
	let b = Edit::single(Replacement::with_data(
		OffsetRange::new(4, 6),
		"E",
		untracked,
	));
	let composed = a.compose(&b);
	let texts: Vec<(&str, bool)> = composed
		.iter()
		.map(|r| (r.new_text.as_str(), r.data.tracked))
		.collect();
	assert_eq!(texts, vec![("h", true), ("E", false), ("llo", true)]);
	assert_eq!(composed.unannotated().apply("012345"), "012hEllo345");
}

#[test]
fn decompose_split_rebases_rest() {
	let tracked = ArcData { tracked: true };
	let untracked = ArcData { tracked: false };
	let edit = Edit::new(vec![
		Replacement::with_data(OffsetRange::new(0, 2), "A", untracked),
		Replacement::with_data(OffsetRange::empty_at(4), "tt", tracked),
		Replacement::with_data(OffsetRange::new(6, 7), "B", untracked),
	]);
	let (untracked_half, tracked_half) = edit.decompose_split(|d| !d.tracked);
	assert_eq!(untracked_half.len(), 2);
	assert_eq!(tracked_half.len(), 1);
	// "A" replaced two bytes, so the tracked insertion shifts left by one.
	assert_eq!(tracked_half.replacements()[0].range, OffsetRange::empty_at(3));
	// Applying the halves in sequence reproduces the whole edit.
	let base = "0123456789";
	assert_eq!(
		tracked_half.unannotated().apply(&untracked_half.unannotated().apply(base)),
		edit.unannotated().apply(base)
	);
}

#[test]
fn new_ranges_tracks_length_deltas() {
	let edit = StringEdit::new(vec![repl(1, 3, "long"), repl(5, 6, "")]);
	assert_eq!(
		edit.new_ranges(),
		vec![OffsetRange::new(1, 5), OffsetRange::new(7, 7)]
	);
}

#[test]
fn offset_range_mapping() {
	let edit = StringEdit::new(vec![repl(0, 1, "AAA"), repl(4, 5, ""), repl(8, 8, "x")]);
	// Window [3, 6): the leading replacement shifts it, the deletion
	// inside shrinks it, the trailing insertion is beyond it.
	assert_eq!(
		edit.apply_to_offset_range(OffsetRange::new(3, 6)),
		Some(OffsetRange::new(5, 7))
	);
	// Window [2, 4): straddled by nothing, shifted by the first.
	assert_eq!(
		edit.apply_to_offset_range(OffsetRange::new(2, 4)),
		Some(OffsetRange::new(4, 6))
	);
	// A replacement straddling the window start collapses the mapping.
	let edit = StringEdit::replace(OffsetRange::new(2, 5), "Q");
	assert_eq!(edit.apply_to_offset_range(OffsetRange::new(3, 8)), None);
}

#[test]
fn offset_mapping() {
	let edit = StringEdit::new(vec![repl(1, 3, "long"), repl(5, 6, "")]);
	assert_eq!(edit.apply_to_offset(0), 0);
	assert_eq!(edit.apply_to_offset(1), 1);
	// Interior of a replaced span snaps to the span's new end.
	assert_eq!(edit.apply_to_offset(2), 5);
	assert_eq!(edit.apply_to_offset(4), 6);
	assert_eq!(edit.apply_to_offset(7), 8);
}

#[test]
fn inverse_undoes() {
	let base = "abcdef";
	let edit = StringEdit::new(vec![repl(1, 2, "XX"), repl(4, 6, "")]);
	let applied = edit.apply(base);
	assert_eq!(edit.inverse(base).apply(&applied), base);
}

#[test]
fn canonicalization_drops_noops() {
	let edit = StringEdit::new(vec![repl(0, 2, "ab"), repl(3, 4, "X")]);
	let canonical = edit.remove_common_suffix_and_prefix("abcdef");
	assert_eq!(canonical.replacements(), &[repl(3, 4, "X")]);
}

fn arb_edit(base_len: usize) -> impl Strategy<Value = StringEdit> {
	proptest::collection::vec(
		(0..=base_len, 0..=base_len, "[A-Z]{0,3}"),
		0..4,
	)
	.prop_map(move |mut raw| {
		raw.sort_by_key(|(a, b, _)| *a.min(b));
		let mut replacements = Vec::new();
		let mut last_end = 0usize;
		for (a, b, text) in raw {
			let (start, end) = (a.min(b), a.max(b));
			if start < last_end || (start == end && text.is_empty()) {
				continue;
			}
			replacements.push(StringReplacement::new(OffsetRange::new(start, end), text));
			last_end = end;
		}
		StringEdit::new(replacements)
	})
}

fn arb_compose_case() -> impl Strategy<Value = (String, StringEdit, StringEdit)> {
	"[a-z]{0,24}"
		.prop_flat_map(|base| {
			let len = base.len();
			(Just(base), arb_edit(len))
		})
		.prop_flat_map(|(base, a)| {
			let mid_len = base.len().saturating_add_signed(a.len_delta());
			(Just(base), Just(a), arb_edit(mid_len))
		})
}

proptest! {
	#[test]
	fn compose_matches_sequential_application((base, a, b) in arb_compose_case()) {
		let mid = a.apply(&base);
		let expected = b.apply(&mid);
		prop_assert_eq!(a.compose(&b).apply(&base), expected);
	}

	#[test]
	fn canonicalization_preserves_effect((base, a, _) in arb_compose_case()) {
		prop_assert_eq!(
			a.remove_common_suffix_and_prefix(&base).apply(&base),
			a.apply(&base)
		);
	}

	#[test]
	fn inverse_round_trips((base, a, _) in arb_compose_case()) {
		let applied = a.apply(&base);
		prop_assert_eq!(a.inverse(&base).apply(&applied), base);
	}
}
