//! Survival tracking for accepted edits.
//!
//! After an AI-suggested edit is accepted, the user keeps typing. The
//! tracker measures how many of the accepted characters are still present,
//! which feeds acceptance-quality reporting.

use crate::data::ArcData;
use crate::edit::{Edit, StringEdit};

/// Tracks the accepted-and-retained characters of one accepted edit.
///
/// The state is an annotated edit mapping the pre-acceptance document to
/// the current document; replacements descending from the accepted edit
/// are flagged tracked, everything the user typed since is not. Each
/// follow-up edit is composed on and the untracked half is split away, so
/// the tracked half always holds the surviving insertions at their
/// current positions.
#[derive(Debug, Clone)]
pub struct ArcTracker {
	original_len: usize,
	updated_tracked_edit: Edit<ArcData>,
}

impl ArcTracker {
	pub fn new(original_text: &str, tracked_edit: &StringEdit) -> Self {
		let annotated = tracked_edit
			.remove_common_suffix_and_prefix(original_text)
			.map_data(|_| ArcData { tracked: true });
		let original_len = annotated.iter().map(|r| r.new_text.len()).sum();
		Self {
			original_len,
			updated_tracked_edit: annotated,
		}
	}

	/// Folds a follow-up edit (user typing) into the tracked state.
	pub fn handle_edit(&mut self, follow_up: &StringEdit) {
		let follow = follow_up.map_data(|_| ArcData { tracked: false });
		let composed = self.updated_tracked_edit.compose(&follow);
		let (_untracked, tracked) = composed.decompose_split(|d| !d.tracked);
		self.updated_tracked_edit = tracked;
	}

	/// Characters of the accepted edit present when tracking began.
	pub fn original_len(&self) -> usize {
		self.original_len
	}

	/// Characters of the accepted edit still present now. Never exceeds
	/// `original_len` and never grows across `handle_edit` calls.
	pub fn surviving_len(&self) -> usize {
		self.updated_tracked_edit
			.iter()
			.map(|r| r.new_text.len())
			.sum()
	}

	/// Fraction of the accepted characters that survive; `1.0` when the
	/// accepted edit inserted nothing.
	pub fn survival_fraction(&self) -> f64 {
		if self.original_len == 0 {
			1.0
		} else {
			self.surviving_len() as f64 / self.original_len as f64
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::range::OffsetRange;

	#[test]
	fn untouched_edit_fully_survives() {
		let tracker = ArcTracker::new("fn main() {}", &StringEdit::insert(11, "\n\tprintln!()"));
		assert_eq!(tracker.original_len(), 12);
		assert_eq!(tracker.surviving_len(), 12);
		assert_eq!(tracker.survival_fraction(), 1.0);
	}

	#[test]
	fn typing_elsewhere_does_not_affect_survival() {
		let mut tracker = ArcTracker::new("abcdef", &StringEdit::insert(3, "XYZ"));
		// Document is now "abcXYZdef"; type at the start and the end.
		tracker.handle_edit(&StringEdit::insert(0, "//"));
		tracker.handle_edit(&StringEdit::insert(11, "!"));
		assert_eq!(tracker.surviving_len(), 3);
	}

	#[test]
	fn overwriting_tracked_text_reduces_survival() {
		let mut tracker = ArcTracker::new("abcdef", &StringEdit::insert(3, "XYZ"));
		// "abcXYZdef": overwrite "Y" with "q".
		tracker.handle_edit(&StringEdit::replace(OffsetRange::new(4, 5), "q"));
		assert_eq!(tracker.surviving_len(), 2);
		// Delete the rest of the insertion, one char at a time.
		tracker.handle_edit(&StringEdit::replace(OffsetRange::new(3, 4), ""));
		tracker.handle_edit(&StringEdit::replace(OffsetRange::new(4, 5), ""));
		assert_eq!(tracker.surviving_len(), 0);
		// Retyping the same text does not resurrect tracked characters.
		tracker.handle_edit(&StringEdit::insert(3, "XYZ"));
		assert_eq!(tracker.surviving_len(), 0);
	}

	#[test]
	fn survival_is_monotonic() {
		let mut tracker = ArcTracker::new("0123456789", &StringEdit::insert(5, "hello"));
		let mut last = tracker.surviving_len();
		let edits = [
			StringEdit::replace(OffsetRange::new(6, 8), "?"),
			StringEdit::insert(2, "zz"),
			StringEdit::replace(OffsetRange::new(4, 9), ""),
			StringEdit::insert(4, "hello"),
		];
		for edit in &edits {
			tracker.handle_edit(edit);
			let now = tracker.surviving_len();
			assert!(now <= last, "survival grew from {last} to {now}");
			last = now;
		}
	}

	#[test]
	fn normalization_ignores_restated_context() {
		// The tracked edit rewrites "abc" to "aXc": only "X" counts.
		let tracker = ArcTracker::new(
			"abcdef",
			&StringEdit::replace(OffsetRange::new(0, 3), "aXc"),
		);
		assert_eq!(tracker.original_len(), 1);
	}
}
