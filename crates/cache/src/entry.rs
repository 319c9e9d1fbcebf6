//! Cache entries.

use std::rc::Rc;
use std::time::Instant;

use drift_edits::{IndexData, OffsetRange, Replacement, StringEdit, StringReplacement};

use crate::source::{DocId, RequestSource};

/// One cached suggestion for one document snapshot.
///
/// While the entry is tracked, `user_edit_since` maps
/// `document_before_edit` onto the document's current text; the cache
/// composes every observed document change onto it, which keeps the entry
/// eligible for rebase-on-lookup.
pub struct CachedEdit {
	pub doc_id: DocId,
	/// Snapshot the suggestion was computed against.
	pub document_before_edit: String,
	/// Region of the snapshot the suggestion is valid in.
	pub edit_window: Option<OffsetRange>,
	/// The suggestion's replacements; empty for a cached "no next edit".
	pub edits: Vec<StringReplacement>,
	/// Refined splinters per replacement; missing entries are backfilled
	/// by the rebaser on demand.
	pub detailed_edits: Vec<Vec<Replacement<IndexData>>>,
	/// Everything the user did since the snapshot; `None` once the entry
	/// fell out of sync with the document.
	pub user_edit_since: Option<StringEdit>,
	/// Sticky until the next document change: a strict rebase failed, so
	/// lookups skip the entry until the user types more.
	pub rebase_failed: bool,
	/// The user dismissed this suggestion; the entry now only suppresses
	/// look-alike candidates.
	pub rejected: bool,
	/// Ordinal when caching a pipeline of successive edits.
	pub subsequent_n: Option<usize>,
	pub source: Rc<dyn RequestSource>,
	pub cache_time: Instant,
}

impl CachedEdit {
	pub fn is_tracked(&self) -> bool {
		self.user_edit_since.is_some()
	}

	pub fn has_edits(&self) -> bool {
		!self.edits.is_empty()
	}
}

impl std::fmt::Debug for CachedEdit {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CachedEdit")
			.field("doc_id", &self.doc_id)
			.field("edits", &self.edits)
			.field("edit_window", &self.edit_window)
			.field("tracked", &self.is_tracked())
			.field("rebase_failed", &self.rebase_failed)
			.field("rejected", &self.rejected)
			.field("subsequent_n", &self.subsequent_n)
			.finish_non_exhaustive()
	}
}
