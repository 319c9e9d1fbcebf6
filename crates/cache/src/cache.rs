//! The per-document next-edit cache.
//!
//! Suggestions are cached under the document state they were computed
//! against. A lookup first tries the exact state, then attempts a strict
//! rebase of every tracked entry onto the current document, so work
//! survives compatible typing. Dismissed suggestions are remembered and
//! look-alike candidates are flagged.

use std::cell::RefCell;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::rc::{Rc, Weak};
use std::time::Instant;

use drift_diffing::{HistogramDiff, LineDiff, LineDiffOptions};
use drift_edits::{IndexData, OffsetRange, Replacement, StringEdit, StringReplacement};
use drift_rebase::{RebaseConfig, RebaseInput, RebaseOutcome, Rebaser, ResolutionMode};
use lru::LruCache;
use rustc_hash::{FxBuildHasher, FxHashMap, FxHasher};

use crate::entry::CachedEdit;
use crate::source::{DocId, LogTraceSink, RequestSource, TraceSink};

/// Shared handle to an LRU-owned entry.
pub type EntryHandle = Rc<RefCell<CachedEdit>>;

#[derive(Debug, Clone, Copy)]
pub struct CacheOptions {
	/// Shared LRU capacity across all documents.
	pub lru_capacity: usize,
	/// Enables the rebase-on-lookup fallback path.
	pub revised_cache_strategy: bool,
	/// Hard cap on the tracked list per document; oldest entries drop.
	pub tracked_entry_limit: usize,
	pub rebase: RebaseConfig,
	pub diff: LineDiffOptions,
}

impl Default for CacheOptions {
	fn default() -> Self {
		Self {
			lru_capacity: 50,
			revised_cache_strategy: true,
			tracked_entry_limit: 8,
			rebase: RebaseConfig::default(),
			diff: LineDiffOptions::default(),
		}
	}
}

/// A lookup result: either the entry verbatim (exact state match) or the
/// entry plus the replacement reshaped onto the current document.
pub enum CachedOrRebased {
	Cached {
		entry: EntryHandle,
	},
	Rebased {
		entry: EntryHandle,
		rebased_edit: StringReplacement,
		rebased_edit_index: usize,
	},
}

impl CachedOrRebased {
	pub fn entry(&self) -> &EntryHandle {
		match self {
			Self::Cached { entry } | Self::Rebased { entry, .. } => entry,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
	doc: DocId,
	content: u64,
}

impl CacheKey {
	fn new(doc: DocId, text: &str) -> Self {
		let mut hasher = FxHasher::default();
		text.hash(&mut hasher);
		Self {
			doc,
			content: hasher.finish(),
		}
	}
}

/// Whether every replacement of `edit` lies inside `text` on character
/// boundaries, so applying it cannot fault.
fn applies_to(edit: &StringEdit, text: &str) -> bool {
	edit.replacements().iter().all(|r| {
		r.range.end <= text.len()
			&& text.is_char_boundary(r.range.start)
			&& text.is_char_boundary(r.range.end)
	})
}

/// The next-edit cache. Single-threaded by construction; callers must
/// deliver document changes in order and serialize mutations against
/// lookups.
pub struct NextEditCache {
	options: CacheOptions,
	/// Owns the entries. Eviction is the single ownership-transfer point:
	/// it flows to the per-document tracker, which only holds weak
	/// back-references.
	lru: LruCache<CacheKey, EntryHandle, FxBuildHasher>,
	tracked: FxHashMap<DocId, Vec<Weak<RefCell<CachedEdit>>>>,
	provider: Box<dyn LineDiff>,
	trace: Box<dyn TraceSink>,
}

impl NextEditCache {
	pub fn new(options: CacheOptions, provider: Box<dyn LineDiff>, trace: Box<dyn TraceSink>) -> Self {
		let capacity =
			NonZeroUsize::new(options.lru_capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
		Self {
			options,
			lru: LruCache::with_hasher(capacity, FxBuildHasher),
			tracked: FxHashMap::default(),
			provider,
			trace,
		}
	}

	pub fn with_defaults() -> Self {
		Self::new(
			CacheOptions::default(),
			Box::new(HistogramDiff),
			Box::new(LogTraceSink),
		)
	}

	/// Caches the k-th suggestion for a document snapshot.
	///
	/// An inapplicable `user_edit_since` silently demotes the entry to
	/// untracked; it stays usable for exact-state hits.
	#[allow(clippy::too_many_arguments)]
	pub fn set_kth_next_edit(
		&mut self,
		doc_id: DocId,
		snapshot: &str,
		edit_window: Option<OffsetRange>,
		edits: Vec<StringReplacement>,
		detailed_edits: Vec<Vec<Replacement<IndexData>>>,
		subsequent_n: Option<usize>,
		user_edit_since: Option<StringEdit>,
		source: Rc<dyn RequestSource>,
	) -> EntryHandle {
		let user_edit_since = match user_edit_since {
			Some(user) if applies_to(&user, snapshot) => Some(user),
			Some(_) => {
				self.trace
					.trace("set_kth_next_edit: inconsistent user edit, caching untracked");
				None
			}
			None => None,
		};

		let entry = Rc::new(RefCell::new(CachedEdit {
			doc_id,
			document_before_edit: snapshot.to_string(),
			edit_window,
			edits,
			detailed_edits,
			user_edit_since,
			rebase_failed: false,
			rejected: false,
			subsequent_n,
			source,
			cache_time: Instant::now(),
		}));

		if let Some((_, displaced)) = self
			.lru
			.push(CacheKey::new(doc_id, snapshot), Rc::clone(&entry))
		{
			self.evicted_cached_edit(&displaced);
		}
		if entry.borrow().is_tracked() {
			let list = self.tracked.entry(doc_id).or_default();
			list.insert(0, Rc::downgrade(&entry));
			list.truncate(self.options.tracked_entry_limit.max(1));
		}
		entry
	}

	/// Records that the upstream produced no suggestion for this state.
	pub fn set_no_next_edit(
		&mut self,
		doc_id: DocId,
		snapshot: &str,
		edit_window: Option<OffsetRange>,
		source: Rc<dyn RequestSource>,
	) -> EntryHandle {
		self.set_kth_next_edit(
			doc_id,
			snapshot,
			edit_window,
			Vec::new(),
			Vec::new(),
			None,
			Some(StringEdit::empty()),
			source,
		)
	}

	/// Folds one observed document change into every tracked entry.
	/// Changes must arrive in the order they happened on the document.
	pub fn handle_document_changed(&mut self, doc_id: DocId, change: &StringEdit, new_text: &str) {
		let handles: Vec<EntryHandle> = match self.tracked.get(&doc_id) {
			Some(list) => list.iter().filter_map(Weak::upgrade).collect(),
			None => return,
		};
		for entry in &handles {
			let mut e = entry.borrow_mut();
			let Some(user) = e.user_edit_since.take() else {
				continue;
			};
			// A fresh edit may unjam an earlier strict-rebase failure.
			e.rebase_failed = false;

			let mid_len = e.document_before_edit.len().saturating_add_signed(user.len_delta());
			if !change.replacements().iter().all(|r| r.range.end <= mid_len) {
				self.trace
					.trace("document change out of bounds for tracked entry; untracking");
				continue;
			}
			let composed = user.compose(change);
			if applies_to(&composed, &e.document_before_edit)
				&& composed.apply(&e.document_before_edit) == new_text
			{
				e.user_edit_since = Some(composed);
			} else {
				self.trace
					.trace("tracked entry no longer reproduces the document; untracking");
			}
		}
		self.prune_tracked(doc_id);
	}

	/// Drops the whole per-document slice.
	pub fn handle_document_closed(&mut self, doc_id: DocId) {
		self.tracked.remove(&doc_id);
		let keys: Vec<CacheKey> = self
			.lru
			.iter()
			.filter(|(key, _)| key.doc == doc_id)
			.map(|(key, _)| *key)
			.collect();
		for key in keys {
			self.lru.pop(&key);
		}
	}

	/// Finds a suggestion for the document's current state: an exact
	/// state hit first, then rebase-on-lookup over the tracked entries.
	pub fn lookup_next_edit(
		&mut self,
		doc_id: DocId,
		current_doc: &str,
		selection: &[OffsetRange],
	) -> Option<CachedOrRebased> {
		if let Some(entry) = self.lru.get(&CacheKey::new(doc_id, current_doc)) {
			let e = entry.borrow();
			// The hash key is not the text; a collision is a miss.
			if e.document_before_edit == current_doc {
				let in_window = match e.edit_window {
					Some(window) => selection
						.first()
						.is_some_and(|cursor| window.contains_range(cursor)),
					None => true,
				};
				if in_window {
					drop(e);
					return Some(CachedOrRebased::Cached {
						entry: Rc::clone(entry),
					});
				}
			}
		}

		if !self.options.revised_cache_strategy {
			return None;
		}

		let handles: Vec<EntryHandle> = self
			.tracked
			.get(&doc_id)
			.map(|list| list.iter().filter_map(Weak::upgrade).collect())
			.unwrap_or_default();
		for entry in handles {
			{
				let e = entry.borrow();
				if e.rebase_failed || !e.is_tracked() {
					continue;
				}
			}
			if let Some(result) = self.try_rebase_cache_entry(&entry, current_doc, selection) {
				return Some(result);
			}
		}
		None
	}

	/// Attempts a strict rebase of one entry onto the current document,
	/// updating the entry's sticky flags from the outcome.
	pub fn try_rebase_cache_entry(
		&mut self,
		entry: &EntryHandle,
		current_doc: &str,
		selection: &[OffsetRange],
	) -> Option<CachedOrRebased> {
		match self.rebase_entry(entry, current_doc, selection, ResolutionMode::Strict) {
			RebaseOutcome::Rebased(results) => match results.first() {
				None => {
					// The user already applied the whole suggestion; only
					// a cached "no edits" answer is worth returning.
					if entry.borrow().has_edits() {
						None
					} else {
						Some(CachedOrRebased::Cached {
							entry: Rc::clone(entry),
						})
					}
				}
				Some(first) => {
					if !entry.borrow().rejected {
						let doc_id = entry.borrow().doc_id;
						let rejected =
							self.is_rejected_next_edit(doc_id, current_doc, &first.replacement);
						entry.borrow_mut().rejected = rejected;
					}
					Some(CachedOrRebased::Rebased {
						entry: Rc::clone(entry),
						rebased_edit: first.replacement.clone(),
						rebased_edit_index: first.index,
					})
				}
			},
			RebaseOutcome::RebaseFailed => {
				entry.borrow_mut().rebase_failed = true;
				None
			}
			RebaseOutcome::OutsideEditWindow => None,
			RebaseOutcome::InconsistentEdits => {
				entry.borrow_mut().user_edit_since = None;
				None
			}
			RebaseOutcome::Error(error) => {
				self.trace.trace(&format!("rebase error: {error}"));
				entry.borrow_mut().user_edit_since = None;
				None
			}
		}
	}

	/// Marks every entry of the given upstream request as dismissed.
	pub fn rejected_next_edit(&mut self, request_id: &str) {
		for (_, entry) in self.lru.iter() {
			let mut e = entry.borrow_mut();
			if e.source.header_request_id() == request_id {
				e.rejected = true;
			}
		}
	}

	/// Whether `edit` reproduces a suggestion the user already dismissed.
	pub fn is_rejected_next_edit(
		&self,
		doc_id: DocId,
		current_doc: &str,
		edit: &StringReplacement,
	) -> bool {
		if edit.range.end > current_doc.len()
			|| !current_doc.is_char_boundary(edit.range.start)
			|| !current_doc.is_char_boundary(edit.range.end)
		{
			return false;
		}
		let probe = edit.remove_common_suffix_and_prefix(current_doc);
		let Some(list) = self.tracked.get(&doc_id) else {
			return false;
		};
		for weak in list {
			let Some(entry) = weak.upgrade() else { continue };
			{
				let e = entry.borrow();
				if !e.rejected || !e.is_tracked() {
					continue;
				}
			}
			if let RebaseOutcome::Rebased(results) =
				self.rebase_entry(&entry, current_doc, &[], ResolutionMode::Lenient)
				&& results.iter().any(|r| {
					r.replacement.remove_common_suffix_and_prefix(current_doc) == probe
				}) {
				return true;
			}
		}
		false
	}

	/// Removes the tracker's back-reference to an entry the LRU displaced.
	/// Duplicate deliveries are no-ops.
	pub fn evicted_cached_edit(&mut self, entry: &EntryHandle) {
		let doc_id = entry.borrow().doc_id;
		if let Some(list) = self.tracked.get_mut(&doc_id) {
			list.retain(|weak| {
				weak.upgrade().is_none_or(|candidate| !Rc::ptr_eq(&candidate, entry))
			});
			if list.is_empty() {
				self.tracked.remove(&doc_id);
			}
		}
		self.trace.trace("evicted cached edit");
	}

	pub fn clear(&mut self) {
		self.lru.clear();
		self.tracked.clear();
	}

	pub fn len(&self) -> usize {
		self.lru.len()
	}

	pub fn is_empty(&self) -> bool {
		self.lru.is_empty()
	}

	/// Live tracked entries for a document.
	pub fn tracked_count(&self, doc_id: DocId) -> usize {
		self.tracked
			.get(&doc_id)
			.map(|list| list.iter().filter(|w| w.upgrade().is_some()).count())
			.unwrap_or(0)
	}

	fn rebase_entry(
		&self,
		entry: &EntryHandle,
		current_doc: &str,
		selection: &[OffsetRange],
		mode: ResolutionMode,
	) -> RebaseOutcome {
		let e = entry.borrow();
		let Some(user) = e.user_edit_since.as_ref() else {
			return RebaseOutcome::InconsistentEdits;
		};
		if !applies_to(user, &e.document_before_edit) {
			return RebaseOutcome::InconsistentEdits;
		}
		let rebaser = Rebaser::new(&*self.provider, self.options.rebase, self.options.diff);
		rebaser.rebase(&RebaseInput {
			snapshot: &e.document_before_edit,
			edit_window: e.edit_window,
			original_edits: &e.edits,
			detailed_edits: &e.detailed_edits,
			user_edit_since: user,
			current_doc,
			current_selection: selection,
			mode,
		})
	}

	fn prune_tracked(&mut self, doc_id: DocId) {
		if let Some(list) = self.tracked.get_mut(&doc_id) {
			list.retain(|weak| weak.upgrade().is_some_and(|e| e.borrow().is_tracked()));
			if list.is_empty() {
				self.tracked.remove(&doc_id);
			}
		}
	}
}
