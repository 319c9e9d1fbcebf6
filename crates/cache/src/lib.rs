//! Per-document caching of inline suggestions.
//!
//! Entries are owned by a shared LRU keyed on document state; a
//! per-document tracker keeps weak handles to the entries that can still
//! be rebased onto the live document. Dismissed suggestions stay behind
//! as rejection memory so identical offers are suppressed.

/// The cache itself.
pub mod cache;
/// Cache entries.
pub mod entry;
/// Host-facing contracts.
pub mod source;

pub use cache::{CacheOptions, CachedOrRebased, EntryHandle, NextEditCache};
pub use entry::CachedEdit;
pub use source::{DocId, LogTraceSink, RequestSource, TraceSink};
