//! Rebase outcomes and configuration.

use drift_edits::StringReplacement;
use thiserror::Error;

/// How the rebaser treats ambiguity between the suggestion and the user's
/// typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
	/// Reject on any ambiguity; used when applying suggestions.
	Strict,
	/// Accept best-effort alignments where the user's interior edits agree
	/// with or are subsumed by the suggestion; used for matching dismissed
	/// suggestions.
	Lenient,
}

/// Agreement thresholds for strict resolution.
#[derive(Debug, Clone, Copy)]
pub struct RebaseConfig {
	/// Largest accepted offset of the user's text within the suggestion's
	/// text before strict mode treats the typing as diverged.
	pub max_agreement_offset: usize,
	/// Above this user-text length, strict mode only accepts an exact
	/// (zero-offset) agreement.
	pub max_imperfect_agreement_length: usize,
}

impl Default for RebaseConfig {
	fn default() -> Self {
		Self {
			max_agreement_offset: 10,
			max_imperfect_agreement_length: 5,
		}
	}
}

/// One rebased replacement, tagged with the index of the original coarse
/// replacement it descends from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebasedEdit {
	pub replacement: StringReplacement,
	pub index: usize,
}

/// The single result of one rebase call. Recoverable conditions are
/// values, never panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseOutcome {
	/// The suggestion survives, reshaped into current-document
	/// coordinates. Empty when the user already applied all of it.
	Rebased(Vec<RebasedEdit>),
	/// The cursor left the suggestion's edit window.
	OutsideEditWindow,
	/// Structural conflict between the suggestion and the typing.
	RebaseFailed,
	/// The supplied user edit does not map the snapshot onto the current
	/// document, or the rebased result failed the consistency check.
	InconsistentEdits,
	/// Unexpected internal failure; retryable externally.
	Error(RebaseError),
}

/// Internal failures surfaced as values so callers can demote them to a
/// cache miss.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RebaseError {
	#[error("rebased replacement ends at {end} past document length {len}")]
	RangeOutOfBounds { end: usize, len: usize },
	#[error("rebased replacements out of order at piece {index}")]
	OutOfOrder { index: usize },
	#[error("original replacements out of order at index {index}")]
	UnorderedOriginals { index: usize },
}
