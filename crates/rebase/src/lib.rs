//! Three-way rebase of inline suggestions over concurrent typing.
//!
//! A suggestion is computed against a snapshot; by the time it can be
//! applied the user has kept typing. The rebaser maps the suggestion
//! across the user's edit, absorbing typing that agrees with it and
//! rejecting structural conflicts, in either strict or lenient mode.

/// Outcome values and configuration.
pub mod outcome;
/// The rebase pipeline and core walk.
pub mod rebaser;

pub use outcome::{RebaseConfig, RebaseError, RebaseOutcome, RebasedEdit, ResolutionMode};
pub use rebaser::{RebaseInput, Rebaser};
