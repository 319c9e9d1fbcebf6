//! Four-gram multiset similarity between byte strings.

use std::collections::HashMap;

const GRAM_LEN: usize = 4;

/// Similarity of two strings by their multisets of four-byte windows.
///
/// Score is `(|A| + |B| - sym_diff) / (|A| + |B|)` where `sym_diff` is the
/// size of the symmetric multiset difference. Strings shorter than a gram
/// score `1.0` when equal, else `0.0`.
pub fn ngram_similarity(a: &str, b: &str) -> f64 {
	if a.len() < GRAM_LEN || b.len() < GRAM_LEN {
		return if a == b { 1.0 } else { 0.0 };
	}

	let grams_a = count_grams(a);
	let grams_b = count_grams(b);
	let total_a = a.len() - GRAM_LEN + 1;
	let total_b = b.len() - GRAM_LEN + 1;

	let mut sym_diff = 0usize;
	for (gram, &count_a) in &grams_a {
		let count_b = grams_b.get(gram).copied().unwrap_or(0);
		sym_diff += count_a.abs_diff(count_b);
	}
	for (gram, &count_b) in &grams_b {
		if !grams_a.contains_key(gram) {
			sym_diff += count_b;
		}
	}

	let total = total_a + total_b;
	(total - sym_diff) as f64 / total as f64
}

fn count_grams(s: &str) -> HashMap<&[u8], usize> {
	let mut grams = HashMap::new();
	for window in s.as_bytes().windows(GRAM_LEN) {
		*grams.entry(window).or_insert(0) += 1;
	}
	grams
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn identical_strings_score_one() {
		assert_eq!(ngram_similarity("let result = 42;", "let result = 42;"), 1.0);
	}

	#[test]
	fn disjoint_strings_score_zero() {
		assert_eq!(ngram_similarity("aaaaaa", "bbbbbb"), 0.0);
	}

	#[test]
	fn short_strings_compare_exactly() {
		assert_eq!(ngram_similarity("ab", "ab"), 1.0);
		assert_eq!(ngram_similarity("ab", "ac"), 0.0);
		assert_eq!(ngram_similarity("ab", "abcdef"), 0.0);
	}

	#[test]
	fn partial_overlap_scores_between() {
		let score = ngram_similarity("hello world", "hello there");
		assert!(score > 0.0 && score < 1.0, "got {score}");
	}

	#[test]
	fn is_symmetric() {
		let ab = ngram_similarity("foo bar baz", "foo baz bar");
		let ba = ngram_similarity("foo baz bar", "foo bar baz");
		assert_eq!(ab, ba);
	}
}
