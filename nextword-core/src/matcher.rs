use std::collections::HashSet;

/// Default number of suggestions returned by [`match_lines`].
pub const DEFAULT_MATCH_LIMIT: usize = 10;

/// Ranks literal corpus lines against typed text.
///
/// The non-ML fallback behind the live typeahead: instant suggestions that
/// need no trained model.
///
/// # Behavior
/// - Query and lines are trimmed and lower-cased before comparison.
/// - Rank 1: lines starting with the query, in file order.
/// - Rank 2: lines containing the query as a substring (and not already in
///   rank 1), in file order.
/// - Ranks are concatenated, deduplicated preserving first occurrence, and
///   truncated to `limit`.
///
/// # Edge cases
/// - An empty query returns an empty result, not all lines.
pub fn match_lines(lines: &[String], query: &str, limit: usize) -> Vec<String> {
	let query = query.trim().to_lowercase();
	if query.is_empty() {
		return Vec::new();
	}

	let normalized: Vec<String> = lines.iter().map(|line| line.trim().to_lowercase()).collect();

	let mut results: Vec<&String> = Vec::new();
	results.extend(normalized.iter().filter(|line| line.starts_with(&query)));
	results.extend(
		normalized
			.iter()
			.filter(|line| line.contains(&query) && !line.starts_with(&query)),
	);

	let mut seen = HashSet::new();
	results
		.into_iter()
		.filter(|line| seen.insert(line.as_str()))
		.take(limit)
		.cloned()
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn lines(texts: &[&str]) -> Vec<String> {
		texts.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn prefix_matches_rank_before_substring_matches() {
		let corpus = lines(&["apple pie", "pineapple"]);
		assert_eq!(match_lines(&corpus, "apple", DEFAULT_MATCH_LIMIT), vec![
			"apple pie".to_string(),
			"pineapple".to_string()
		]);
	}

	#[test]
	fn empty_query_returns_nothing() {
		let corpus = lines(&["apple pie", "pineapple"]);
		assert!(match_lines(&corpus, "", DEFAULT_MATCH_LIMIT).is_empty());
		assert!(match_lines(&corpus, "   ", DEFAULT_MATCH_LIMIT).is_empty());
	}

	#[test]
	fn matching_is_case_insensitive() {
		let corpus = lines(&["Apple Pie", "PINEAPPLE"]);
		let results = match_lines(&corpus, "ApPlE", DEFAULT_MATCH_LIMIT);
		assert_eq!(results, vec!["apple pie".to_string(), "pineapple".to_string()]);
	}

	#[test]
	fn result_never_exceeds_limit() {
		let corpus: Vec<String> = (0..30).map(|i| format!("apple {i}")).collect();
		assert_eq!(match_lines(&corpus, "apple", 10).len(), 10);
	}

	#[test]
	fn duplicates_are_removed_preserving_first_occurrence() {
		let corpus = lines(&["apple", "apple", "crabapple", "apple"]);
		assert_eq!(match_lines(&corpus, "apple", DEFAULT_MATCH_LIMIT), vec![
			"apple".to_string(),
			"crabapple".to_string()
		]);
	}

	#[test]
	fn no_match_yields_empty() {
		let corpus = lines(&["banana", "cherry"]);
		assert!(match_lines(&corpus, "apple", DEFAULT_MATCH_LIMIT).is_empty());
	}
}
