use std::sync::mpsc;
use std::thread;

use crate::vocab::{PAD_ID, Vocabulary};

/// Fixed-width n-gram training examples derived from a corpus.
///
/// Every example has length exactly `max_sequence_len`; the last element is
/// the label and the preceding elements are the left-padded prefix context.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
	pub examples: Vec<Vec<usize>>,
	pub max_sequence_len: usize,
}

impl TrainingSet {
	/// An empty set, the "untrainable corpus" marker.
	pub fn empty() -> Self {
		Self { examples: Vec::new(), max_sequence_len: 0 }
	}

	pub fn is_empty(&self) -> bool {
		self.examples.is_empty()
	}
}

/// Converts corpus lines into fixed-width n-gram training examples.
///
/// For each line, encoded as token ids, every prefix length `i` in
/// `1..line_len` emits the sub-sequence of length `i + 1` (prefix plus next
/// token as label). All examples are left-padded with the sentinel id to the
/// corpus-wide maximum length.
///
/// # Behavior
/// - Lines are expanded in parallel chunks (based on CPU cores * factor).
/// - Chunks are merged back in index order, so example order matches file
///   order and the output is deterministic.
///
/// # Edge cases
/// - If no line yields a multi-token sequence (all lines have <= 1 known
///   token), returns `TrainingSet::empty()` with `max_sequence_len = 0`;
///   callers must treat this as an untrainable corpus.
pub fn generate(vocabulary: &Vocabulary, lines: &[String]) -> TrainingSet {
	if lines.is_empty() {
		return TrainingSet::empty();
	}

	let cpus = num_cpus::get();
	let factor = 8;
	let chunks = cpus * factor;
	let chunk_size = ((lines.len() + chunks - 1) / chunks).max(1);

	let (tx, rx) = mpsc::channel();
	thread::scope(|scope| {
		for (index, chunk) in lines.chunks(chunk_size).enumerate() {
			let tx = tx.clone();
			scope.spawn(move || {
				let mut partial: Vec<Vec<usize>> = Vec::new();
				for line in chunk {
					let ids = vocabulary.encode(line);
					for i in 1..ids.len() {
						partial.push(ids[..=i].to_vec());
					}
				}
				tx.send((index, partial)).expect("failed to send from worker thread");
			});
		}
		drop(tx);
	});

	let mut parts: Vec<(usize, Vec<Vec<usize>>)> = rx.iter().collect();
	parts.sort_by_key(|(index, _)| *index);

	let mut examples: Vec<Vec<usize>> = parts.into_iter().flat_map(|(_, part)| part).collect();
	if examples.is_empty() {
		return TrainingSet::empty();
	}

	let max_sequence_len = examples.iter().map(Vec::len).max().unwrap_or(0);
	for example in &mut examples {
		if example.len() < max_sequence_len {
			let mut padded = vec![PAD_ID; max_sequence_len - example.len()];
			padded.extend_from_slice(example);
			*example = padded;
		}
	}

	TrainingSet { examples, max_sequence_len }
}

#[cfg(test)]
mod tests {
	use super::*;

	fn lines(texts: &[&str]) -> Vec<String> {
		texts.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn single_line_expands_to_prefix_label_pairs() {
		let vocabulary = Vocabulary::build("a b c");
		let a = vocabulary.id("a").unwrap();
		let b = vocabulary.id("b").unwrap();
		let c = vocabulary.id("c").unwrap();

		let set = generate(&vocabulary, &lines(&["a b c"]));
		assert_eq!(set.max_sequence_len, 3);
		assert_eq!(set.examples, vec![vec![PAD_ID, a, b], vec![a, b, c]]);
	}

	#[test]
	fn example_count_is_token_count_minus_one_per_line() {
		let text = "one two three four\nfive six";
		let vocabulary = Vocabulary::build(text);
		let corpus = lines(&["one two three four", "five six"]);

		let set = generate(&vocabulary, &corpus);
		assert_eq!(set.examples.len(), 3 + 1);
	}

	#[test]
	fn every_example_has_uniform_width() {
		let text = "a b\nc d e f g";
		let vocabulary = Vocabulary::build(text);
		let set = generate(&vocabulary, &lines(&["a b", "c d e f g"]));

		assert_eq!(set.max_sequence_len, 5);
		for example in &set.examples {
			assert_eq!(example.len(), set.max_sequence_len);
		}
	}

	#[test]
	fn labels_are_never_the_sentinel() {
		let text = "the quick brown fox";
		let vocabulary = Vocabulary::build(text);
		let set = generate(&vocabulary, &lines(&["the quick brown fox"]));

		for example in &set.examples {
			assert_ne!(*example.last().unwrap(), PAD_ID);
		}
	}

	#[test]
	fn single_word_lines_yield_empty_set() {
		let vocabulary = Vocabulary::build("hello\nworld");
		let set = generate(&vocabulary, &lines(&["hello", "world"]));

		assert!(set.is_empty());
		assert_eq!(set.max_sequence_len, 0);
	}

	#[test]
	fn empty_corpus_yields_empty_set() {
		let vocabulary = Vocabulary::build("");
		let set = generate(&vocabulary, &[]);
		assert!(set.is_empty());
		assert_eq!(set.max_sequence_len, 0);
	}

	#[test]
	fn order_matches_file_order() {
		// Enough lines to span several worker chunks
		let texts: Vec<String> = (0..200).map(|i| format!("w{i} x{i} y{i}")).collect();
		let vocabulary = Vocabulary::build(&texts.join("\n"));

		let set = generate(&vocabulary, &texts);
		let replay = generate(&vocabulary, &texts);
		assert_eq!(set, replay);

		// First example comes from the first line
		let w0 = vocabulary.id("w0").unwrap();
		let x0 = vocabulary.id("x0").unwrap();
		let first = &set.examples[0];
		assert_eq!(&first[first.len() - 2..], &[w0, x0]);
	}
}
