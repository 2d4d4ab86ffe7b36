use std::collections::HashMap;

/// Reserved id for padding and unknown words.
pub const PAD_ID: usize = 0;

/// Bidirectional mapping between words and positive integer ids.
///
/// Ids are assigned from 1 upward in descending-frequency order over the
/// source text, ties broken by first occurrence. Id 0 is reserved as the
/// padding/unknown sentinel and never maps to a real word.
///
/// # Responsibilities
/// - Build the mapping from raw text (whitespace tokenization)
/// - Encode text into id sequences, dropping out-of-vocabulary words
/// - Decode ids back to words, with a defined sentinel for absent ids
///
/// # Invariants
/// - Every id in `1..len()` maps to exactly one word and vice versa
/// - `len()` = distinct word count + 1 (the sentinel)
/// - Building twice from identical input yields identical mappings
#[derive(Clone, Debug)]
pub struct Vocabulary {
	/// Word → id (ids start at 1).
	word_to_id: HashMap<String, usize>,
	/// Id → word; index 0 holds the empty sentinel word.
	id_to_word: Vec<String>,
}

impl Vocabulary {
	/// Builds a vocabulary from raw text.
	///
	/// Splits on whitespace across all lines and counts word frequencies.
	/// No normalization is performed here; callers lower-case the text
	/// beforehand if case-insensitive behavior is wanted.
	///
	/// Empty input yields a vocabulary of size 1 (just the sentinel);
	/// downstream training must short-circuit on it.
	pub fn build(text: &str) -> Self {
		let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
		for (position, word) in text.split_whitespace().enumerate() {
			let entry = counts.entry(word).or_insert((0, position));
			entry.0 += 1;
		}

		let mut ranked: Vec<(&str, usize, usize)> =
			counts.into_iter().map(|(word, (count, first))| (word, count, first)).collect();
		// Descending frequency, ties by first occurrence
		ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

		Self::from_words(ranked.into_iter().map(|(word, _, _)| word.to_owned()).collect())
	}

	/// Rebuilds a vocabulary from an ordered word list.
	///
	/// `words[i]` is assigned id `i + 1`; id 0 stays the sentinel. Used when
	/// loading a persisted artifact.
	pub fn from_words(words: Vec<String>) -> Self {
		let mut id_to_word = Vec::with_capacity(words.len() + 1);
		id_to_word.push(String::new());
		id_to_word.extend(words);

		let word_to_id = id_to_word
			.iter()
			.enumerate()
			.skip(1)
			.map(|(id, word)| (word.clone(), id))
			.collect();

		Self { word_to_id, id_to_word }
	}

	/// Number of ids, sentinel included.
	pub fn len(&self) -> usize {
		self.id_to_word.len()
	}

	/// Whether the vocabulary holds only the sentinel.
	pub fn is_empty(&self) -> bool {
		self.id_to_word.len() <= 1
	}

	/// Returns the id of a word, or `None` if out of vocabulary.
	pub fn id(&self, word: &str) -> Option<usize> {
		self.word_to_id.get(word).copied()
	}

	/// Returns the word for an id.
	///
	/// The sentinel id and any id outside the vocabulary both yield the
	/// empty string; this lookup never fails.
	pub fn word(&self, id: usize) -> &str {
		self.id_to_word.get(id).map(String::as_str).unwrap_or("")
	}

	/// Ordered word list without the sentinel, for persistence.
	pub fn words(&self) -> &[String] {
		&self.id_to_word[1..]
	}

	/// Encodes text into a sequence of ids.
	///
	/// Out-of-vocabulary words produce no id and are silently omitted.
	pub fn encode(&self, text: &str) -> Vec<usize> {
		text.split_whitespace().filter_map(|word| self.id(word)).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn size_is_distinct_words_plus_sentinel() {
		let vocabulary = Vocabulary::build("the cat sat on the mat");
		// "the" appears twice, 5 distinct words
		assert_eq!(vocabulary.len(), 6);
	}

	#[test]
	fn sentinel_never_assigned_to_a_word() {
		let vocabulary = Vocabulary::build("a b c a");
		for word in ["a", "b", "c"] {
			assert_ne!(vocabulary.id(word), Some(PAD_ID));
		}
		assert_eq!(vocabulary.word(PAD_ID), "");
	}

	#[test]
	fn ids_follow_descending_frequency_then_first_occurrence() {
		let vocabulary = Vocabulary::build("b a a c b a");
		assert_eq!(vocabulary.id("a"), Some(1)); // 3 occurrences
		assert_eq!(vocabulary.id("b"), Some(2)); // 2 occurrences
		assert_eq!(vocabulary.id("c"), Some(3)); // 1 occurrence
	}

	#[test]
	fn tie_broken_by_first_occurrence() {
		let vocabulary = Vocabulary::build("zebra apple mango");
		assert_eq!(vocabulary.id("zebra"), Some(1));
		assert_eq!(vocabulary.id("apple"), Some(2));
		assert_eq!(vocabulary.id("mango"), Some(3));
	}

	#[test]
	fn build_is_deterministic() {
		let text = "one two two three three three";
		let first = Vocabulary::build(text);
		let second = Vocabulary::build(text);
		assert_eq!(first.words(), second.words());
		for word in text.split_whitespace() {
			assert_eq!(first.id(word), second.id(word));
		}
	}

	#[test]
	fn empty_input_yields_sentinel_only() {
		let vocabulary = Vocabulary::build("");
		assert_eq!(vocabulary.len(), 1);
		assert!(vocabulary.is_empty());
	}

	#[test]
	fn encode_drops_unknown_words() {
		let vocabulary = Vocabulary::build("hello world");
		assert_eq!(vocabulary.encode("hello unseen world"), vec![
			vocabulary.id("hello").unwrap(),
			vocabulary.id("world").unwrap()
		]);
	}

	#[test]
	fn real_ids_never_decode_to_empty() {
		let vocabulary = Vocabulary::build("alpha beta gamma");
		for id in 1..vocabulary.len() {
			assert!(!vocabulary.word(id).is_empty());
		}
	}

	#[test]
	fn from_words_round_trips() {
		let vocabulary = Vocabulary::build("pine apple pine");
		let restored = Vocabulary::from_words(vocabulary.words().to_vec());
		assert_eq!(restored.len(), vocabulary.len());
		assert_eq!(restored.id("pine"), vocabulary.id("pine"));
		assert_eq!(restored.id("apple"), vocabulary.id("apple"));
	}
}
