use crate::artifact::TrainedArtifact;
use crate::vocab::PAD_ID;

/// Default number of candidate words returned.
pub const DEFAULT_PREDICTIONS: usize = 5;

/// Produces a ranked list of candidate next words for a partial text.
///
/// # Behavior
/// - Tokenizes the query against the stored vocabulary; out-of-vocabulary
///   words produce no id and drop out of the context silently.
/// - Keeps the last `max_sequence_len - 1` ids, left-padding with the
///   sentinel, and runs one forward pass.
/// - Takes the `k` highest-probability output positions, ties broken by
///   lowest vocabulary id, and maps them back to words. Ids outside the
///   vocabulary map to the empty string rather than failing.
///
/// Deterministic and side-effect free.
pub fn predict_next_words(artifact: &TrainedArtifact, text: &str, k: usize) -> Vec<String> {
	let text = text.trim().to_lowercase();
	let ids = artifact.vocabulary.encode(&text);

	let context_len = artifact.max_sequence_len.saturating_sub(1).max(1);
	let mut context = vec![PAD_ID; context_len];
	let tail = if ids.len() > context_len { &ids[ids.len() - context_len..] } else { &ids };
	context[context_len - tail.len()..].copy_from_slice(tail);

	let probs = artifact.model.predict_probs(&context);
	top_k_indices(probs.as_slice().unwrap_or(&[]), k)
		.into_iter()
		.map(|id| artifact.vocabulary.word(id).to_owned())
		.collect()
}

/// Indices of the `k` largest values, descending, ties broken by lowest index.
pub(crate) fn top_k_indices(values: &[f32], k: usize) -> Vec<usize> {
	let mut ranked: Vec<(usize, f32)> = values.iter().copied().enumerate().collect();
	ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
	ranked.into_iter().take(k).map(|(index, _)| index).collect()
}

#[cfg(test)]
mod tests {
	use crate::artifact::TrainedArtifact;
	use crate::model::SequenceModel;
	use crate::vocab::Vocabulary;

	use super::*;

	fn sample_artifact() -> TrainedArtifact {
		let vocabulary = Vocabulary::build("paris lyon nice marseille");
		TrainedArtifact {
			model: SequenceModel::new(vocabulary.len()),
			vocabulary,
			max_sequence_len: 4,
		}
	}

	#[test]
	fn top_k_orders_by_value_then_index() {
		let values = [0.1, 0.5, 0.5, 0.2];
		assert_eq!(top_k_indices(&values, 3), vec![1, 2, 3]);
	}

	#[test]
	fn top_k_never_exceeds_available_positions() {
		let values = [0.3, 0.7];
		assert_eq!(top_k_indices(&values, 5).len(), 2);
	}

	#[test]
	fn predictions_come_from_the_vocabulary() {
		let artifact = sample_artifact();
		let predictions = predict_next_words(&artifact, "paris lyon", 3);

		assert_eq!(predictions.len(), 3);
		for word in &predictions {
			// Either a real vocabulary word or the sentinel's empty string
			assert!(word.is_empty() || artifact.vocabulary.id(word).is_some());
		}
	}

	#[test]
	fn unknown_query_words_drop_without_error() {
		let artifact = sample_artifact();
		let predictions = predict_next_words(&artifact, "completely unknown words", 2);
		assert_eq!(predictions.len(), 2);
	}

	#[test]
	fn long_query_is_truncated_to_the_context_window() {
		let artifact = sample_artifact();
		// 4 known words with a context window of 3; must not panic
		let predictions = predict_next_words(&artifact, "paris lyon nice marseille", 2);
		assert_eq!(predictions.len(), 2);
	}

	#[test]
	fn inference_is_deterministic() {
		let artifact = sample_artifact();
		let first = predict_next_words(&artifact, "paris", 4);
		let second = predict_next_words(&artifact, "paris", 4);
		assert_eq!(first, second);
	}
}
