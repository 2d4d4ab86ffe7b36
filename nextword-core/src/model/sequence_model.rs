use ndarray::{Array1, Zip};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::adam::Adam;
use super::layers::{Dense, DenseGrads, Embedding, LstmCell, LstmGrads, outer};

/// Embedding width and recurrent/dense hidden width.
pub const EMBED_DIM: usize = 128;
pub const HIDDEN_DIM: usize = 128;
/// Dropout rate applied to the second recurrent layer's output while training.
pub const DROPOUT_RATE: f32 = 0.2;
const BATCH_SIZE: usize = 32;

/// Neural next-token predictor.
///
/// Fixed architecture: token embedding, two stacked LSTM layers (the first
/// feeding its full sequence output into the second, the second keeping only
/// its final state), dropout, a ReLU hidden layer, and a softmax output over
/// the vocabulary. Trained with cross-entropy against the example label.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SequenceModel {
	pub(crate) vocab_size: usize,
	pub(crate) embedding: Embedding,
	pub(crate) lstm1: LstmCell,
	pub(crate) lstm2: LstmCell,
	pub(crate) hidden: Dense,
	pub(crate) output: Dense,
}

/// Gradients for every parameter tensor of a [`SequenceModel`].
pub(crate) struct Gradients {
	pub(crate) embedding: ndarray::Array2<f32>,
	pub(crate) lstm1: LstmGrads,
	pub(crate) lstm2: LstmGrads,
	pub(crate) hidden: DenseGrads,
	pub(crate) output: DenseGrads,
}

impl Gradients {
	fn zeros(model: &SequenceModel) -> Self {
		Self {
			embedding: ndarray::Array2::zeros(model.embedding.table.raw_dim()),
			lstm1: LstmGrads::zeros(&model.lstm1),
			lstm2: LstmGrads::zeros(&model.lstm2),
			hidden: DenseGrads::zeros(&model.hidden),
			output: DenseGrads::zeros(&model.output),
		}
	}

	fn scale(&mut self, factor: f32) {
		self.embedding.mapv_inplace(|v| v * factor);
		self.lstm1.scale(factor);
		self.lstm2.scale(factor);
		self.hidden.scale(factor);
		self.output.scale(factor);
	}
}

fn softmax(logits: &Array1<f32>) -> Array1<f32> {
	let max = logits.fold(f32::NEG_INFINITY, |a, &b| a.max(b));
	let exps = logits.mapv(|v| (v - max).exp());
	let sum = exps.sum();
	exps / sum
}

impl SequenceModel {
	/// Builds a freshly initialized model sized to the vocabulary.
	pub fn new(vocab_size: usize) -> Self {
		let mut rng = rand::rng();
		Self {
			vocab_size,
			embedding: Embedding::new(vocab_size, EMBED_DIM, &mut rng),
			lstm1: LstmCell::new(EMBED_DIM, HIDDEN_DIM, &mut rng),
			lstm2: LstmCell::new(HIDDEN_DIM, HIDDEN_DIM, &mut rng),
			hidden: Dense::new(HIDDEN_DIM, HIDDEN_DIM, &mut rng),
			output: Dense::new(HIDDEN_DIM, vocab_size, &mut rng),
		}
	}

	pub fn vocab_size(&self) -> usize {
		self.vocab_size
	}

	/// One inference forward pass over a padded context.
	///
	/// Returns the softmax distribution over the vocabulary. Dropout is not
	/// applied; identical input yields identical output.
	pub fn predict_probs(&self, ids: &[usize]) -> Array1<f32> {
		let mut h1 = Array1::zeros(HIDDEN_DIM);
		let mut c1 = Array1::zeros(HIDDEN_DIM);
		let mut h2 = Array1::zeros(HIDDEN_DIM);
		let mut c2 = Array1::zeros(HIDDEN_DIM);

		for &id in ids {
			let x = self.embedding.lookup(id);
			let step1 = self.lstm1.step(x, &h1, &c1);
			let step2 = self.lstm2.step(step1.h.clone(), &h2, &c2);
			h1 = step1.h;
			c1 = step1.c;
			h2 = step2.h;
			c2 = step2.c;
		}

		let z = self.hidden.forward(&h2).mapv(|v| v.max(0.0));
		softmax(&self.output.forward(&z))
	}

	/// One shuffled pass over all examples with mini-batch Adam updates.
	///
	/// Each example's last element is the label, the rest the prefix.
	/// Returns the mean cross-entropy loss over the epoch.
	pub fn fit_epoch(&mut self, examples: &[Vec<usize>], optimizer: &mut Adam) -> f32 {
		let mut rng = rand::rng();
		let mut order: Vec<usize> = (0..examples.len()).collect();
		order.shuffle(&mut rng);

		let mut total_loss = 0.0;
		for batch in order.chunks(BATCH_SIZE) {
			let mut grads = Gradients::zeros(self);
			for &index in batch {
				let example = &examples[index];
				let label = example[example.len() - 1];
				let prefix = &example[..example.len() - 1];
				total_loss += self.example_pass(prefix, label, &mut rng, &mut grads);
			}
			grads.scale(1.0 / batch.len() as f32);
			optimizer.apply(self, &grads);
		}

		total_loss / examples.len() as f32
	}

	/// Forward and backward pass for one training example.
	///
	/// Accumulates parameter gradients into `grads` and returns the
	/// cross-entropy loss of this example.
	fn example_pass<R: Rng>(
		&self,
		prefix: &[usize],
		label: usize,
		rng: &mut R,
		grads: &mut Gradients,
	) -> f32 {
		let steps = prefix.len();
		let mut layer1 = Vec::with_capacity(steps);
		let mut layer2 = Vec::with_capacity(steps);

		let mut h1 = Array1::zeros(HIDDEN_DIM);
		let mut c1 = Array1::zeros(HIDDEN_DIM);
		let mut h2 = Array1::zeros(HIDDEN_DIM);
		let mut c2 = Array1::zeros(HIDDEN_DIM);

		for &id in prefix {
			let x = self.embedding.lookup(id);
			let step1 = self.lstm1.step(x, &h1, &c1);
			let step2 = self.lstm2.step(step1.h.clone(), &h2, &c2);
			h1 = step1.h.clone();
			c1 = step1.c.clone();
			h2 = step2.h.clone();
			c2 = step2.c.clone();
			layer1.push(step1);
			layer2.push(step2);
		}

		// Inverted dropout on the second recurrent layer's final state
		let keep = 1.0 - DROPOUT_RATE;
		let mask = Array1::from_shape_fn(HIDDEN_DIM, |_| {
			if rng.random::<f32>() < DROPOUT_RATE { 0.0 } else { 1.0 / keep }
		});
		let dropped = &h2 * &mask;

		let z_pre = self.hidden.forward(&dropped);
		let z = z_pre.mapv(|v| v.max(0.0));
		let probs = softmax(&self.output.forward(&z));
		let loss = -probs[label].max(1e-9).ln();

		// Cross-entropy against the one-hot label collapses to probs - onehot
		let mut dlogits = probs;
		dlogits[label] -= 1.0;

		grads.output.w += &outer(&dlogits, &z);
		grads.output.b += &dlogits;
		let dz = self.output.w.t().dot(&dlogits);
		let dz_pre = Zip::from(&dz)
			.and(&z_pre)
			.map_collect(|&d, &pre| if pre > 0.0 { d } else { 0.0 });

		grads.hidden.w += &outer(&dz_pre, &dropped);
		grads.hidden.b += &dz_pre;
		let d_dropped = self.hidden.w.t().dot(&dz_pre);

		// Backward through time: second layer first, collecting the gradient
		// each timestep sends down into the first layer's output
		let mut dh2 = &d_dropped * &mask;
		let mut dc2 = Array1::zeros(HIDDEN_DIM);
		let mut into_layer1 = vec![Array1::<f32>::zeros(HIDDEN_DIM); steps];
		for t in (0..steps).rev() {
			let (dx, dh_prev, dc_prev) = self.lstm2.backward(&layer2[t], &dh2, &dc2, &mut grads.lstm2);
			into_layer1[t] = dx;
			dh2 = dh_prev;
			dc2 = dc_prev;
		}

		let mut dh1 = Array1::zeros(HIDDEN_DIM);
		let mut dc1 = Array1::zeros(HIDDEN_DIM);
		for t in (0..steps).rev() {
			let dh_total = &dh1 + &into_layer1[t];
			let (dx, dh_prev, dc_prev) = self.lstm1.backward(&layer1[t], &dh_total, &dc1, &mut grads.lstm1);
			let mut row = grads.embedding.row_mut(prefix[t]);
			row += &dx;
			dh1 = dh_prev;
			dc1 = dc_prev;
		}

		loss
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn probabilities_sum_to_one() {
		let model = SequenceModel::new(7);
		let probs = model.predict_probs(&[0, 1, 2]);
		assert_eq!(probs.len(), 7);
		assert!((probs.sum() - 1.0).abs() < 1e-4);
		assert!(probs.iter().all(|p| *p >= 0.0));
	}

	#[test]
	fn inference_is_deterministic() {
		let model = SequenceModel::new(5);
		let first = model.predict_probs(&[0, 0, 1, 2]);
		let second = model.predict_probs(&[0, 0, 1, 2]);
		assert_eq!(first, second);
	}

	#[test]
	fn fitting_reduces_loss_on_a_tiny_corpus() {
		// Two examples: [1] -> 2 and [1, 2] -> 3, padded to width 3
		let examples = vec![vec![0, 1, 2], vec![1, 2, 3]];
		let mut model = SequenceModel::new(4);
		let mut optimizer = Adam::new(&model);

		let first = model.fit_epoch(&examples, &mut optimizer);
		let mut last = first;
		for _ in 0..40 {
			last = model.fit_epoch(&examples, &mut optimizer);
		}
		assert!(last.is_finite());
		assert!(last < first, "loss did not improve: {first} -> {last}");
	}

	#[test]
	fn trained_model_prefers_the_observed_continuation() {
		let examples = vec![vec![0, 1, 2], vec![1, 2, 3]];
		let mut model = SequenceModel::new(4);
		let mut optimizer = Adam::new(&model);
		for _ in 0..150 {
			model.fit_epoch(&examples, &mut optimizer);
		}

		let probs = model.predict_probs(&[1, 2]);
		let best = probs
			.iter()
			.enumerate()
			.max_by(|a, b| a.1.total_cmp(b.1))
			.map(|(id, _)| id)
			.unwrap();
		assert_eq!(best, 3);
	}

	#[test]
	fn serialization_round_trips() {
		let model = SequenceModel::new(6);
		let bytes = postcard::to_stdvec(&model).unwrap();
		let restored: SequenceModel = postcard::from_bytes(&bytes).unwrap();

		assert_eq!(restored.vocab_size(), 6);
		assert_eq!(model.predict_probs(&[1, 2]), restored.predict_probs(&[1, 2]));
	}
}
