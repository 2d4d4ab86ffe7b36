use ndarray::{Array, Dimension, Ix1, Ix2, Zip};

use super::sequence_model::{Gradients, SequenceModel};

/// Fixed training-recipe hyperparameters (framework defaults).
pub const LEARNING_RATE: f32 = 0.001;
const BETA1: f32 = 0.9;
const BETA2: f32 = 0.999;
const EPSILON: f32 = 1e-7;

/// First/second moment estimates for one parameter tensor.
struct Slot<D: Dimension> {
	m: Array<f32, D>,
	v: Array<f32, D>,
}

impl<D: Dimension> Slot<D> {
	fn zeros_like(param: &Array<f32, D>) -> Self {
		Self { m: Array::zeros(param.raw_dim()), v: Array::zeros(param.raw_dim()) }
	}

	fn update(&mut self, param: &mut Array<f32, D>, grad: &Array<f32, D>, lr_t: f32) {
		Zip::from(&mut self.m).and(grad).for_each(|m, &g| *m = BETA1 * *m + (1.0 - BETA1) * g);
		Zip::from(&mut self.v).and(grad).for_each(|v, &g| *v = BETA2 * *v + (1.0 - BETA2) * g * g);
		Zip::from(param)
			.and(&self.m)
			.and(&self.v)
			.for_each(|p, &m, &v| *p -= lr_t * m / (v.sqrt() + EPSILON));
	}
}

/// Adaptive first-order gradient optimizer over all model parameters.
///
/// Holds one moment-estimate slot per parameter tensor; the shapes are fixed
/// at construction against a concrete model and must match it on every
/// `apply`.
pub struct Adam {
	step: usize,
	embedding: Slot<Ix2>,
	lstm1_wx: Slot<Ix2>,
	lstm1_wh: Slot<Ix2>,
	lstm1_b: Slot<Ix1>,
	lstm2_wx: Slot<Ix2>,
	lstm2_wh: Slot<Ix2>,
	lstm2_b: Slot<Ix1>,
	hidden_w: Slot<Ix2>,
	hidden_b: Slot<Ix1>,
	output_w: Slot<Ix2>,
	output_b: Slot<Ix1>,
}

impl Adam {
	pub fn new(model: &SequenceModel) -> Self {
		Self {
			step: 0,
			embedding: Slot::zeros_like(&model.embedding.table),
			lstm1_wx: Slot::zeros_like(&model.lstm1.wx),
			lstm1_wh: Slot::zeros_like(&model.lstm1.wh),
			lstm1_b: Slot::zeros_like(&model.lstm1.b),
			lstm2_wx: Slot::zeros_like(&model.lstm2.wx),
			lstm2_wh: Slot::zeros_like(&model.lstm2.wh),
			lstm2_b: Slot::zeros_like(&model.lstm2.b),
			hidden_w: Slot::zeros_like(&model.hidden.w),
			hidden_b: Slot::zeros_like(&model.hidden.b),
			output_w: Slot::zeros_like(&model.output.w),
			output_b: Slot::zeros_like(&model.output.b),
		}
	}

	/// Applies one optimizer step with bias-corrected learning rate.
	pub(crate) fn apply(&mut self, model: &mut SequenceModel, grads: &Gradients) {
		self.step += 1;
		let t = self.step as f32;
		let lr_t = LEARNING_RATE * (1.0 - BETA2.powf(t)).sqrt() / (1.0 - BETA1.powf(t));

		self.embedding.update(&mut model.embedding.table, &grads.embedding, lr_t);
		self.lstm1_wx.update(&mut model.lstm1.wx, &grads.lstm1.wx, lr_t);
		self.lstm1_wh.update(&mut model.lstm1.wh, &grads.lstm1.wh, lr_t);
		self.lstm1_b.update(&mut model.lstm1.b, &grads.lstm1.b, lr_t);
		self.lstm2_wx.update(&mut model.lstm2.wx, &grads.lstm2.wx, lr_t);
		self.lstm2_wh.update(&mut model.lstm2.wh, &grads.lstm2.wh, lr_t);
		self.lstm2_b.update(&mut model.lstm2.b, &grads.lstm2.b, lr_t);
		self.hidden_w.update(&mut model.hidden.w, &grads.hidden.w, lr_t);
		self.hidden_b.update(&mut model.hidden.b, &grads.hidden.b, lr_t);
		self.output_w.update(&mut model.output.w, &grads.output.w, lr_t);
		self.output_b.update(&mut model.output.b, &grads.output.b, lr_t);
	}
}
