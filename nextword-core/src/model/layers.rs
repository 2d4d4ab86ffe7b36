use ndarray::{Array1, Array2, Axis, s};
use rand::Rng;
use serde::{Deserialize, Serialize};

fn sigmoid(x: f32) -> f32 {
	1.0 / (1.0 + (-x).exp())
}

/// Glorot-uniform weight initialization.
pub(crate) fn glorot_uniform<R: Rng>(rows: usize, cols: usize, rng: &mut R) -> Array2<f32> {
	let limit = (6.0 / (rows + cols) as f32).sqrt();
	Array2::from_shape_fn((rows, cols), |_| rng.random_range(-limit..limit))
}

/// Outer product of two vectors.
pub(crate) fn outer(a: &Array1<f32>, b: &Array1<f32>) -> Array2<f32> {
	let a2 = a.view().insert_axis(Axis(1));
	let b2 = b.view().insert_axis(Axis(0));
	a2.dot(&b2)
}

/// Token embedding table.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct Embedding {
	pub(crate) table: Array2<f32>,
}

impl Embedding {
	pub(crate) fn new<R: Rng>(vocab_size: usize, dim: usize, rng: &mut R) -> Self {
		Self {
			table: Array2::from_shape_fn((vocab_size, dim), |_| rng.random_range(-0.05..0.05)),
		}
	}

	pub(crate) fn lookup(&self, id: usize) -> Array1<f32> {
		self.table.row(id).to_owned()
	}
}

/// Fully connected layer, activation applied by the caller.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct Dense {
	pub(crate) w: Array2<f32>,
	pub(crate) b: Array1<f32>,
}

impl Dense {
	pub(crate) fn new<R: Rng>(input: usize, output: usize, rng: &mut R) -> Self {
		Self { w: glorot_uniform(output, input, rng), b: Array1::zeros(output) }
	}

	pub(crate) fn forward(&self, x: &Array1<f32>) -> Array1<f32> {
		self.w.dot(x) + &self.b
	}
}

/// Gradient accumulator for a [`Dense`] layer.
#[derive(Debug)]
pub(crate) struct DenseGrads {
	pub(crate) w: Array2<f32>,
	pub(crate) b: Array1<f32>,
}

impl DenseGrads {
	pub(crate) fn zeros(layer: &Dense) -> Self {
		Self { w: Array2::zeros(layer.w.raw_dim()), b: Array1::zeros(layer.b.raw_dim()) }
	}

	pub(crate) fn scale(&mut self, factor: f32) {
		self.w.mapv_inplace(|v| v * factor);
		self.b.mapv_inplace(|v| v * factor);
	}
}

/// Single LSTM cell with packed gate weights.
///
/// Gate order in the packed dimension is `[input, forget, candidate, output]`.
/// `wx` is `(4h, input_dim)`, `wh` is `(4h, h)`, `b` is `4h`. The forget-gate
/// bias is initialized to 1 so early training does not wipe the cell state.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct LstmCell {
	pub(crate) wx: Array2<f32>,
	pub(crate) wh: Array2<f32>,
	pub(crate) b: Array1<f32>,
}

/// Everything one forward step needs to replay for backpropagation.
pub(crate) struct LstmStep {
	pub(crate) x: Array1<f32>,
	pub(crate) h_prev: Array1<f32>,
	pub(crate) c_prev: Array1<f32>,
	pub(crate) i: Array1<f32>,
	pub(crate) f: Array1<f32>,
	pub(crate) g: Array1<f32>,
	pub(crate) o: Array1<f32>,
	pub(crate) tanh_c: Array1<f32>,
	pub(crate) c: Array1<f32>,
	pub(crate) h: Array1<f32>,
}

impl LstmCell {
	pub(crate) fn new<R: Rng>(input_dim: usize, hidden: usize, rng: &mut R) -> Self {
		let mut b = Array1::zeros(4 * hidden);
		b.slice_mut(s![hidden..2 * hidden]).fill(1.0);
		Self {
			wx: glorot_uniform(4 * hidden, input_dim, rng),
			wh: glorot_uniform(4 * hidden, hidden, rng),
			b,
		}
	}

	pub(crate) fn hidden(&self) -> usize {
		self.b.len() / 4
	}

	/// One timestep forward. Returns the full step cache; the new hidden and
	/// cell states are `step.h` and `step.c`.
	pub(crate) fn step(&self, x: Array1<f32>, h_prev: &Array1<f32>, c_prev: &Array1<f32>) -> LstmStep {
		let h = self.hidden();
		let a = self.wx.dot(&x) + self.wh.dot(h_prev) + &self.b;

		let i = a.slice(s![0..h]).mapv(sigmoid);
		let f = a.slice(s![h..2 * h]).mapv(sigmoid);
		let g = a.slice(s![2 * h..3 * h]).mapv(f32::tanh);
		let o = a.slice(s![3 * h..4 * h]).mapv(sigmoid);

		let c = &f * c_prev + &i * &g;
		let tanh_c = c.mapv(f32::tanh);
		let h_next = &o * &tanh_c;

		LstmStep {
			x,
			h_prev: h_prev.clone(),
			c_prev: c_prev.clone(),
			i,
			f,
			g,
			o,
			tanh_c,
			c,
			h: h_next,
		}
	}

	/// One timestep of backpropagation through time.
	///
	/// `dh` and `dc` are the gradients flowing into this step's outputs.
	/// Accumulates weight gradients into `grads` and returns
	/// `(dx, dh_prev, dc_prev)` for the step below and the step before.
	pub(crate) fn backward(
		&self,
		step: &LstmStep,
		dh: &Array1<f32>,
		dc: &Array1<f32>,
		grads: &mut LstmGrads,
	) -> (Array1<f32>, Array1<f32>, Array1<f32>) {
		let h = self.hidden();

		let d_out = dh * &step.tanh_c;
		let one_minus_t2 = step.tanh_c.mapv(|t| 1.0 - t * t);
		let dc_total = dc + &(&(dh * &step.o) * &one_minus_t2);

		let di = &dc_total * &step.g;
		let df = &dc_total * &step.c_prev;
		let dg = &dc_total * &step.i;
		let dc_prev = &dc_total * &step.f;

		// Pre-activation gradients, same packed gate order as the weights
		let da_i = &di * &step.i.mapv(|v| v * (1.0 - v));
		let da_f = &df * &step.f.mapv(|v| v * (1.0 - v));
		let da_g = &dg * &step.g.mapv(|v| 1.0 - v * v);
		let da_o = &d_out * &step.o.mapv(|v| v * (1.0 - v));

		let mut da = Array1::zeros(4 * h);
		da.slice_mut(s![0..h]).assign(&da_i);
		da.slice_mut(s![h..2 * h]).assign(&da_f);
		da.slice_mut(s![2 * h..3 * h]).assign(&da_g);
		da.slice_mut(s![3 * h..4 * h]).assign(&da_o);

		grads.wx += &outer(&da, &step.x);
		grads.wh += &outer(&da, &step.h_prev);
		grads.b += &da;

		let dx = self.wx.t().dot(&da);
		let dh_prev = self.wh.t().dot(&da);
		(dx, dh_prev, dc_prev)
	}
}

/// Gradient accumulator for an [`LstmCell`].
#[derive(Debug)]
pub(crate) struct LstmGrads {
	pub(crate) wx: Array2<f32>,
	pub(crate) wh: Array2<f32>,
	pub(crate) b: Array1<f32>,
}

impl LstmGrads {
	pub(crate) fn zeros(cell: &LstmCell) -> Self {
		Self {
			wx: Array2::zeros(cell.wx.raw_dim()),
			wh: Array2::zeros(cell.wh.raw_dim()),
			b: Array1::zeros(cell.b.raw_dim()),
		}
	}

	pub(crate) fn scale(&mut self, factor: f32) {
		self.wx.mapv_inplace(|v| v * factor);
		self.wh.mapv_inplace(|v| v * factor);
		self.b.mapv_inplace(|v| v * factor);
	}
}
