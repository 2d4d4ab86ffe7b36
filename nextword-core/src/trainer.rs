use crate::artifact::{ArtifactStore, TrainedArtifact};
use crate::model::{Adam, SequenceModel};
use crate::sequence;
use crate::vocab::Vocabulary;

/// Fixed training regimen: 100 epochs, no early stopping, no validation split.
pub const TRAIN_EPOCHS: usize = 100;

/// Progress notifications emitted during one training run.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainEvent {
	Started,
	Epoch { epoch: usize, total: usize, loss: f32 },
	Completed { dataset: String },
	Failed { reason: String },
}

/// Abstract destination for streamed training status updates.
///
/// Emission is fire-and-forget: a sink that discards events (for example
/// because the client behind it disconnected) must not stop the run.
pub trait ProgressSink {
	fn emit(&mut self, event: TrainEvent);
}

impl<F: FnMut(TrainEvent)> ProgressSink for F {
	fn emit(&mut self, event: TrainEvent) {
		self(event)
	}
}

/// Drives the end-to-end training pipeline for one dataset.
///
/// # Responsibilities
/// - Tokenize the corpus and build the vocabulary
/// - Generate padded n-gram training examples
/// - Construct and fit the sequence model, reporting per-epoch progress
/// - Persist the trained artifact keyed by dataset name
///
/// # Invariants
/// - An untrainable corpus aborts before model construction; a zero-sized
///   model is never built and no artifact files are written
/// - A successful run writes both artifact files before `Completed` is
///   emitted
pub struct Trainer {
	store: ArtifactStore,
}

impl Trainer {
	pub fn new(store: ArtifactStore) -> Self {
		Self { store }
	}

	/// Runs the full pipeline on raw corpus text.
	///
	/// The text is lower-cased before tokenization. Emits `Started`, one
	/// `Epoch` per epoch, and a terminal `Completed` or `Failed` event.
	///
	/// # Errors
	/// Returns an error if the corpus yields no training sequences or if
	/// persisting the artifact fails; the same reason is reported to the
	/// sink as a `Failed` event first.
	pub fn train(
		&self,
		dataset: &str,
		text: &str,
		sink: &mut dyn ProgressSink,
	) -> Result<TrainedArtifact, String> {
		sink.emit(TrainEvent::Started);
		log::info!("training started for dataset '{dataset}'");

		let text = text.to_lowercase();
		let vocabulary = Vocabulary::build(&text);
		let lines: Vec<String> = text.lines().map(str::to_owned).collect();
		let training = sequence::generate(&vocabulary, &lines);

		if vocabulary.is_empty() || training.is_empty() {
			let reason =
				"Insufficient corpus: no training sequences could be generated".to_owned();
			sink.emit(TrainEvent::Failed { reason: reason.clone() });
			log::warn!("training aborted for dataset '{dataset}': {reason}");
			return Err(reason);
		}

		let mut model = SequenceModel::new(vocabulary.len());
		let mut optimizer = Adam::new(&model);

		for epoch in 1..=TRAIN_EPOCHS {
			let loss = model.fit_epoch(&training.examples, &mut optimizer);
			sink.emit(TrainEvent::Epoch { epoch, total: TRAIN_EPOCHS, loss });
		}

		let artifact = TrainedArtifact {
			model,
			vocabulary,
			max_sequence_len: training.max_sequence_len,
		};

		if let Err(error) = self.store.save(dataset, &artifact) {
			let reason = format!("Could not persist trained artifact: {error}");
			sink.emit(TrainEvent::Failed { reason: reason.clone() });
			return Err(reason);
		}

		sink.emit(TrainEvent::Completed { dataset: dataset.to_owned() });
		log::info!("training complete for dataset '{dataset}'");
		Ok(artifact)
	}
}
