use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::SequenceModel;
use crate::vocab::Vocabulary;

/// Current on-disk vocabulary record version.
pub const VOCAB_FORMAT_VERSION: u32 = 1;

/// Everything needed to answer queries for one trained dataset.
///
/// Immutable once persisted; a later training run on the same key overwrites
/// it wholesale. The existence of both on-disk files is the sole signal of
/// "is this dataset trained".
#[derive(Debug, Clone)]
pub struct TrainedArtifact {
	pub model: SequenceModel,
	pub vocabulary: Vocabulary,
	pub max_sequence_len: usize,
}

/// Serialized vocabulary + sequence-length record.
///
/// Versioned so the layout can evolve without silently misreading old files.
#[derive(Serialize, Deserialize, Debug)]
struct VocabRecord {
	version: u32,
	words: Vec<String>,
	max_sequence_len: usize,
}

/// Reads and writes trained artifacts under a models directory.
///
/// Layout: one `<key>.model` file (postcard-encoded model parameters) and
/// one `<key>.vocab` file (versioned vocabulary record) per dataset key.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
	models_dir: PathBuf,
}

impl ArtifactStore {
	/// Opens a store rooted at `models_dir`, creating the directory if needed.
	pub fn new<P: AsRef<Path>>(models_dir: P) -> std::io::Result<Self> {
		let models_dir = models_dir.as_ref().to_path_buf();
		fs::create_dir_all(&models_dir)?;
		Ok(Self { models_dir })
	}

	fn model_path(&self, key: &str) -> PathBuf {
		self.models_dir.join(format!("{key}.model"))
	}

	fn vocab_path(&self, key: &str) -> PathBuf {
		self.models_dir.join(format!("{key}.vocab"))
	}

	/// A dataset counts as trained only when both files are present.
	pub fn is_trained(&self, key: &str) -> bool {
		self.model_path(key).exists() && self.vocab_path(key).exists()
	}

	/// Persists an artifact, replacing any previous one for the same key.
	pub fn save(&self, key: &str, artifact: &TrainedArtifact) -> Result<(), Box<dyn std::error::Error>> {
		let model_bytes = postcard::to_stdvec(&artifact.model)?;
		let record = VocabRecord {
			version: VOCAB_FORMAT_VERSION,
			words: artifact.vocabulary.words().to_vec(),
			max_sequence_len: artifact.max_sequence_len,
		};
		let vocab_bytes = postcard::to_stdvec(&record)?;

		fs::write(self.model_path(key), model_bytes)?;
		fs::write(self.vocab_path(key), vocab_bytes)?;
		Ok(())
	}

	/// Loads the artifact for a key.
	///
	/// # Errors
	/// Fails if either file is missing, unreadable, or the vocabulary record
	/// carries an unknown version.
	pub fn load(&self, key: &str) -> Result<TrainedArtifact, Box<dyn std::error::Error>> {
		let model_bytes = fs::read(self.model_path(key))?;
		let model: SequenceModel = postcard::from_bytes(&model_bytes)?;

		let vocab_bytes = fs::read(self.vocab_path(key))?;
		let record: VocabRecord = postcard::from_bytes(&vocab_bytes)?;
		if record.version != VOCAB_FORMAT_VERSION {
			return Err(format!(
				"Unsupported vocabulary record version: {} (expected {})",
				record.version, VOCAB_FORMAT_VERSION
			)
			.into());
		}

		Ok(TrainedArtifact {
			model,
			vocabulary: Vocabulary::from_words(record.words),
			max_sequence_len: record.max_sequence_len,
		})
	}
}
