use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::io::{get_filename, list_files, read_file, read_text};

/// Immutable snapshot of the datasets available on disk.
///
/// Maps dataset keys (file stems) to their `.txt` file paths. A registry is
/// rebuilt by rescanning the data directory after each upload; holders swap
/// the whole snapshot so concurrent readers see either the old or the new
/// registry, never a partial one.
#[derive(Debug, Clone)]
pub struct DatasetRegistry {
	root: PathBuf,
	datasets: HashMap<String, PathBuf>,
}

impl DatasetRegistry {
	/// Scans a directory for `.txt` files and builds a registry snapshot.
	pub fn scan<P: AsRef<Path>>(root: P) -> io::Result<Self> {
		let root = root.as_ref().to_path_buf();
		let mut datasets = HashMap::new();

		for file in list_files(&root, "txt")? {
			let path = root.join(&file);
			datasets.insert(get_filename(&path)?, path);
		}

		log::debug!("registry scan of {} found {} dataset(s)", root.display(), datasets.len());
		Ok(Self { root, datasets })
	}

	/// The directory this registry was scanned from.
	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Sorted list of dataset keys.
	pub fn keys(&self) -> Vec<String> {
		let mut keys: Vec<String> = self.datasets.keys().cloned().collect();
		keys.sort();
		keys
	}

	pub fn contains(&self, key: &str) -> bool {
		self.datasets.contains_key(key)
	}

	/// Reads the full text of a dataset.
	///
	/// An unknown key reports `NotFound`, same as a vanished file.
	pub fn read(&self, key: &str) -> io::Result<String> {
		let path = self.path(key)?;
		read_text(path)
	}

	/// Reads a dataset as individual lines.
	pub fn read_lines(&self, key: &str) -> io::Result<Vec<String>> {
		let path = self.path(key)?;
		read_file(path)
	}

	fn path(&self, key: &str) -> io::Result<&Path> {
		self.datasets
			.get(key)
			.map(PathBuf::as_path)
			.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("Unknown dataset: {key}")))
	}
}
