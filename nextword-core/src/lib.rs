//! Trainable next-word autocomplete library.
//!
//! This crate provides the full training/inference pipeline behind the
//! autocomplete service:
//! - Vocabulary building (word ↔ id mapping, frequency ordered)
//! - N-gram training example generation with left padding
//! - An LSTM-based sequence model trained with Adam
//! - A training orchestrator with pluggable progress reporting
//! - Top-k next-word inference
//! - A literal prefix/substring matcher for instant suggestions
//! - Dataset registry and trained-artifact persistence
//!
//! Transport concerns (HTTP, WebSocket) live in the server crate; this
//! library only ever sees raw text in and models/suggestions out.

/// Bidirectional word ↔ id vocabulary with a reserved padding sentinel.
pub mod vocab;

/// Conversion of corpus lines into fixed-width n-gram training examples.
pub mod sequence;

/// Neural sequence model and its optimizer.
pub mod model;

/// End-to-end training orchestration with progress events.
pub mod trainer;

/// Top-k next-word inference over a trained artifact.
pub mod infer;

/// Literal prefix/substring ranking over raw corpus lines.
pub mod matcher;

/// On-disk dataset discovery and reading.
pub mod registry;

/// Persistence of trained model + vocabulary artifacts.
pub mod artifact;

/// I/O utilities (file loading, path helpers).
///
/// Not exposed
pub(crate) mod io;
