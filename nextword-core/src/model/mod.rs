//! Neural sequence model for next-word prediction.
//!
//! This module provides:
//! - The fixed model architecture (`SequenceModel`)
//! - The Adam optimizer over its parameters (`Adam`)
//! - Internal layer primitives (embedding, LSTM cells, dense layers)

/// The next-token predictor: architecture, forward pass, and training step.
pub mod sequence_model;

/// Adaptive first-order gradient optimizer matched to `SequenceModel`.
pub mod adam;

/// Internal layer primitives and their gradient accumulators.
///
/// Not exposed
mod layers;

pub use adam::Adam;
pub use sequence_model::SequenceModel;
