//! Binary sentiment classification: batching, the training driver, artifacts and inference

/// Common model trait for text classification
pub mod model;

/// Batcher
pub mod batcher;

/// Model and tokenizer loading
pub mod loader;

/// Training loop driver
pub mod training;

/// Driver states and the stop signal
pub mod state;

/// Learning rate schedule
pub mod schedule;

/// Evaluation metrics
pub mod metrics;

/// Checkpoints written when a run is interrupted
pub mod checkpoint;

/// The artifact directory
pub mod artifacts;

/// Inference
pub mod inference;

/// End-to-end runs
pub mod pipeline;

pub use batcher::Batcher;
pub use inference::{Prediction, Predictor};
pub use model::Model;
pub use pipeline::{fine_tune, run, RunSummary, Status};
pub use state::StopSignal;
pub use training::Trainer;
