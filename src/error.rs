use std::path::PathBuf;

use crate::{
    config::ConfigError,
    datasets::DataLoadError,
    pipelines::text_classification::{batcher::ShapeError, metrics::EvalMetrics, state::State},
};

/// A Result with the crate Error as the default error type
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced to the caller of a training run
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Bad run parameters, raised before any resource is touched
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unreadable or malformed dataset
    #[error(transparent)]
    DataLoad(#[from] DataLoadError),

    /// The model or tokenizer could not be obtained
    #[error("unable to load {what} '{name}': {reason}")]
    ModelLoad {
        /// "model" or "tokenizer"
        what: &'static str,
        /// The requested identifier
        name: String,
        /// What went wrong
        reason: String,
    },

    /// The examples of a batch do not agree on their shape
    #[error("batch shape mismatch in epoch {epoch}, batch {batch}: {source}")]
    BatchShape {
        /// Epoch index
        epoch: usize,
        /// Batch index within the epoch
        batch: usize,
        /// The shape fault
        source: ShapeError,
    },

    /// The training loss became NaN or infinite
    #[error("training diverged in epoch {epoch}, batch {batch}: loss is {loss}")]
    TrainingDiverged {
        /// Epoch index
        epoch: usize,
        /// Batch index within the epoch
        batch: usize,
        /// The offending loss value
        loss: f64,
    },

    /// Training completed but the artifact directory could not be written
    #[error("unable to write artifacts to {}: {reason}", dir.display())]
    ArtifactWrite {
        /// The artifact directory
        dir: PathBuf,
        /// What went wrong
        reason: String,
        /// Evaluation metrics of the completed run
        metrics: Vec<EvalMetrics>,
    },

    /// A checkpoint could not be written or read
    #[error("checkpoint error at {}: {reason}", dir.display())]
    Checkpoint {
        /// The checkpoint directory
        dir: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// The metrics log could not be appended to
    #[error("unable to append to metrics log {}: {reason}", path.display())]
    MetricsLog {
        /// The log file
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// Text could not be turned into model input
    #[error("unable to prepare inference input: {0}")]
    Inference(String),

    /// The training driver was asked to make an illegal state transition
    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: State,
        /// Requested state
        to: State,
    },

    /// Predicted and true label sequences differ in length
    #[error("predicted and true labels differ in length ({predicted} vs {truth})")]
    LengthMismatch {
        /// Number of predicted labels
        predicted: usize,
        /// Number of true labels
        truth: usize,
    },
}
