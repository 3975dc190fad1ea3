use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    config::Config as _,
    module::Module,
    record::{CompactRecorder, Recorder},
    tensor::backend::Backend,
};
use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::{models::mean_pool, Error, Result};

use super::{
    artifacts::{CONFIG_FILE, MODEL_FILE, RECORD_EXTENSION},
    metrics::EvalMetrics,
};

/// Progress state written next to the model record
pub static PROGRESS_FILE: &str = "checkpoint.json";

/// How far an interrupted run got
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, new)]
pub struct Progress {
    /// The epoch that was interrupted
    pub epoch: usize,

    /// The first batch of that epoch which has not been applied
    pub next_batch: usize,

    /// Evaluation records of the epochs that completed
    pub metrics: Vec<EvalMetrics>,

    /// Learning rate scheduler record: optimizer steps taken so far
    #[serde(default)]
    pub schedule_step: usize,
}

/// The checkpoint directory that belongs to an output directory
pub fn dir_for(output_dir: &str) -> PathBuf {
    PathBuf::from(format!("{}-checkpoint", output_dir.trim_end_matches('/')))
}

/// Write the model, its configuration and the progress state to `dir`
pub fn save<B: Backend, M: Module<B>>(
    dir: &Path,
    model: M,
    model_config: &mean_pool::Config,
    progress: &Progress,
) -> Result<()> {
    let fail = |reason: String| Error::Checkpoint {
        dir: dir.to_path_buf(),
        reason,
    };

    fs::create_dir_all(dir).map_err(|e| fail(e.to_string()))?;

    model_config
        .save(dir.join(CONFIG_FILE))
        .map_err(|e| fail(e.to_string()))?;

    Recorder::<B>::record(&CompactRecorder::new(), model.into_record(), dir.join(MODEL_FILE))
        .map_err(|e| fail(e.to_string()))?;

    let state = serde_json::to_string_pretty(progress).map_err(|e| fail(e.to_string()))?;
    fs::write(dir.join(PROGRESS_FILE), state).map_err(|e| fail(e.to_string()))?;

    log::info!(
        "Checkpoint written to {} (epoch {}, next batch {})",
        dir.display(),
        progress.epoch,
        progress.next_batch
    );

    Ok(())
}

/// Read the progress state of a checkpoint
pub fn load_progress(dir: &Path) -> Result<Progress> {
    let fail = |reason: String| Error::Checkpoint {
        dir: dir.to_path_buf(),
        reason,
    };

    let text = fs::read_to_string(dir.join(PROGRESS_FILE)).map_err(|e| fail(e.to_string()))?;

    serde_json::from_str(&text).map_err(|e| fail(e.to_string()))
}
