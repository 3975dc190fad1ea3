use std::path::{Path, PathBuf};

use burn::{
    data::dataset::Dataset,
    module::AutodiffModule,
    tensor::backend::AutodiffBackend,
};
use serde::Serialize;
use tokenizers::Tokenizer;

use crate::{
    config::{self, Params},
    datasets::{Example, LoadableDataset},
    models::mean_pool,
    Error, Result,
};

use super::{
    artifacts, checkpoint,
    checkpoint::Progress,
    loader,
    metrics::{best_epoch, EvalMetrics},
    state::StopSignal,
    training::{Outcome, Trainer},
    Model,
};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Status {
    /// Every epoch ran and the model was written
    Completed {
        /// Where the fine-tuned model was written
        artifact_dir: PathBuf,
    },

    /// The stop signal was raised and a checkpoint was written
    Interrupted {
        /// Where the checkpoint was written
        checkpoint_dir: PathBuf,
        /// The interrupted epoch
        epoch: usize,
        /// The first batch of that epoch which was not applied
        batch: usize,
    },
}

/// The result of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// One record per evaluated epoch, in epoch order
    pub metrics: Vec<EvalMetrics>,

    /// How the run ended
    pub status: Status,

    /// The epoch with the highest F1, if any epoch was evaluated
    pub best_epoch: Option<usize>,
}

/// Resolve `params`, load the datasets, tokenizer and model, fine-tune, and write the result.
///
/// The parameters are validated before anything is read from disk. Training itself runs on
/// the blocking thread pool.
pub async fn run<B, D>(params: &Params, device: B::Device, stop: StopSignal) -> Result<RunSummary>
where
    B: AutodiffBackend,
    D: LoadableDataset<Example> + 'static,
{
    let config = config::resolve(params)?;

    let mut trainer = Trainer::<B>::new(config.clone(), device.clone()).with_stop_signal(stop);
    trainer.start()?;

    let train = D::load(Path::new(&config.train_dir)).await?;
    let eval = D::load(Path::new(&config.eval_dir)).await?;

    log::info!(
        "Loaded {} training and {} evaluation examples",
        train.len(),
        eval.len()
    );

    let tokenizer = loader::tokenizer(&config.tokenizer_name)?;

    let (source, resume) = match &config.resume_from {
        Some(dir) => {
            let progress = checkpoint::load_progress(Path::new(dir))?;

            if progress.epoch >= config.epochs {
                return Err(Error::Checkpoint {
                    dir: PathBuf::from(dir),
                    reason: format!(
                        "checkpoint is at epoch {}, but the run has only {} epochs",
                        progress.epoch, config.epochs
                    ),
                });
            }

            log::info!(
                "Resuming from {} at epoch {}, batch {}",
                dir,
                progress.epoch,
                progress.next_batch
            );

            (dir.as_str(), Some(progress))
        }
        None => (config.model_name.as_str(), None),
    };

    let (mut model_config, model) = loader::model::<B>(source, &tokenizer, config.seed, &device)?;

    if let Some(example) = train.get(0) {
        model_config.max_seq_length = example.input_ids.len();
    }

    let training = tokio::task::spawn_blocking(move || {
        fine_tune(&mut trainer, model, &model_config, &tokenizer, &train, &eval, resume)
    });

    // blocking tasks are never aborted, so a join error is a panic
    match training.await {
        Ok(result) => result,
        Err(e) => std::panic::resume_unwind(e.into_panic()),
    }
}

/// Train `model` with `trainer`, then write the artifact directory, or a checkpoint if the run
/// was interrupted
pub fn fine_tune<B, M, D>(
    trainer: &mut Trainer<B>,
    model: M,
    model_config: &mean_pool::Config,
    tokenizer: &Tokenizer,
    train: &D,
    eval: &D,
    resume: Option<Progress>,
) -> Result<RunSummary>
where
    B: AutodiffBackend,
    M: Model<B> + AutodiffModule<B>,
    M::InnerModule: Model<B::InnerBackend>,
    D: Dataset<Example>,
{
    match trainer.fit(model, train, eval, resume)? {
        Outcome::Completed { model, metrics } => {
            let config = trainer.config();
            let artifact_dir = PathBuf::from(&config.output_dir);

            artifacts::write::<B::InnerBackend, _>(
                &artifact_dir,
                model.valid(),
                model_config,
                tokenizer,
                config,
                &metrics,
            )?;

            if let (Some(dir), Some(last)) = (&config.output_data_dir, metrics.last()) {
                artifacts::write_eval_results(Path::new(dir), last)?;
            }

            Ok(RunSummary {
                best_epoch: best_epoch(&metrics),
                metrics,
                status: Status::Completed { artifact_dir },
            })
        }
        Outcome::Interrupted { model, progress } => {
            let checkpoint_dir = checkpoint::dir_for(&trainer.config().output_dir);

            checkpoint::save::<B::InnerBackend, _>(
                &checkpoint_dir,
                model.valid(),
                model_config,
                &progress,
            )?;

            Ok(RunSummary {
                best_epoch: best_epoch(&progress.metrics),
                status: Status::Interrupted {
                    checkpoint_dir,
                    epoch: progress.epoch,
                    batch: progress.next_batch,
                },
                metrics: progress.metrics,
            })
        }
    }
}
