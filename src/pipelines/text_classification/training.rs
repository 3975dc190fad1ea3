use std::{path::Path, time::Instant};

use burn::{
    data::dataset::Dataset,
    lr_scheduler::LrScheduler,
    module::AutodiffModule,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::{config::RunConfig, datasets::Example, Error, Result};

use super::{
    batcher::Batcher,
    checkpoint::Progress,
    metrics::{self, EvalMetrics, MetricsLog},
    schedule::LinearWarmup,
    state::{State, StateMachine, StopSignal},
    Model,
};

/// How a call to [`Trainer::fit`] ended
pub enum Outcome<M> {
    /// Every epoch was trained and evaluated
    Completed {
        /// The fine-tuned model
        model: M,
        /// One record per epoch, in epoch order
        metrics: Vec<EvalMetrics>,
    },

    /// The stop signal was raised between two batches
    Interrupted {
        /// The model as of the last completed batch
        model: M,
        /// Where to resume from
        progress: Progress,
    },
}

/// Drives training and evaluation through the states of a [`StateMachine`]
pub struct Trainer<B: AutodiffBackend> {
    config: RunConfig,
    device: B::Device,
    stop: StopSignal,
    machine: StateMachine,
    metrics_log: Option<MetricsLog>,
}

impl<B: AutodiffBackend> Trainer<B> {
    /// A trainer in the `Idle` state
    pub fn new(config: RunConfig, device: B::Device) -> Self {
        let machine = StateMachine::new(config.epochs);
        let metrics_log = config
            .output_data_dir
            .as_deref()
            .map(|dir| MetricsLog::new(Path::new(dir)));

        Self {
            config,
            device,
            stop: StopSignal::new(),
            machine,
            metrics_log,
        }
    }

    /// Poll `stop` between batches
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// The run configuration
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// The current state
    pub fn state(&self) -> State {
        self.machine.state()
    }

    /// Every state visited so far
    pub fn history(&self) -> &[State] {
        self.machine.history()
    }

    /// Enter `Loading`, before the model and datasets are obtained
    pub fn start(&mut self) -> Result<()> {
        log::info!(
            "Starting run: {} epochs, batch size {}",
            self.config.epochs,
            self.config.train_batch_size
        );

        self.machine.transition(State::Loading)
    }

    /// Train `model` for the configured number of epochs, evaluating after each one.
    ///
    /// The model is owned by the trainer until this returns. When `resume` is given, training
    /// starts at its epoch and skips the batches that were already applied.
    pub fn fit<M, D>(
        &mut self,
        mut model: M,
        train: &D,
        eval: &D,
        resume: Option<Progress>,
    ) -> Result<Outcome<M>>
    where
        M: Model<B> + AutodiffModule<B>,
        M::InnerModule: Model<B::InnerBackend>,
        D: Dataset<Example>,
    {
        if self.machine.state() == State::Idle {
            self.start()?;
        }

        let epochs = self.config.epochs;
        let batch_size = self.config.train_batch_size;
        let steps_per_epoch = train.len().div_ceil(batch_size);

        let batcher_train = Batcher::<B>::new(model.vocab_size(), self.device.clone());
        let batcher_eval =
            Batcher::<B::InnerBackend>::new(model.vocab_size(), self.device.clone());

        let Progress {
            epoch: start_epoch,
            next_batch: skip_batches,
            metrics: mut history,
            schedule_step,
        } = resume.unwrap_or_default();

        let mut schedule = LrScheduler::<B>::load_record(
            LinearWarmup::new(
                self.config.learning_rate,
                self.config.warmup_steps,
                steps_per_epoch * epochs,
            ),
            schedule_step,
        );

        let mut optim = AdamWConfig::new()
            .with_epsilon(self.config.adam_epsilon)
            .with_weight_decay(self.config.weight_decay)
            .init::<B, M>();

        let eval_items: Vec<Example> = eval.iter().collect();

        for epoch in start_epoch..epochs {
            self.machine.transition(State::TrainingEpoch(epoch))?;

            let order = self.order(train.len(), epoch);
            let skip = if epoch == start_epoch { skip_batches } else { 0 };

            let mut loss_sum = 0.0;
            let mut steps = 0usize;

            for (batch, chunk) in order.chunks(batch_size).enumerate().skip(skip) {
                if self.stop.is_stopped() {
                    self.machine.transition(State::Interrupted(epoch))?;
                    log::warn!("Interrupted before epoch {}, batch {}", epoch, batch);

                    return Ok(Outcome::Interrupted {
                        model,
                        progress: Progress::new(
                            epoch,
                            batch,
                            history,
                            LrScheduler::<B>::to_record(&schedule),
                        ),
                    });
                }

                let items: Vec<Example> = chunk.iter().filter_map(|&i| train.get(i)).collect();

                let item = batcher_train
                    .train(&items)
                    .map_err(|source| Error::BatchShape {
                        epoch,
                        batch,
                        source,
                    })?;

                let output = model.forward(item);
                let loss = output.loss.clone().into_scalar().elem::<f64>();

                if !loss.is_finite() {
                    log::error!("Non-finite loss in epoch {}, batch {}", epoch, batch);

                    return Err(Error::TrainingDiverged { epoch, batch, loss });
                }

                let lr = LrScheduler::<B>::step(&mut schedule);
                let grads = GradientsParams::from_grads(output.loss.backward(), &model);
                model = optim.step(lr, model, grads);

                loss_sum += loss;
                steps += 1;

                log::trace!("epoch {} batch {}: loss {:.4}, lr {:e}", epoch, batch, loss, lr);
            }

            let train_loss = if steps > 0 { loss_sum / steps as f64 } else { 0.0 };

            self.machine.transition(State::Evaluating(epoch))?;

            let record =
                self.evaluate(&model.valid(), &batcher_eval, &eval_items, epoch, train_loss)?;

            log::info!(
                "Epoch {}/{} | train_loss={:.4} | eval_loss={:.4} | accuracy={:.4} | precision={:.4} | recall={:.4} | f1={:.4} | {:.1} samples/s",
                epoch + 1,
                epochs,
                record.train_loss,
                record.loss,
                record.accuracy,
                record.precision,
                record.recall,
                record.f1,
                record.samples_per_second,
            );

            if let Some(metrics_log) = &self.metrics_log {
                metrics_log.append(&record)?;
            }

            history.push(record);
        }

        self.machine.transition(State::Done)?;

        Ok(Outcome::Completed {
            model,
            metrics: history,
        })
    }

    /// Full forward pass over the evaluation set without parameter updates
    fn evaluate<M: Model<B::InnerBackend>>(
        &self,
        model: &M,
        batcher: &Batcher<B::InnerBackend>,
        items: &[Example],
        epoch: usize,
        train_loss: f64,
    ) -> Result<EvalMetrics> {
        let started = Instant::now();

        // weighted by batch length
        let mut loss_sum = 0.0;
        let mut predicted = Vec::with_capacity(items.len());
        let mut truth = Vec::with_capacity(items.len());

        for (batch, chunk) in items.chunks(self.config.eval_batch_size).enumerate() {
            let item = batcher.train(chunk).map_err(|source| Error::BatchShape {
                epoch,
                batch,
                source,
            })?;

            let output = model.forward(item);

            loss_sum += output.loss.into_scalar().elem::<f64>() * chunk.len() as f64;

            predicted.extend(
                output
                    .output
                    .argmax(1)
                    .into_data()
                    .convert::<i64>()
                    .value
                    .into_iter()
                    .map(|class| class as u8),
            );
            truth.extend(chunk.iter().map(|example| example.label));
        }

        let scores = metrics::compute(&predicted, &truth)?;
        let runtime_secs = started.elapsed().as_secs_f64().max(f64::EPSILON);

        Ok(EvalMetrics {
            epoch,
            train_loss,
            loss: if items.is_empty() {
                0.0
            } else {
                loss_sum / items.len() as f64
            },
            accuracy: scores.accuracy,
            precision: scores.precision,
            recall: scores.recall,
            f1: scores.f1,
            runtime_secs,
            samples_per_second: items.len() as f64 / runtime_secs,
        })
    }

    /// Example indices for an epoch: on-disk order, or a shuffle seeded by `seed + epoch`
    fn order(&self, len: usize, epoch: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..len).collect();

        if self.config.shuffle {
            let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(epoch as u64));
            order.shuffle(&mut rng);
        }

        order
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        config::{self, Params},
        models::mean_pool,
        utils::classes::id2label,
    };

    type TestBackend = Autodiff<NdArray>;

    fn trainer(eval_batch_size: usize) -> Trainer<TestBackend> {
        let params: Params = [
            ("tokenizer_name".to_string(), "tokenizer.json".into()),
            ("eval_batch_size".to_string(), eval_batch_size.into()),
        ]
        .into_iter()
        .collect();

        Trainer::new(config::resolve(&params).unwrap(), NdArrayDevice::Cpu)
    }

    fn model_and_batcher() -> (mean_pool::Model<NdArray>, Batcher<NdArray>) {
        let model = mean_pool::Config::new(10, 8, 4, id2label()).init::<NdArray>(&NdArrayDevice::Cpu);

        (model, Batcher::new(10, NdArrayDevice::Cpu))
    }

    #[test]
    fn test_eval_loss_is_a_per_example_mean() {
        let (model, batcher) = model_and_batcher();

        let items = vec![
            Example::new(vec![2, 8, 0], vec![1, 1, 0], 1),
            Example::new(vec![6, 9, 5], vec![1, 1, 1], 0),
            Example::new(vec![7, 0, 0], vec![1, 0, 0], 0),
        ];

        // one full batch and a trailing batch of one, against a single batch
        let chunked = trainer(2)
            .evaluate(&model, &batcher, &items, 0, 0.0)
            .unwrap();
        let whole = trainer(3)
            .evaluate(&model, &batcher, &items, 0, 0.0)
            .unwrap();

        assert!((chunked.loss - whole.loss).abs() < 1e-5);
        assert_eq!(chunked.accuracy, whole.accuracy);
    }

    #[test]
    fn test_empty_eval_set() {
        let (model, batcher) = model_and_batcher();

        let record = trainer(2).evaluate(&model, &batcher, &[], 0, 0.0).unwrap();

        assert_eq!(record.loss, 0.0);
        assert_eq!(record.samples_per_second, 0.0);
        assert!(record.runtime_secs > 0.0);
    }
}
