mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use burn::{
    data::dataset::Dataset,
    module::Module,
    tensor::{backend::Backend, Tensor},
    train::ClassificationOutput,
};
use burn_sentiment::{
    config,
    datasets::{Example, SentimentDataset},
    models::mean_pool,
    pipelines::text_classification::{
        artifacts,
        batcher::{Infer, Train},
        checkpoint, fine_tune, loader, run,
        state::State,
        Model, Status, StopSignal, Trainer,
    },
    utils::classes::id2label,
    Error,
};
use pretty_assertions::assert_eq;
use tokenizers::Tokenizer;

use common::{
    eval_examples, example, path, train_examples, workspace, TestBackend, DEVICE, SEQ_LENGTH,
    TOKENIZER,
};

/// A classifier whose loss turns to NaN on any batch containing `sentinel`
#[derive(Module, Debug)]
struct Poisoned<B: Backend> {
    inner: mean_pool::Model<B>,
    sentinel: usize,
}

impl<B: Backend> Model<B> for Poisoned<B> {
    fn forward(&self, item: Train<B>) -> ClassificationOutput<B> {
        let poisoned = item
            .input
            .tokens
            .clone()
            .into_data()
            .convert::<i64>()
            .value
            .contains(&(self.sentinel as i64));

        let mut output = self.inner.forward(item);

        if poisoned {
            output.loss = output.loss.mul_scalar(f32::NAN);
        }

        output
    }

    fn infer(&self, input: Infer<B>) -> Tensor<B, 2> {
        self.inner.infer(input)
    }

    fn vocab_size(&self) -> usize {
        self.inner.vocab_size()
    }
}

fn setup(root: &std::path::Path, epochs: usize) -> (Trainer<TestBackend>, mean_pool::Config) {
    let params = common::params(&[
        ("tokenizer_name", "unused".into()),
        ("output_dir", path(&root.join("model"))),
        ("epochs", epochs.into()),
        ("train_batch_size", 2.into()),
        ("eval_batch_size", 2.into()),
        ("warmup_steps", 0.into()),
    ]);

    let run = config::resolve(&params).unwrap();

    (
        Trainer::new(run, DEVICE),
        mean_pool::Config::new(10, 8, 4, id2label()),
    )
}

#[test]
fn test_non_finite_loss_stops_the_run() {
    let root = tempfile::tempdir().unwrap();
    let (mut trainer, model_config) = setup(root.path(), 2);
    let tokenizer: Tokenizer = TOKENIZER.parse().unwrap();

    let train = SentimentDataset::from_examples(vec![
        example(&[2, 8], 1),
        example(&[6, 9], 0),
        example(&[3, 8, 9], 1),
        example(&[7, 8], 0),
    ]);
    let eval = SentimentDataset::from_examples(eval_examples());

    // token 7 only appears in the second batch
    let model = Poisoned {
        inner: model_config.init::<TestBackend>(&DEVICE),
        sentinel: 7,
    };

    let result = fine_tune(
        &mut trainer,
        model,
        &model_config,
        &tokenizer,
        &train,
        &eval,
        None,
    );

    match result {
        Err(Error::TrainingDiverged { epoch, batch, loss }) => {
            assert_eq!((epoch, batch), (0, 1));
            assert!(loss.is_nan());
        }
        other => panic!("unexpected result: {:?}", other.map(|summary| summary.status)),
    }

    assert!(!root.path().join("model").exists());
}

#[test]
fn test_state_history() {
    let root = tempfile::tempdir().unwrap();
    let (mut trainer, model_config) = setup(root.path(), 2);
    let tokenizer: Tokenizer = TOKENIZER.parse().unwrap();

    let train = SentimentDataset::from_examples(train_examples());
    let eval = SentimentDataset::from_examples(eval_examples());

    let summary = fine_tune(
        &mut trainer,
        model_config.init::<TestBackend>(&DEVICE),
        &model_config,
        &tokenizer,
        &train,
        &eval,
        None,
    )
    .unwrap();

    assert!(matches!(summary.status, Status::Completed { .. }));
    assert_eq!(
        trainer.history(),
        &[
            State::Idle,
            State::Loading,
            State::TrainingEpoch(0),
            State::Evaluating(0),
            State::TrainingEpoch(1),
            State::Evaluating(1),
            State::Done,
        ]
    );
}

/// Raises `stop` once `after` items have been fetched
struct StoppingDataset {
    inner: SentimentDataset,
    stop: StopSignal,
    after: usize,
    fetched: AtomicUsize,
}

impl StoppingDataset {
    fn new(examples: Vec<Example>, stop: &StopSignal, after: usize) -> Self {
        StoppingDataset {
            inner: SentimentDataset::from_examples(examples),
            stop: stop.clone(),
            after,
            fetched: AtomicUsize::new(0),
        }
    }
}

impl Dataset<Example> for StoppingDataset {
    fn get(&self, index: usize) -> Option<Example> {
        if self.fetched.fetch_add(1, Ordering::SeqCst) + 1 >= self.after {
            self.stop.stop();
        }

        self.inner.get(index)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

#[tokio::test]
async fn test_interrupt_mid_epoch_then_resume() {
    let root = tempfile::tempdir().unwrap();
    let mut params = workspace(root.path(), &train_examples(), &eval_examples());
    params.insert("epochs".into(), 1.into());

    let run_config = config::resolve(&params).unwrap();
    let stop = StopSignal::new();
    let mut trainer = Trainer::<TestBackend>::new(run_config.clone(), DEVICE)
        .with_stop_signal(stop.clone());

    let tokenizer = loader::tokenizer(&run_config.tokenizer_name).unwrap();
    let (mut model_config, model) =
        loader::model::<TestBackend>(&run_config.model_name, &tokenizer, 42, &DEVICE).unwrap();
    model_config.max_seq_length = SEQ_LENGTH;

    // the signal goes up while the first batch of two is being fetched
    let train = StoppingDataset::new(train_examples(), &stop, 2);
    let eval = StoppingDataset::new(eval_examples(), &stop, usize::MAX);

    let summary = fine_tune(
        &mut trainer,
        model,
        &model_config,
        &tokenizer,
        &train,
        &eval,
        None,
    )
    .unwrap();

    let checkpoint_dir = checkpoint::dir_for(&run_config.output_dir);
    assert_eq!(
        summary.status,
        Status::Interrupted {
            checkpoint_dir: checkpoint_dir.clone(),
            epoch: 0,
            batch: 1,
        }
    );
    assert!(summary.metrics.is_empty());

    let progress = checkpoint::load_progress(&checkpoint_dir).unwrap();
    assert_eq!((progress.next_batch, progress.schedule_step), (1, 1));
    assert!(!root.path().join("model").exists());

    params.insert("resume_from".into(), path(&checkpoint_dir));

    let summary = run::<TestBackend, SentimentDataset>(&params, DEVICE, StopSignal::new())
        .await
        .unwrap();

    assert_eq!(summary.metrics.len(), 1);
    assert!(matches!(summary.status, Status::Completed { .. }));
    assert!(artifacts::is_model_dir(&root.path().join("model")));
}
