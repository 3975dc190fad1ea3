use std::{fs, path::Path};

use anyhow::anyhow;
use burn::{
    config::Config as _,
    module::Module,
    record::{CompactRecorder, Recorder},
    tensor::backend::Backend,
};
use serde::Serialize;
use tokenizers::Tokenizer;

use crate::{
    config::RunConfig, models::mean_pool, utils::renderer::render, Error, Result,
};

use super::metrics::EvalMetrics;

/// Model configuration file
pub static CONFIG_FILE: &str = "config.json";

/// Model record file, without the extension the recorder appends
pub static MODEL_FILE: &str = "model";

/// Extension appended by the `CompactRecorder`
pub static RECORD_EXTENSION: &str = "mpk";

/// Tokenizer file
pub static TOKENIZER_FILE: &str = "tokenizer.json";

/// Run configuration file
pub static TRAINING_CONFIG_FILE: &str = "training_config.json";

/// Model card file
pub static MODEL_CARD_FILE: &str = "README.md";

/// Final evaluation report, written to the output data directory
pub static EVAL_RESULTS_FILE: &str = "eval_results.txt";

static MODEL_CARD: &str = r#"---
tags:
- text-classification
- sentiment-analysis
---

# {{ name }}

Fine-tuned from `{{ base_model }}` for binary sentiment classification
({{ labels | join: ", " }}).

## Training

| parameter | value |
|---|---|
| epochs | {{ epochs }} |
| train_batch_size | {{ train_batch_size }} |
| eval_batch_size | {{ eval_batch_size }} |
| learning_rate | {{ learning_rate }} |
| warmup_steps | {{ warmup_steps }} |
| seed | {{ seed }} |

## Evaluation

| epoch | loss | accuracy | precision | recall | f1 |
|---|---|---|---|---|---|
{% for m in metrics %}| {{ m.epoch }} | {{ m.loss | round: 4 }} | {{ m.accuracy | round: 4 }} | {{ m.precision | round: 4 }} | {{ m.recall | round: 4 }} | {{ m.f1 | round: 4 }} |
{% endfor %}"#;

#[derive(Serialize)]
struct ModelCard<'a> {
    name: String,
    base_model: &'a str,
    labels: Vec<&'a str>,
    epochs: usize,
    train_batch_size: usize,
    eval_batch_size: usize,
    learning_rate: f64,
    warmup_steps: usize,
    // liquid integers are i64
    seed: String,
    metrics: &'a [EvalMetrics],
}

/// Whether `dir` holds a model configuration and record written by this pipeline
pub fn is_model_dir(dir: &Path) -> bool {
    dir.join(CONFIG_FILE).is_file()
        && dir
            .join(format!("{}.{}", MODEL_FILE, RECORD_EXTENSION))
            .is_file()
}

/// Replace `dir` with the fine-tuned model, its configuration, the tokenizer, the run
/// configuration and a model card. Existing contents are removed, not merged.
///
/// On failure the run's metrics travel with the error.
pub fn write<B: Backend, M: Module<B>>(
    dir: &Path,
    model: M,
    model_config: &mean_pool::Config,
    tokenizer: &Tokenizer,
    run: &RunConfig,
    metrics: &[EvalMetrics],
) -> Result<()> {
    write_all::<B, M>(dir, model, model_config, tokenizer, run, metrics).map_err(|e| {
        log::error!("Unable to write artifacts to {}: {}", dir.display(), e);

        Error::ArtifactWrite {
            dir: dir.to_path_buf(),
            reason: e.to_string(),
            metrics: metrics.to_vec(),
        }
    })?;

    log::info!("Model written to {}", dir.display());

    Ok(())
}

fn write_all<B: Backend, M: Module<B>>(
    dir: &Path,
    model: M,
    model_config: &mean_pool::Config,
    tokenizer: &Tokenizer,
    run: &RunConfig,
    metrics: &[EvalMetrics],
) -> anyhow::Result<()> {
    if dir.is_dir() {
        fs::remove_dir_all(dir)?;
    } else if dir.exists() {
        fs::remove_file(dir)?;
    }

    fs::create_dir_all(dir)?;

    model_config.save(dir.join(CONFIG_FILE))?;

    Recorder::<B>::record(&CompactRecorder::new(), model.into_record(), dir.join(MODEL_FILE))
        .map_err(|e| anyhow!("Unable to record model weights: {}", e))?;

    tokenizer
        .save(dir.join(TOKENIZER_FILE), false)
        .map_err(|e| anyhow!("Unable to save tokenizer: {}", e))?;

    fs::write(
        dir.join(TRAINING_CONFIG_FILE),
        serde_json::to_string_pretty(run)?,
    )?;

    let card = ModelCard {
        name: dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| run.model_name.clone()),
        base_model: &run.model_name,
        labels: model_config.id2label.values().map(String::as_str).collect(),
        epochs: run.epochs,
        train_batch_size: run.train_batch_size,
        eval_batch_size: run.eval_batch_size,
        learning_rate: run.learning_rate,
        warmup_steps: run.warmup_steps,
        seed: run.seed.to_string(),
        metrics,
    };

    fs::write(dir.join(MODEL_CARD_FILE), render(MODEL_CARD, &card)?)?;

    Ok(())
}

/// Write the final evaluation record as `key = value` lines
pub fn write_eval_results(dir: &Path, metrics: &EvalMetrics) -> Result<()> {
    let path = dir.join(EVAL_RESULTS_FILE);

    let lines = [
        ("epoch", (metrics.epoch + 1) as f64),
        ("eval_loss", metrics.loss),
        ("eval_accuracy", metrics.accuracy),
        ("eval_precision", metrics.precision),
        ("eval_recall", metrics.recall),
        ("eval_f1", metrics.f1),
        ("eval_runtime", metrics.runtime_secs),
        ("eval_samples_per_second", metrics.samples_per_second),
    ]
    .iter()
    .map(|(key, value)| format!("{} = {}\n", key, value))
    .collect::<String>();

    fs::create_dir_all(dir)
        .and_then(|_| fs::write(&path, lines))
        .map_err(|e| Error::ArtifactWrite {
            dir: dir.to_path_buf(),
            reason: e.to_string(),
            metrics: vec![*metrics],
        })
}

#[cfg(test)]
mod tests {
    use burn::{
        backend::{ndarray::NdArrayDevice, NdArray},
        record::FileRecorder,
    };

    use super::*;
    use crate::{config, utils::classes::id2label};

    #[test]
    fn test_record_extension_matches_recorder() {
        assert_eq!(
            <CompactRecorder as FileRecorder<NdArray>>::file_extension(),
            RECORD_EXTENSION
        );
    }

    fn run_config() -> RunConfig {
        let params: config::Params = [("tokenizer_name".to_string(), "tokenizer.json".into())]
            .into_iter()
            .collect();

        config::resolve(&params).unwrap()
    }

    #[test]
    fn test_card_takes_any_seed() {
        let dir = tempfile::tempdir().unwrap();
        let config = mean_pool::Config::new(4, 4, 2, id2label());
        let run = RunConfig {
            seed: u64::MAX,
            ..run_config()
        };

        write::<NdArray, _>(
            dir.path(),
            config.init::<NdArray>(&NdArrayDevice::Cpu),
            &config,
            &tokenizer(),
            &run,
            &[metrics()],
        )
        .unwrap();

        let card = fs::read_to_string(dir.path().join(MODEL_CARD_FILE)).unwrap();
        assert!(card.contains("| seed | 18446744073709551615 |"));
    }

    fn tokenizer() -> Tokenizer {
        r#"{
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": { "[PAD]": 0, "[UNK]": 1, "good": 2, "bad": 3 },
                "unk_token": "[UNK]"
            }
        }"#
        .parse()
        .unwrap()
    }

    fn metrics() -> EvalMetrics {
        EvalMetrics {
            epoch: 0,
            train_loss: 0.7,
            loss: 0.65,
            accuracy: 0.5,
            precision: 0.5,
            recall: 1.0,
            f1: 2.0 / 3.0,
            runtime_secs: 0.01,
            samples_per_second: 200.0,
        }
    }

    #[test]
    fn test_write_replaces_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("model");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("stale.txt"), "old").unwrap();

        let config = mean_pool::Config::new(4, 4, 2, id2label());
        let model = config.init::<NdArray>(&NdArrayDevice::Cpu);

        write::<NdArray, _>(&dir, model, &config, &tokenizer(), &run_config(), &[metrics()])
            .unwrap();

        assert!(!dir.join("stale.txt").exists());
        assert!(is_model_dir(&dir));
        assert!(dir.join(TOKENIZER_FILE).is_file());
        assert!(dir.join(TRAINING_CONFIG_FILE).is_file());

        let card = fs::read_to_string(dir.join(MODEL_CARD_FILE)).unwrap();
        assert!(card.contains("negative, positive"));
        assert!(card.contains("0.6667"));
    }

    #[test]
    fn test_unwritable_directory_keeps_metrics() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();

        let config = mean_pool::Config::new(4, 4, 2, id2label());
        let model = config.init::<NdArray>(&NdArrayDevice::Cpu);

        let err = write::<NdArray, _>(
            &blocker.join("model"),
            model,
            &config,
            &tokenizer(),
            &run_config(),
            &[metrics()],
        )
        .unwrap_err();

        match err {
            Error::ArtifactWrite { metrics: kept, .. } => assert_eq!(kept, vec![metrics()]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_eval_results() {
        let dir = tempfile::tempdir().unwrap();

        write_eval_results(dir.path(), &metrics()).unwrap();

        let text = fs::read_to_string(dir.path().join(EVAL_RESULTS_FILE)).unwrap();
        assert!(text.starts_with("epoch = 1\n"));
        assert!(text.contains("eval_accuracy = 0.5\n"));
    }
}
