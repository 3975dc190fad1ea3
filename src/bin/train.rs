//! Command line tool to fine-tune a sentiment classifier

use std::path::PathBuf;

use anyhow::anyhow;
use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
use burn_sentiment::{
    cli,
    config::Params,
    datasets::SentimentDataset,
    pipelines::text_classification::{self, Status, StopSignal},
    Error,
};
use log::LevelFilter;
use pico_args::Arguments;

const HELP: &str = "\
Usage: train [OPTIONS]

Parameters are layered: defaults < --config file < SM_* environment variables < flags.

Options:
  -h, --help                Print help
  -c, --config FILE         YAML file of run parameters
  --tokenizer-name PATH     tokenizer.json, or a directory containing one (required)
  --model-name NAME         Preset ('mean-pool-small', 'mean-pool-base') or model directory
  --train-dir PATH          Training records (defaults to 'data/train')
  --eval-dir PATH           Evaluation records (defaults to 'data/test')
  --output-dir PATH         Where the fine-tuned model is written (defaults to 'model')
  --output-data-dir PATH    Where metrics.csv and eval_results.txt are written
  --epochs N                Number of epochs (defaults to 3)
  --train-batch-size N      Training batch size (defaults to 32)
  --eval-batch-size N       Evaluation batch size (defaults to 64)
  --learning-rate LR        Peak learning rate (defaults to 5e-5)
  --warmup-steps N          Linear warmup steps (defaults to 500)
  --weight-decay W          AdamW weight decay (defaults to 0.01)
  --adam-epsilon E          AdamW epsilon (defaults to 1e-8)
  --seed N                  Seed for initialization and shuffling (defaults to 42)
  --shuffle                 Shuffle the training set every epoch
  --resume-from PATH        Checkpoint directory of an interrupted run
";

#[derive(Debug)]
struct Args {
    config: Option<PathBuf>,
    flags: Params,
}

impl Args {
    fn parse() -> anyhow::Result<Option<Self>> {
        let mut pargs = Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let args = Args {
            config: pargs.opt_value_from_str(["-c", "--config"])?,
            flags: cli::from_args(&mut pargs)?,
        };

        let remaining = pargs.finish();
        if !remaining.is_empty() {
            return Err(anyhow!("Unexpected arguments: {:?}", remaining));
        }

        Ok(Some(args))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::formatted_builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let Some(args) = Args::parse()? else {
        print!("{}", HELP);

        return Ok(());
    };

    let file = match &args.config {
        Some(path) => cli::from_file(path).await?,
        None => Params::new(),
    };

    let params = cli::merge([file, cli::from_env(std::env::vars()), args.flags]);

    let stop = StopSignal::new();
    let signal = stop.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, stopping after the current batch");
            signal.stop();
        }
    });

    let result = text_classification::run::<Autodiff<NdArray>, SentimentDataset>(
        &params,
        NdArrayDevice::Cpu,
        stop,
    )
    .await;

    let summary = match result {
        Ok(summary) => summary,
        Err(Error::ArtifactWrite {
            dir,
            reason,
            metrics,
        }) => {
            for record in &metrics {
                println!("{}", serde_json::to_string(record)?);
            }

            return Err(anyhow!(
                "Training completed but {} could not be written: {}",
                dir.display(),
                reason
            ));
        }
        Err(e) => return Err(e.into()),
    };

    for record in &summary.metrics {
        println!("{}", serde_json::to_string(record)?);
    }

    match summary.status {
        Status::Completed { artifact_dir } => {
            if let Some(best) = summary.best_epoch {
                log::info!("Best epoch by F1: {}", best + 1);
            }

            log::info!("Model saved to {}", artifact_dir.display());
        }
        Status::Interrupted {
            checkpoint_dir,
            epoch,
            batch,
        } => {
            log::warn!(
                "Stopped at epoch {}, batch {}. Resume with --resume-from {}",
                epoch + 1,
                batch,
                checkpoint_dir.display()
            );
        }
    }

    Ok(())
}
