//! Command line tool for inference

use std::path::PathBuf;

use anyhow::anyhow;
use burn::backend::{ndarray::NdArrayDevice, NdArray};
use burn_sentiment::pipelines::text_classification::Predictor;
use log::LevelFilter;
use pico_args::Arguments;

const HELP: &str = "\
Usage: infer ARTIFACT_DIR TEXT...

Arguments:
  ARTIFACT_DIR         Directory written by a training run
  TEXT                 One or more texts to classify

Options:
  -h, --help           Print help
";

#[derive(Debug)]
struct Args {
    artifact_dir: PathBuf,
    texts: Vec<String>,
}

impl Args {
    fn parse() -> anyhow::Result<Option<Self>> {
        let mut pargs = Arguments::from_env();

        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let artifact_dir = pargs.free_from_str().map_err(|e| match e {
            pico_args::Error::MissingArgument => anyhow!("Missing required argument: ARTIFACT_DIR"),
            _ => anyhow!("{}", e),
        })?;

        let texts = pargs
            .finish()
            .into_iter()
            .map(|text| {
                text.into_string()
                    .map_err(|text| anyhow!("Text is not valid UTF-8: {:?}", text))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        if texts.is_empty() {
            return Err(anyhow!("Missing required argument: TEXT"));
        }

        Ok(Some(Args {
            artifact_dir,
            texts,
        }))
    }
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::formatted_builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let Some(args) = Args::parse()? else {
        print!("{}", HELP);

        return Ok(());
    };

    let predictor = Predictor::<NdArray>::load(&args.artifact_dir, &NdArrayDevice::Cpu)?;
    let predictions = predictor.predict(args.texts.as_slice())?;

    for (text, prediction) in args.texts.iter().zip(predictions) {
        println!(
            "\n- Text: {text}\
             \n- Class: {}\
             \n- Score: {:.4}",
            prediction.label, prediction.score
        );
    }

    Ok(())
}
