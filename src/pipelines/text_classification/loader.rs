use std::path::{Path, PathBuf};

use burn::tensor::backend::Backend;
use tokenizers::Tokenizer;

use crate::{
    models::{available, mean_pool},
    Error, Result,
};

use super::artifacts::{is_model_dir, CONFIG_FILE, MODEL_FILE, TOKENIZER_FILE};

/// Load a tokenizer from a `tokenizer.json` file, or a directory that contains one
pub fn tokenizer(name: &str) -> Result<Tokenizer> {
    let fail = |reason: String| Error::ModelLoad {
        what: "tokenizer",
        name: name.to_string(),
        reason,
    };

    let path = Path::new(name);
    let file = if path.is_dir() {
        path.join(TOKENIZER_FILE)
    } else {
        path.to_path_buf()
    };

    if !file.is_file() {
        return Err(fail(format!("{} does not exist", file.display())));
    }

    let tokenizer = Tokenizer::from_file(&file).map_err(|e| fail(e.to_string()))?;

    log::info!(
        "Loaded tokenizer from {} ({} tokens)",
        file.display(),
        tokenizer.get_vocab_size(true)
    );

    Ok(tokenizer)
}

/// Obtain the model named by `name`: a directory holding a configuration and weights, or one
/// of the built-in presets initialized from `seed`
pub fn model<B: Backend>(
    name: &str,
    tokenizer: &Tokenizer,
    seed: u64,
    device: &B::Device,
) -> Result<(mean_pool::Config, mean_pool::Model<B>)> {
    let fail = |reason: String| Error::ModelLoad {
        what: "model",
        name: name.to_string(),
        reason,
    };

    let dir = PathBuf::from(name);

    let (config, model) = if is_model_dir(&dir) {
        log::info!("Loading pre-trained model from {}", dir.display());

        mean_pool::Config::load_pretrained::<B>(dir.join(CONFIG_FILE), dir.join(MODEL_FILE), device)
            .map_err(|e| fail(e.to_string()))?
    } else if let Some(preset) = available::preset(name) {
        log::info!("Initializing {} with seed {}", name, seed);

        B::seed(seed);

        let config = mean_pool::Config::from_preset(name, preset, tokenizer);
        let model = config.init::<B>(device);

        (config, model)
    } else {
        return Err(fail(format!(
            "not a model directory or one of {}",
            available::ALL_MODELS.join(", ")
        )));
    };

    let vocab_size = tokenizer.get_vocab_size(true);
    if vocab_size > config.vocab_size {
        return Err(fail(format!(
            "the tokenizer has {} tokens but the model embeds {}",
            vocab_size, config.vocab_size
        )));
    }

    Ok((config, model))
}
