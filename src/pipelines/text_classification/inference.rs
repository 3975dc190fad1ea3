use std::path::Path;

use burn::tensor::backend::Backend;
use serde::Serialize;
use tokenizers::Tokenizer;

use crate::{models::mean_pool, utils::tensors::pad_to, Error, Result};

use super::{
    artifacts::{CONFIG_FILE, MODEL_FILE},
    loader, Batcher, Model,
};

/// The predicted class for one text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Class name
    pub label: String,

    /// Probability assigned to the class
    pub score: f32,
}

/// A fine-tuned model and tokenizer, rebuilt from an artifact directory
pub struct Predictor<B: Backend> {
    model: mean_pool::Model<B>,
    config: mean_pool::Config,
    tokenizer: Tokenizer,
    batcher: Batcher<B>,
}

impl<B: Backend> Predictor<B> {
    /// Load the model configuration, weights and tokenizer written by a training run
    pub fn load(artifact_dir: &Path, device: &B::Device) -> Result<Self> {
        let (config, model) = mean_pool::Config::load_pretrained::<B>(
            artifact_dir.join(CONFIG_FILE),
            artifact_dir.join(MODEL_FILE),
            device,
        )
        .map_err(|e| Error::ModelLoad {
            what: "model",
            name: artifact_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let tokenizer = loader::tokenizer(&artifact_dir.to_string_lossy())?;
        let batcher = Batcher::new(config.vocab_size, device.clone());

        Ok(Self {
            model,
            config,
            tokenizer,
            batcher,
        })
    }

    /// The model configuration
    pub fn config(&self) -> &mean_pool::Config {
        &self.config
    }

    /// Classify each text, in order
    pub fn predict<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<Prediction>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let pad_token = self.config.pad_token_id as u32;
        let seq_length = self.config.max_seq_length;

        let rows = texts
            .iter()
            .map(|text| {
                let encoding = self
                    .tokenizer
                    .encode(text.as_ref(), true)
                    .map_err(|e| Error::Inference(e.to_string()))?;

                Ok(pad_to(pad_token, encoding.get_ids(), seq_length))
            })
            .collect::<Result<Vec<_>>>()?;

        let input = self
            .batcher
            .infer(rows.iter().map(|(ids, mask)| (ids.as_slice(), mask.as_slice())))
            .map_err(|e| Error::Inference(e.to_string()))?;

        let n_classes = self.config.id2label.len();
        let probabilities = self
            .model
            .infer(input)
            .into_data()
            .convert::<f32>()
            .value;

        Ok(probabilities
            .chunks(n_classes)
            .map(|row| {
                let (class, score) = row
                    .iter()
                    .copied()
                    .enumerate()
                    .fold((0, f32::MIN), |best, (i, p)| if p > best.1 { (i, p) } else { best });

                Prediction {
                    label: self
                        .config
                        .id2label
                        .get(&class)
                        .cloned()
                        .unwrap_or_else(|| class.to_string()),
                    score,
                }
            })
            .collect())
    }
}
