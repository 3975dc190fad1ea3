use std::{collections::BTreeMap, path::PathBuf};

use anyhow::anyhow;
use burn::{
    config::Config as _,
    module::Module,
    nn::{DropoutConfig, EmbeddingConfig, LinearConfig},
    record::{CompactRecorder, Recorder},
    tensor::backend::Backend,
};
use tokenizers::Tokenizer;

use crate::{models::available::Preset, utils::classes::id2label};

use super::Model;

/// Token names tried, in order, when looking for the tokenizer's padding token
pub static PAD_TOKENS: &[&str; 3] = &["[PAD]", "<pad>", "<PAD>"];

/// The Model Configuration
#[derive(burn::config::Config)]
pub struct Config {
    /// Size of the vocabulary
    pub vocab_size: usize,

    /// Size of the token embedding
    pub hidden_size: usize,

    /// Size of the hidden classification layer
    pub classifier_size: usize,

    /// Dropout value applied before each linear layer
    #[config(default = 0.1)]
    pub hidden_dropout_prob: f64,

    /// Index of the padding token
    #[config(default = 0)]
    pub pad_token_id: usize,

    /// Length inputs are padded or truncated to at inference time
    #[config(default = 128)]
    pub max_seq_length: usize,

    /// A map from class ids to class name labels
    pub id2label: BTreeMap<usize, String>,

    /// The preset or checkpoint this configuration was derived from
    #[config(default = "\"mean-pool\".to_string()")]
    pub model_type: String,
}

impl Config {
    /// A fresh configuration sized for a tokenizer's vocabulary
    pub fn from_preset(name: &str, preset: Preset, tokenizer: &Tokenizer) -> Self {
        let pad_token_id = PAD_TOKENS
            .iter()
            .find_map(|token| tokenizer.token_to_id(token))
            .unwrap_or(0);

        Config::new(
            tokenizer.get_vocab_size(true),
            preset.hidden_size,
            preset.classifier_size,
            id2label(),
        )
        .with_pad_token_id(pad_token_id as usize)
        .with_model_type(name.to_string())
    }

    /// Initializes a model with random weights from the backend's current seed
    pub fn init<B: Backend>(&self, device: &B::Device) -> Model<B> {
        let n_classes = self.id2label.len();

        Model {
            embedding: EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device),
            hidden: LinearConfig::new(self.hidden_size, self.classifier_size).init(device),
            output: LinearConfig::new(self.classifier_size, n_classes).init(device),
            dropout: DropoutConfig::new(self.hidden_dropout_prob).init(),
            n_classes,
            vocab_size: self.vocab_size,
        }
    }

    /// Load a configuration and its trained weights
    pub fn load_pretrained<B: Backend>(
        config_file: PathBuf,
        model_file: PathBuf,
        device: &B::Device,
    ) -> anyhow::Result<(Self, Model<B>)> {
        let config = Config::load(&config_file)
            .map_err(|e| anyhow!("Unable to load model config file: {}", e))?;

        if config.id2label.is_empty() {
            return Err(anyhow!("Classes are not defined in the model configuration"));
        }

        let record = CompactRecorder::new()
            .load(model_file, device)
            .map_err(|e| anyhow!("Unable to load trained model weights: {}", e))?;

        let model = config.init::<B>(device).load_record(record);

        Ok((config, model))
    }
}
