//! Resolve a loosely-typed parameter mapping into a validated [`RunConfig`]

use std::collections::BTreeMap;

use burn::LearningRate;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// A mapping of named run parameters, as read from a config file, the environment, or flags
pub type Params = BTreeMap<String, Value>;

/// Parameter keys understood by the resolver. Anything else is ignored.
pub static RECOGNIZED_KEYS: &[&str] = &[
    "epochs",
    "train_batch_size",
    "eval_batch_size",
    "model_name",
    "tokenizer_name",
    "output_dir",
    "output_data_dir",
    "train_dir",
    "eval_dir",
    "learning_rate",
    "warmup_steps",
    "weight_decay",
    "adam_epsilon",
    "seed",
    "shuffle",
    "resume_from",
];

/// The default model preset
pub static DEFAULT_MODEL: &str = "mean-pool-base";

/// Immutable snapshot of the parameters for one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of epochs
    pub epochs: usize,

    /// Batch size used for training steps
    pub train_batch_size: usize,

    /// Batch size used for evaluation passes
    pub eval_batch_size: usize,

    /// Model preset name or pre-trained model directory
    pub model_name: String,

    /// Tokenizer file, or a directory containing `tokenizer.json`
    pub tokenizer_name: String,

    /// Where the fine-tuned model is written
    pub output_dir: String,

    /// Where the metrics log and evaluation report are written, if anywhere
    pub output_data_dir: Option<String>,

    /// Pre-tokenized training records
    pub train_dir: String,

    /// Pre-tokenized evaluation records
    pub eval_dir: String,

    /// Peak learning rate
    pub learning_rate: LearningRate,

    /// Number of linear warmup steps
    pub warmup_steps: usize,

    /// AdamW weight decay
    pub weight_decay: f32,

    /// AdamW epsilon
    pub adam_epsilon: f32,

    /// Seed for weight initialization and shuffling
    pub seed: u64,

    /// Shuffle the training set at the start of each epoch
    pub shuffle: bool,

    /// Checkpoint directory to resume an interrupted run from
    pub resume_from: Option<String>,
}

/// Config Error
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A required parameter is absent
    #[error("missing required parameter `{0}`")]
    Missing(&'static str),

    /// An identifier or path is empty or whitespace
    #[error("parameter `{0}` must not be blank")]
    Blank(&'static str),

    /// A value has the wrong type
    #[error("parameter `{key}` must be {expected}, got {found}")]
    InvalidType {
        /// The parameter
        key: &'static str,
        /// The expected type
        expected: &'static str,
        /// The value that was supplied
        found: String,
    },

    /// A value has the right type but is outside the accepted range
    #[error("parameter `{key}` must be {rule}, got {value}")]
    OutOfRange {
        /// The parameter
        key: &'static str,
        /// The accepted range
        rule: &'static str,
        /// The value that was supplied
        value: String,
    },

    /// A parameter file could not be read or parsed
    #[error("unable to read parameters from {path}: {reason}")]
    File {
        /// The file
        path: String,
        /// What went wrong
        reason: String,
    },
}

/// Validate a parameter mapping and produce a [`RunConfig`]. Touches nothing but the mapping.
pub fn resolve(params: &Params) -> Result<RunConfig, ConfigError> {
    for key in params.keys() {
        if !RECOGNIZED_KEYS.contains(&key.as_str()) {
            log::debug!("Ignoring unrecognized parameter `{}`", key);
        }
    }

    let config = RunConfig {
        epochs: positive(params, "epochs")?.unwrap_or(3),
        train_batch_size: positive(params, "train_batch_size")?.unwrap_or(32),
        eval_batch_size: positive(params, "eval_batch_size")?.unwrap_or(64),
        model_name: identifier(params, "model_name")?.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        tokenizer_name: identifier(params, "tokenizer_name")?
            .ok_or(ConfigError::Missing("tokenizer_name"))?,
        output_dir: identifier(params, "output_dir")?.unwrap_or_else(|| "model".to_string()),
        output_data_dir: identifier(params, "output_data_dir")?,
        train_dir: identifier(params, "train_dir")?.unwrap_or_else(|| "data/train".to_string()),
        eval_dir: identifier(params, "eval_dir")?.unwrap_or_else(|| "data/test".to_string()),
        learning_rate: float(params, "learning_rate", Bound::Positive)?.unwrap_or(5e-5),
        warmup_steps: non_negative(params, "warmup_steps")?.unwrap_or(500),
        weight_decay: float(params, "weight_decay", Bound::NonNegative)?.unwrap_or(0.01) as f32,
        adam_epsilon: float(params, "adam_epsilon", Bound::Positive)?.unwrap_or(1e-8) as f32,
        seed: unsigned(params, "seed")?.unwrap_or(42),
        shuffle: boolean(params, "shuffle")?.unwrap_or(false),
        resume_from: identifier(params, "resume_from")?,
    };

    Ok(config)
}

#[derive(Clone, Copy)]
enum Bound {
    Positive,
    NonNegative,
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Sequence(_) => "a sequence".to_string(),
        Value::Mapping(_) => "a mapping".to_string(),
        Value::Tagged(_) => "a tagged value".to_string(),
    }
}

fn lookup<'a>(params: &'a Params, key: &str) -> Option<&'a Value> {
    params.get(key).filter(|value| !value.is_null())
}

fn integer(params: &Params, key: &'static str) -> Result<Option<i64>, ConfigError> {
    let Some(value) = lookup(params, key) else {
        return Ok(None);
    };

    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed.map(Some).ok_or_else(|| ConfigError::InvalidType {
        key,
        expected: "an integer",
        found: describe(value),
    })
}

fn positive(params: &Params, key: &'static str) -> Result<Option<usize>, ConfigError> {
    match integer(params, key)? {
        Some(n) if n <= 0 => Err(ConfigError::OutOfRange {
            key,
            rule: "a positive integer",
            value: n.to_string(),
        }),
        n => Ok(n.map(|n| n as usize)),
    }
}

fn non_negative(params: &Params, key: &'static str) -> Result<Option<usize>, ConfigError> {
    match integer(params, key)? {
        Some(n) if n < 0 => Err(ConfigError::OutOfRange {
            key,
            rule: "a non-negative integer",
            value: n.to_string(),
        }),
        n => Ok(n.map(|n| n as usize)),
    }
}

fn unsigned(params: &Params, key: &'static str) -> Result<Option<u64>, ConfigError> {
    let Some(value) = lookup(params, key) else {
        return Ok(None);
    };

    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    match parsed {
        Some(n) => Ok(Some(n)),
        // negative or not an integer
        None => non_negative(params, key).map(|n| n.map(|n| n as u64)),
    }
}

fn float(params: &Params, key: &'static str, bound: Bound) -> Result<Option<f64>, ConfigError> {
    let Some(value) = lookup(params, key) else {
        return Ok(None);
    };

    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| ConfigError::InvalidType {
        key,
        expected: "a number",
        found: describe(value),
    })?;

    let (accepted, rule) = match bound {
        Bound::Positive => (parsed > 0.0, "a finite positive number"),
        Bound::NonNegative => (parsed >= 0.0, "a finite non-negative number"),
    };

    if !parsed.is_finite() || !accepted {
        return Err(ConfigError::OutOfRange {
            key,
            rule,
            value: parsed.to_string(),
        });
    }

    Ok(Some(parsed))
}

fn boolean(params: &Params, key: &'static str) -> Result<Option<bool>, ConfigError> {
    let Some(value) = lookup(params, key) else {
        return Ok(None);
    };

    let parsed = match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().parse::<bool>().ok(),
        _ => None,
    };

    parsed.map(Some).ok_or_else(|| ConfigError::InvalidType {
        key,
        expected: "a boolean",
        found: describe(value),
    })
}

fn identifier(params: &Params, key: &'static str) -> Result<Option<String>, ConfigError> {
    let Some(value) = lookup(params, key) else {
        return Ok(None);
    };

    match value {
        Value::String(s) if s.trim().is_empty() => Err(ConfigError::Blank(key)),
        Value::String(s) => Ok(Some(s.trim().to_string())),
        other => Err(ConfigError::InvalidType {
            key,
            expected: "a string",
            found: describe(other),
        }),
    }
}
