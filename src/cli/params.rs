use std::path::Path;

use serde_yaml::Value;
use tokio::fs;

use crate::config::{ConfigError, Params};

/// Environment variables set by managed training hosts and the parameter each one sets
pub static ENV_VARS: &[(&str, &str)] = &[
    ("SM_CHANNEL_TRAIN", "train_dir"),
    ("SM_CHANNEL_TEST", "eval_dir"),
    ("SM_MODEL_DIR", "output_dir"),
    ("SM_OUTPUT_DATA_DIR", "output_data_dir"),
];

/// Read a YAML parameter file. The document must be a mapping, or empty.
pub async fn from_file(path: &Path) -> Result<Params, ConfigError> {
    let fail = |reason: String| ConfigError::File {
        path: path.display().to_string(),
        reason,
    };

    let text = fs::read_to_string(path)
        .await
        .map_err(|e| fail(e.to_string()))?;

    let document: Value = serde_yaml::from_str(&text).map_err(|e| fail(e.to_string()))?;

    match document {
        Value::Null => Ok(Params::new()),
        Value::Mapping(mapping) => mapping
            .into_iter()
            .map(|(key, value)| match key {
                Value::String(key) => Ok((key, value)),
                other => Err(fail(format!("keys must be strings, got {:?}", other))),
            })
            .collect(),
        _ => Err(fail("expected a mapping of parameters".to_string())),
    }
}

/// Pick the known variables out of an environment listing, such as `std::env::vars()`
pub fn from_env<I>(vars: I) -> Params
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter_map(|(name, value)| {
            ENV_VARS
                .iter()
                .find(|(var, _)| *var == name)
                .map(|(_, key)| (key.to_string(), Value::String(value)))
        })
        .collect()
}

/// Combine parameter layers. Later layers win.
pub fn merge<I>(layers: I) -> Params
where
    I: IntoIterator<Item = Params>,
{
    layers.into_iter().fold(Params::new(), |mut merged, layer| {
        merged.extend(layer);
        merged
    })
}
