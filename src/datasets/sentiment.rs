use std::path::Path;

use async_trait::async_trait;
use burn::data::dataset::{self, InMemDataset};
use serde::Deserialize;

use crate::utils::files::{read_file, record_files};

use super::{DataLoadError, Example, LoadableDataset};

/// A record as exported by the tokenization step, before required fields are checked
#[derive(Deserialize)]
struct Record {
    input_ids: Option<Vec<u32>>,
    attention_mask: Option<Vec<u8>>,
    #[serde(alias = "labels")]
    label: Option<i64>,
}

/// Struct for the sentiment dataset
pub struct SentimentDataset {
    /// Underlying In-Memory dataset
    dataset: InMemDataset<Example>,
}

/// Implement the Dataset trait for the sentiment dataset
impl dataset::Dataset<Example> for SentimentDataset {
    /// Returns a specific item from the dataset
    fn get(&self, index: usize) -> Option<Example> {
        self.dataset.get(index)
    }

    /// Returns the length of the dataset
    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl SentimentDataset {
    /// Wrap examples that are already in memory
    pub fn from_examples(examples: Vec<Example>) -> Self {
        Self {
            dataset: InMemDataset::new(examples),
        }
    }
}

#[async_trait]
impl LoadableDataset<Example> for SentimentDataset {
    /// Reads a `.jsonl` file, or every `.jsonl` file of a directory in file name order
    async fn load(path: &Path) -> Result<Self, DataLoadError> {
        let files = record_files(path)
            .await
            .map_err(|source| DataLoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        if files.is_empty() {
            return Err(DataLoadError::Empty(path.to_path_buf()));
        }

        let mut examples = Vec::new();

        for file in files {
            let lines = read_file(&file).await.map_err(|source| DataLoadError::Io {
                path: file.clone(),
                source,
            })?;

            for (index, line) in lines.iter().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }

                examples.push(parse_record(&file, index + 1, line)?);
            }
        }

        log::debug!("Loaded {} examples from {}", examples.len(), path.display());

        Ok(Self::from_examples(examples))
    }
}

fn parse_record(path: &Path, line: usize, text: &str) -> Result<Example, DataLoadError> {
    let record: Record =
        serde_json::from_str(text).map_err(|e| DataLoadError::Malformed {
            path: path.to_path_buf(),
            line,
            reason: e.to_string(),
        })?;

    let missing = |field| DataLoadError::MissingField {
        path: path.to_path_buf(),
        line,
        field,
    };

    let input_ids = record.input_ids.ok_or_else(|| missing("input_ids"))?;
    let attention_mask = record.attention_mask.ok_or_else(|| missing("attention_mask"))?;
    let label = record.label.ok_or_else(|| missing("label"))?;

    let label = match label {
        0 | 1 => label as u8,
        _ => {
            return Err(DataLoadError::InvalidLabel {
                path: path.to_path_buf(),
                line,
                label,
            })
        }
    };

    Ok(Example::new(input_ids, attention_mask, label))
}
