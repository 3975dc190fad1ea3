use std::path::{Path, PathBuf};

use async_trait::async_trait;
use derive_new::new;
use serde::{Deserialize, Serialize};

/// Pre-tokenized sentiment records in JSON Lines files
pub mod sentiment;

pub use sentiment::SentimentDataset;

/// One tokenized, labeled text instance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Example {
    /// Token ids, padded or truncated to a fixed length
    pub input_ids: Vec<u32>,

    /// 1 for real tokens, 0 for padding
    pub attention_mask: Vec<u8>,

    /// 0 = negative, 1 = positive
    pub label: u8,
}

/// A dataset which can be loaded from a path
#[async_trait]
pub trait LoadableDataset<I>: burn::data::dataset::Dataset<I> {
    /// Load the dataset, preserving on-disk ordering
    async fn load(path: &Path) -> Result<Self, DataLoadError>
    where
        Self: std::marker::Sized;
}

/// Dataset Error
#[derive(thiserror::Error, Debug)]
pub enum DataLoadError {
    /// The path could not be read
    #[error("unable to read {}: {source}", path.display())]
    Io {
        /// The path
        path: PathBuf,
        /// The I/O failure
        source: std::io::Error,
    },

    /// A directory contained no record files
    #[error("no .jsonl record files found in {}", .0.display())]
    Empty(PathBuf),

    /// A line is not a JSON object
    #[error("{}:{line}: malformed record: {reason}", path.display())]
    Malformed {
        /// The file
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// The parser message
        reason: String,
    },

    /// A record lacks one of the required fields
    #[error("{}:{line}: record is missing `{field}`", path.display())]
    MissingField {
        /// The file
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// The absent field
        field: &'static str,
    },

    /// A record carries a label other than 0 or 1
    #[error("{}:{line}: label must be 0 or 1, got {label}", path.display())]
    InvalidLabel {
        /// The file
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// The offending label
        label: i64,
    },
}
