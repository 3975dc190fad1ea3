use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{utils::classes::POSITIVE, Error, Result};

/// The name of the metrics log written to the output data directory
pub static METRICS_FILE: &str = "metrics.csv";

/// Binary classification scores for the positive class
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    /// Fraction of exact matches
    pub accuracy: f64,

    /// True positives over predicted positives
    pub precision: f64,

    /// True positives over actual positives
    pub recall: f64,

    /// Harmonic mean of precision and recall
    pub f1: f64,
}

/// The result of one evaluation pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalMetrics {
    /// Zero-based epoch index
    pub epoch: usize,

    /// Mean training loss over the epoch's batches
    pub train_loss: f64,

    /// Mean evaluation loss over the evaluation batches
    pub loss: f64,

    /// Fraction of exact matches
    pub accuracy: f64,

    /// Precision for the positive class
    pub precision: f64,

    /// Recall for the positive class
    pub recall: f64,

    /// F1 for the positive class
    pub f1: f64,

    /// Wall-clock duration of the evaluation pass
    pub runtime_secs: f64,

    /// Evaluation throughput
    pub samples_per_second: f64,
}

/// Score predicted labels against true labels.
///
/// Ratios with a zero denominator are reported as 0 rather than failing, so a truth sequence
/// without positives has recall 0 and a prediction sequence without positives has precision 0.
pub fn compute(predicted: &[u8], truth: &[u8]) -> Result<ClassificationMetrics> {
    if predicted.len() != truth.len() {
        return Err(Error::LengthMismatch {
            predicted: predicted.len(),
            truth: truth.len(),
        });
    }

    if truth.is_empty() {
        return Ok(ClassificationMetrics::default());
    }

    let mut correct = 0usize;
    let mut true_positives = 0usize;
    let mut predicted_positives = 0usize;
    let mut actual_positives = 0usize;

    for (&p, &t) in predicted.iter().zip(truth) {
        correct += usize::from(p == t);
        predicted_positives += usize::from(p == POSITIVE);
        actual_positives += usize::from(t == POSITIVE);
        true_positives += usize::from(p == POSITIVE && t == POSITIVE);
    }

    let precision = ratio(true_positives, predicted_positives);
    let recall = ratio(true_positives, actual_positives);

    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Ok(ClassificationMetrics {
        accuracy: ratio(correct, truth.len()),
        precision,
        recall,
        f1,
    })
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// The epoch with the highest F1, earliest on ties
pub fn best_epoch(metrics: &[EvalMetrics]) -> Option<usize> {
    metrics
        .iter()
        .fold(None::<&EvalMetrics>, |best, m| match best {
            Some(b) if b.f1 >= m.f1 => Some(b),
            _ => Some(m),
        })
        .map(|m| m.epoch)
}

/// Appends evaluation records to a CSV file, one row per epoch
#[derive(Debug, Clone)]
pub struct MetricsLog {
    path: PathBuf,
}

impl MetricsLog {
    /// A log at `<dir>/metrics.csv`. Nothing is touched until the first append.
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(METRICS_FILE),
        }
    }

    /// The log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, writing the header if the file is new
    pub fn append(&self, metrics: &EvalMetrics) -> Result<()> {
        let fail = |reason: String| Error::MetricsLog {
            path: self.path.clone(),
            reason,
        };

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| fail(e.to_string()))?;
        }

        let is_new = !self.path.exists();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| fail(e.to_string()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);

        writer.serialize(metrics).map_err(|e| fail(e.to_string()))?;
        writer.flush().map_err(|e| fail(e.to_string()))?;

        Ok(())
    }

    /// Read every record back, in the order written
    pub fn read(&self) -> Result<Vec<EvalMetrics>> {
        let mut reader = csv::Reader::from_path(&self.path).map_err(|e| Error::MetricsLog {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        reader
            .deserialize()
            .collect::<std::result::Result<Vec<EvalMetrics>, _>>()
            .map_err(|e| Error::MetricsLog {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }
}
