use std::collections::BTreeMap;

/// Class id of the negative label
pub const NEGATIVE: u8 = 0;

/// Class id of the positive label
pub const POSITIVE: u8 = 1;

/// Class names, indexed by class id
pub static LABELS: &[&str; 2] = &["negative", "positive"];

/// A map from class ids to class names for binary sentiment
pub fn id2label() -> BTreeMap<usize, String> {
    LABELS
        .iter()
        .enumerate()
        .map(|(id, label)| (id, (*label).to_string()))
        .collect()
}
