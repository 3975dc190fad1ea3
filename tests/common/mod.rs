#![allow(dead_code)]

use std::{fs, path::Path};

use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
use burn_sentiment::{config::Params, datasets::Example, utils::tensors::pad_to};
use serde_yaml::Value;

pub type TestBackend = Autodiff<NdArray>;

pub const DEVICE: NdArrayDevice = NdArrayDevice::Cpu;

pub const SEQ_LENGTH: usize = 4;

pub static TOKENIZER: &str = r#"{
    "version": "1.0",
    "truncation": null,
    "padding": null,
    "added_tokens": [],
    "normalizer": null,
    "pre_tokenizer": { "type": "Whitespace" },
    "post_processor": null,
    "decoder": null,
    "model": {
        "type": "WordLevel",
        "vocab": {
            "[PAD]": 0,
            "[UNK]": 1,
            "good": 2,
            "great": 3,
            "fine": 4,
            "bad": 5,
            "awful": 6,
            "poor": 7,
            "film": 8,
            "plot": 9
        },
        "unk_token": "[UNK]"
    }
}"#;

/// A padded example built from raw token ids
pub fn example(tokens: &[u32], label: u8) -> Example {
    let (input_ids, attention_mask) = pad_to(0, tokens, SEQ_LENGTH);

    Example::new(input_ids, attention_mask, label)
}

pub fn train_examples() -> Vec<Example> {
    vec![
        example(&[2, 8], 1),
        example(&[6, 9], 0),
        example(&[3, 8, 9], 1),
        example(&[7, 8], 0),
    ]
}

pub fn eval_examples() -> Vec<Example> {
    vec![example(&[2, 9], 1), example(&[5, 8], 0)]
}

pub fn write_records(path: &Path, examples: &[Example]) {
    let lines: Vec<String> = examples
        .iter()
        .map(|example| serde_json::to_string(example).unwrap())
        .collect();

    fs::write(path, lines.join("\n")).unwrap();
}

/// A workspace with a tokenizer and train/eval record files, and parameters pointing at them
pub fn workspace(root: &Path, train: &[Example], eval: &[Example]) -> Params {
    let tokenizer = root.join("tokenizer.json");
    fs::write(&tokenizer, TOKENIZER).unwrap();

    let train_dir = root.join("train");
    let eval_dir = root.join("test");
    fs::create_dir_all(&train_dir).unwrap();
    fs::create_dir_all(&eval_dir).unwrap();

    write_records(&train_dir.join("train.jsonl"), train);
    write_records(&eval_dir.join("test.jsonl"), eval);

    params(&[
        ("tokenizer_name", path(&tokenizer)),
        ("train_dir", path(&train_dir)),
        ("eval_dir", path(&eval_dir)),
        ("output_dir", path(&root.join("model"))),
        ("model_name", "mean-pool-small".into()),
        ("epochs", 2.into()),
        ("train_batch_size", 2.into()),
        ("eval_batch_size", 2.into()),
        ("learning_rate", "0.01".into()),
        ("warmup_steps", 0.into()),
    ])
}

pub fn path(path: &Path) -> Value {
    Value::String(path.to_string_lossy().into_owned())
}

pub fn params(entries: &[(&str, Value)]) -> Params {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}
