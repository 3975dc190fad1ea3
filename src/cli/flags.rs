use pico_args::Arguments;
use serde_yaml::Value;

use crate::config::Params;

/// Command line flags and the parameter each one sets
pub static FLAGS: &[(&str, &str)] = &[
    ("--epochs", "epochs"),
    ("--train-batch-size", "train_batch_size"),
    ("--eval-batch-size", "eval_batch_size"),
    ("--model-name", "model_name"),
    ("--tokenizer-name", "tokenizer_name"),
    ("--output-dir", "output_dir"),
    ("--output-data-dir", "output_data_dir"),
    ("--train-dir", "train_dir"),
    ("--eval-dir", "eval_dir"),
    ("--learning-rate", "learning_rate"),
    ("--warmup-steps", "warmup_steps"),
    ("--weight-decay", "weight_decay"),
    ("--adam-epsilon", "adam_epsilon"),
    ("--seed", "seed"),
    ("--resume-from", "resume_from"),
];

/// Collect the parameter flags that were given. Values are kept as strings for the resolver to
/// parse; `--shuffle` is a switch.
pub fn from_args(pargs: &mut Arguments) -> Result<Params, pico_args::Error> {
    let mut params = Params::new();

    for &(flag, key) in FLAGS {
        if let Some(value) = pargs.opt_value_from_str::<_, String>(flag)? {
            params.insert(key.to_string(), Value::String(value));
        }
    }

    if pargs.contains("--shuffle") {
        params.insert("shuffle".to_string(), Value::Bool(true));
    }

    Ok(params)
}
