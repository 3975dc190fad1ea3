/// Built-in model presets
pub mod available;

/// Mean-pooled token embeddings with a classification head
pub mod mean_pool;
