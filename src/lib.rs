//! # Burn Sentiment
#![forbid(unsafe_code)]

/// Run configuration
pub mod config;

/// Errors
pub mod error;

/// Models
pub mod models;

/// Pipelines
pub mod pipelines;

/// Datasets
pub mod datasets;

/// Utilities
pub mod utils;

/// CLI parameter collection
pub mod cli;

pub use error::{Error, Result};
