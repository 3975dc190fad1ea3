/// Parameter files, environment variables and layering
pub mod params;

/// Command line flags
pub mod flags;

pub use flags::from_args;
pub use params::{from_env, from_file, merge};
