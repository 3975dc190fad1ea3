/// Model Variants
/// --------------

/// mean-pool-small
pub static MEAN_POOL_SMALL: &str = "mean-pool-small";

/// mean-pool-base
pub static MEAN_POOL_BASE: &str = "mean-pool-base";

/// All built-in presets
pub static ALL_MODELS: &[&str; 2] = &[MEAN_POOL_SMALL, MEAN_POOL_BASE];

/// Layer sizes for a built-in preset
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Preset {
    /// Size of the token embedding
    pub hidden_size: usize,

    /// Size of the hidden classification layer
    pub classifier_size: usize,
}

/// Look up a built-in preset by name
pub fn preset(name: &str) -> Option<Preset> {
    if name == MEAN_POOL_SMALL {
        Some(Preset {
            hidden_size: 64,
            classifier_size: 32,
        })
    } else if name == MEAN_POOL_BASE {
        Some(Preset {
            hidden_size: 256,
            classifier_size: 128,
        })
    } else {
        None
    }
}
