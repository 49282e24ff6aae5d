//! Bootstrap configuration - seeds the model, then the control surface owns it.

use serde::{Deserialize, Serialize};

/// Starting hyperparameters for the sequence model.
///
/// These only apply at startup. OSC reconfiguration messages change the
/// live model without writing back here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Seconds spanned by the full duration alphabet.
    #[serde(default = "ModelConfig::default_max_duration")]
    pub max_duration: f64,

    /// Note chain order (context window length).
    #[serde(default = "ModelConfig::default_order")]
    pub note_order: usize,

    /// Duration chain order.
    #[serde(default = "ModelConfig::default_order")]
    pub time_order: usize,

    /// Number of duration buckets.
    #[serde(default = "ModelConfig::default_divisions")]
    pub divisions: usize,

    #[serde(default = "ModelConfig::default_rate")]
    pub note_rate: f64,

    #[serde(default = "ModelConfig::default_rate")]
    pub time_rate: f64,

    /// Fixed RNG seed for reproducible sessions. None draws OS entropy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl ModelConfig {
    fn default_max_duration() -> f64 {
        2.0
    }

    fn default_order() -> usize {
        3
    }

    fn default_divisions() -> usize {
        15
    }

    fn default_rate() -> f64 {
        0.1
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            max_duration: Self::default_max_duration(),
            note_order: Self::default_order(),
            time_order: Self::default_order(),
            divisions: Self::default_divisions(),
            note_rate: Self::default_rate(),
            time_rate: Self::default_rate(),
            seed: None,
        }
    }
}

/// All bootstrap configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub model: ModelConfig,
}
