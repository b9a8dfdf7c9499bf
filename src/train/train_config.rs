use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SlideError, SlideResult};
use crate::network::spec::NetworkConfig;

fn default_eval_batches() -> usize {
    50
}

fn default_interim_eval_batches() -> usize {
    20
}

/// Configuration for a `train_loop` run, loaded from JSON.
///
/// # Fields
/// - `network`              — the model to build (or load weights into)
/// - `train_data`           — SVM-format training file
/// - `test_data`            — SVM-format test file
/// - `epochs`               — full passes over the training file
/// - `total_records`        — training records per epoch
/// - `total_records_test`   — test records; the last epoch evaluates all of them
/// - `step_size`            — batches between interim evaluations; `0` disables them
/// - `eval_batches`         — test batches at the end of each epoch but the last
/// - `interim_eval_batches` — test batches per interim evaluation
/// - `load_weights`         — optional weights file to start from
/// - `save_weights`         — optional path the final weights are written to
/// - `num_threads`          — worker threads; `0` lets rayon decide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub network: NetworkConfig,
    pub train_data: PathBuf,
    pub test_data: PathBuf,
    pub epochs: usize,
    pub total_records: usize,
    pub total_records_test: usize,
    #[serde(default)]
    pub step_size: usize,
    #[serde(default = "default_eval_batches")]
    pub eval_batches: usize,
    #[serde(default = "default_interim_eval_batches")]
    pub interim_eval_batches: usize,
    #[serde(default)]
    pub load_weights: Option<PathBuf>,
    #[serde(default)]
    pub save_weights: Option<PathBuf>,
    #[serde(default)]
    pub num_threads: usize,
}

impl RunConfig {
    pub fn validate(&self) -> SlideResult<()> {
        self.network.validate()?;
        if self.epochs == 0 {
            return Err(SlideError::InvalidConfig("epochs must be positive".into()));
        }
        if self.total_records < self.network.batch_size {
            return Err(SlideError::InvalidConfig(format!(
                "total_records ({}) is smaller than one batch ({})",
                self.total_records, self.network.batch_size
            )));
        }
        Ok(())
    }

    /// Training batches per epoch.
    pub fn batches_per_epoch(&self) -> usize {
        self.total_records / self.network.batch_size
    }

    /// Test batches needed to cover the whole test file.
    pub fn full_test_batches(&self) -> usize {
        self.total_records_test.div_ceil(self.network.batch_size)
    }

    /// Deserializes and validates a `RunConfig` from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> SlideResult<RunConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config: RunConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
        "network": {
            "input_dim": 100, "batch_size": 32, "learning_rate": 0.001,
            "rehash_interval": 640, "rebuild_interval": 6400,
            "layers": [
                {"size": 64, "activation": "relu", "k": 2, "l": 8, "range_pow": 6, "sparsity": 1.0},
                {"size": 10, "activation": "softmax", "k": 3, "l": 8, "range_pow": 9, "sparsity": 0.5}
            ]
        },
        "train_data": "data/train.txt",
        "test_data": "data/test.txt",
        "epochs": 2,
        "total_records": 1000,
        "total_records_test": 70
    }"#;

    #[test]
    fn test_defaults_and_batch_counts() {
        let config: RunConfig = serde_json::from_str(JSON).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.eval_batches, 50);
        assert_eq!(config.interim_eval_batches, 20);
        assert_eq!(config.step_size, 0);
        assert_eq!(config.load_weights, None);
        assert_eq!(config.batches_per_epoch(), 31);
        assert_eq!(config.full_test_batches(), 3);
    }

    #[test]
    fn test_rejects_zero_epochs() {
        let mut config: RunConfig = serde_json::from_str(JSON).unwrap();
        config.epochs = 0;
        assert!(matches!(config.validate(), Err(SlideError::InvalidConfig(_))));
    }
}
