use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::activation::NodeType;
use crate::error::{SlideError, SlideResult};
use crate::hash::{HashKind, DEFAULT_BUCKET_SIZE};
use crate::optim::OptimizerKind;

/// Describes one hashed layer in a network configuration.
///
/// Fields:
/// - `size`       — number of neurons in this layer
/// - `activation` — `relu` for hidden layers, `softmax` for the final layer
/// - `k`          — hashes concatenated into one table code
/// - `l`          — number of hash tables
/// - `range_pow`  — log2 of the bucket count per table
/// - `sparsity`   — minimum fraction of the layer activated per example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub size: usize,
    pub activation: NodeType,
    pub k: usize,
    pub l: usize,
    pub range_pow: u32,
    pub sparsity: f64,
}

impl LayerSpec {
    /// Smallest active set this layer may use: `ceil(sparsity * size)`,
    /// at least one node and at most all of them.
    pub fn min_active(&self) -> usize {
        let wanted = (self.sparsity * self.size as f64).ceil() as usize;
        wanted.clamp(1, self.size.max(1))
    }
}

/// How hashed layers turn bucket collisions into an active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LayerMode {
    /// Every colliding candidate is activated.
    #[default]
    Union,
    /// Candidates ranked by the number of colliding tables, cut at the
    /// sparsity floor. Tables are built once and never rehashed.
    TopK,
    /// Candidates colliding in at least `min_tables` tables.
    Threshold { min_tables: usize },
    /// No hashing: every node is active.
    Dense,
}

impl LayerMode {
    pub fn uses_hashing(&self) -> bool {
        !matches!(self, LayerMode::Dense)
    }

    /// Whether the rehash/rebuild schedule applies under this mode.
    pub fn maintains_tables(&self) -> bool {
        matches!(self, LayerMode::Union | LayerMode::Threshold { .. })
    }
}

fn default_bin_size() -> usize {
    8
}

/// Hash family shared by every layer (each layer draws its own seed).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HashSpec {
    #[serde(default)]
    pub kind: HashKind,
    /// Positions per winner-take-all bin. Ignored by `srp` and `constant`.
    #[serde(default = "default_bin_size")]
    pub bin_size: usize,
}

impl Default for HashSpec {
    fn default() -> Self {
        HashSpec { kind: HashKind::default(), bin_size: default_bin_size() }
    }
}

fn default_bucket_size() -> usize {
    DEFAULT_BUCKET_SIZE
}

/// Everything needed to construct a `Network`. Immutable for a run.
///
/// Can be saved to / loaded from JSON on its own, or embedded in a
/// `RunConfig` under the `network` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Dimensionality of the raw sparse input.
    pub input_dim: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Ordered list of layers (input side → output side).
    pub layers: Vec<LayerSpec>,
    #[serde(default)]
    pub layer_mode: LayerMode,
    #[serde(default)]
    pub hash: HashSpec,
    #[serde(default = "default_bucket_size")]
    pub bucket_size: usize,
    /// Examples between two rehashes of every hashed layer.
    pub rehash_interval: usize,
    /// Examples between two rebuilds of every hashed layer.
    pub rebuild_interval: usize,
    /// Derive the rebuild cadence from `rehash_interval`, as older runs did.
    #[serde(default)]
    pub legacy_rebuild_trigger: bool,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub optimizer: OptimizerKind,
}

impl NetworkConfig {
    /// Input dimension of layer `index`: the raw input for layer 0, the
    /// previous layer's width otherwise.
    pub fn layer_input_dim(&self, index: usize) -> usize {
        if index == 0 {
            self.input_dim
        } else {
            self.layers[index - 1].size
        }
    }

    /// Number of output classes (final layer width).
    pub fn num_classes(&self) -> usize {
        self.layers.last().map(|l| l.size).unwrap_or(0)
    }

    pub fn validate(&self) -> SlideResult<()> {
        let invalid = |msg: String| Err(SlideError::InvalidConfig(msg));

        if self.input_dim == 0 {
            return invalid("input_dim must be positive".into());
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be positive".into());
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return invalid(format!("learning_rate must be positive, got {}", self.learning_rate));
        }
        if self.layers.is_empty() {
            return invalid("at least one layer is required".into());
        }
        if self.rehash_interval == 0 || self.rebuild_interval == 0 {
            return invalid("rehash_interval and rebuild_interval must be positive".into());
        }
        if self.bucket_size == 0 {
            return invalid("bucket_size must be positive".into());
        }
        if let LayerMode::Threshold { min_tables } = self.layer_mode {
            if min_tables == 0 {
                return invalid("threshold layer mode needs min_tables >= 1".into());
            }
        }

        let last = self.layers.len() - 1;
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.size == 0 {
                return invalid(format!("layer {i}: size must be positive"));
            }
            let expected = if i == last { NodeType::Softmax } else { NodeType::ReLU };
            if layer.activation != expected {
                return invalid(format!(
                    "layer {i}: expected {expected:?} activation, got {:?}",
                    layer.activation
                ));
            }
            if !(layer.sparsity > 0.0 && layer.sparsity <= 1.0) {
                return invalid(format!("layer {i}: sparsity must be in (0, 1], got {}", layer.sparsity));
            }
            if layer.l == 0 {
                return invalid(format!("layer {i}: L must be positive"));
            }
            if layer.k == 0 && self.hash.kind != HashKind::Constant {
                return invalid(format!("layer {i}: K must be positive"));
            }
            if let LayerMode::Threshold { min_tables } = self.layer_mode {
                if min_tables > layer.l {
                    return invalid(format!(
                        "layer {i}: threshold min_tables {min_tables} exceeds L = {}",
                        layer.l
                    ));
                }
            }
            if !(1..=30).contains(&layer.range_pow) {
                return invalid(format!("layer {i}: range_pow must be in 1..=30, got {}", layer.range_pow));
            }
        }
        Ok(())
    }

    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> SlideResult<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes and validates a `NetworkConfig` from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> SlideResult<NetworkConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config: NetworkConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_layer() -> NetworkConfig {
        NetworkConfig {
            input_dim: 10,
            batch_size: 4,
            learning_rate: 0.01,
            layers: vec![
                LayerSpec { size: 8, activation: NodeType::ReLU, k: 2, l: 3, range_pow: 4, sparsity: 1.0 },
                LayerSpec { size: 5, activation: NodeType::Softmax, k: 2, l: 3, range_pow: 4, sparsity: 0.4 },
            ],
            layer_mode: LayerMode::Union,
            hash: HashSpec::default(),
            bucket_size: 16,
            rehash_interval: 8,
            rebuild_interval: 16,
            legacy_rebuild_trigger: false,
            seed: 1,
            optimizer: OptimizerKind::Sgd,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(two_layer().validate().is_ok());
    }

    #[test]
    fn test_min_active_rounds_up() {
        let spec = &two_layer().layers[1];
        assert_eq!(spec.min_active(), 2);
        let tiny = LayerSpec { sparsity: 0.001, ..spec.clone() };
        assert_eq!(tiny.min_active(), 1);
    }

    #[test]
    fn test_rejects_hidden_softmax() {
        let mut config = two_layer();
        config.layers[0].activation = NodeType::Softmax;
        assert!(matches!(config.validate(), Err(SlideError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_bad_sparsity_and_intervals() {
        let mut config = two_layer();
        config.layers[1].sparsity = 0.0;
        assert!(config.validate().is_err());

        let mut config = two_layer();
        config.rehash_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_threshold_above_table_count() {
        let mut config = two_layer();
        config.layer_mode = LayerMode::Threshold { min_tables: 3 };
        assert!(config.validate().is_ok());
        config.layer_mode = LayerMode::Threshold { min_tables: 4 };
        assert!(matches!(config.validate(), Err(SlideError::InvalidConfig(_))));
    }

    #[test]
    fn test_json_defaults() {
        let json = r#"{
            "input_dim": 4, "batch_size": 2, "learning_rate": 0.1,
            "rehash_interval": 10, "rebuild_interval": 20,
            "layers": [{"size": 2, "activation": "softmax", "k": 1, "l": 2, "range_pow": 3, "sparsity": 1.0}]
        }"#;
        let config: NetworkConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.layer_mode, LayerMode::Union);
        assert_eq!(config.hash.kind, HashKind::Dwta);
        assert_eq!(config.hash.bin_size, 8);
        assert_eq!(config.bucket_size, 128);
        assert_eq!(config.optimizer, OptimizerKind::Sgd);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_layer_mode_json() {
        let mode: LayerMode = serde_json::from_str(r#"{"threshold":{"min_tables":2}}"#).unwrap();
        assert_eq!(mode, LayerMode::Threshold { min_tables: 2 });
        assert!(mode.maintains_tables());
        let mode: LayerMode = serde_json::from_str(r#""top_k""#).unwrap();
        assert!(mode.uses_hashing() && !mode.maintains_tables());
    }
}
