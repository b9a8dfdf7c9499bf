use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SlideResult;

/// Weights and biases of one layer: `weights[node][input]`, `biases[node]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerWeights {
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
}

/// Persistable parameters of a whole network, in layer order.
///
/// Produced by `Network::snapshot()` and consumed by `Network::with_weights()`.
/// Hash tables are not stored; they are rebuilt from the weights on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkWeights {
    pub layers: Vec<LayerWeights>,
}

impl NetworkWeights {
    /// Serializes the weights to a JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> SlideResult<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Deserializes weights previously written by `save_json`.
    pub fn load_json<P: AsRef<Path>>(path: P) -> SlideResult<NetworkWeights> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
