pub mod activation;
pub mod data;
pub mod error;
pub mod hash;
pub mod layers;
pub mod loss;
pub mod math;
pub mod network;
pub mod optim;
pub mod train;

// Convenience re-exports
pub use activation::NodeType;
pub use data::{Batch, Example, SvmReader};
pub use error::{SlideError, SlideResult};
pub use hash::{HashFamily, HashKind, HashTable};
pub use layers::{Layer, LayerOutput, Node};
pub use math::SparseVector;
pub use network::{
    BatchReport, ForwardPass, LayerMode, LayerSpec, Network, NetworkConfig, NetworkWeights,
    RunContext,
};
pub use optim::OptimizerKind;
pub use train::{evaluate, train_loop, EpochStats, EvalStats, RunConfig};
