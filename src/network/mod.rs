pub mod context;
pub mod network;
pub mod schedule;
pub mod spec;
pub mod weights;

pub use context::RunContext;
pub use network::{BatchReport, ForwardPass, Network};
pub use schedule::{Maintenance, RehashSchedule};
pub use spec::{HashSpec, LayerMode, LayerSpec, NetworkConfig};
pub use weights::{LayerWeights, NetworkWeights};
