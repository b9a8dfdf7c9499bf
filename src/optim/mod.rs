pub mod adam;
pub mod gradient;
pub mod optimizer;
pub mod sgd;

pub use adam::{Adam, AdamMoments};
pub use gradient::{BatchGradient, LayerGradient, NodeGradient};
pub use optimizer::{Optimizer, OptimizerKind};
pub use sgd::Sgd;
