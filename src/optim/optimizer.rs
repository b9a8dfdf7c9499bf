use serde::{Deserialize, Serialize};

use crate::layers::node::Node;
use crate::optim::adam::Adam;
use crate::optim::gradient::NodeGradient;
use crate::optim::sgd::Sgd;

fn default_beta1() -> f64 { 0.9 }
fn default_beta2() -> f64 { 0.999 }
fn default_epsilon() -> f64 { 1e-8 }

/// Update rule as written in a config file. The learning rate lives next to
/// it in `NetworkConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OptimizerKind {
    #[default]
    Sgd,
    Adam {
        #[serde(default = "default_beta1")]
        beta1: f64,
        #[serde(default = "default_beta2")]
        beta2: f64,
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
}

/// Update rule bound to a learning rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Optimizer {
    Sgd(Sgd),
    Adam(Adam),
}

impl Optimizer {
    pub fn new(kind: OptimizerKind, learning_rate: f64) -> Optimizer {
        match kind {
            OptimizerKind::Sgd => Optimizer::Sgd(Sgd::new(learning_rate)),
            OptimizerKind::Adam { beta1, beta2, epsilon } => {
                Optimizer::Adam(Adam { learning_rate, beta1, beta2, epsilon })
            }
        }
    }

    /// `t` is the 1-based batch count.
    pub fn step(&self, node: &mut Node, grad: &NodeGradient, t: usize) {
        match self {
            Optimizer::Sgd(sgd) => sgd.step(node, grad),
            Optimizer::Adam(adam) => adam.step(node, grad, t),
        }
    }
}
