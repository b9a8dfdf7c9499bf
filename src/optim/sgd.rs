use crate::{layers::node::Node, optim::gradient::NodeGradient};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }

    /// Applies one SGD update to the coordinates present in `grad`.
    pub fn step(&self, node: &mut Node, grad: &NodeGradient) {
        node.bias += self.learning_rate * grad.bias;
        for (&j, &g) in &grad.weights {
            node.weights[j] += self.learning_rate * g;
        }
    }
}
