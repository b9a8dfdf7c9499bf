use std::collections::HashMap;

use crate::math::SparseVector;

/// Error signal accumulated for one node over a batch.
///
/// Values point in the descent direction (`target - predicted` convention),
/// so optimizers add them to the weights.
#[derive(Debug, Clone, Default)]
pub struct NodeGradient {
    pub bias: f64,
    /// Input index -> accumulated `delta * x`. Only non-zero inputs appear.
    pub weights: HashMap<usize, f64>,
}

impl NodeGradient {
    /// Adds the outer product of `delta` and the node's sparse input.
    pub fn accumulate(&mut self, delta: f64, input: &SparseVector) {
        self.bias += delta;
        for (j, x) in input.iter() {
            if x != 0.0 {
                *self.weights.entry(j).or_insert(0.0) += delta * x;
            }
        }
    }
}

/// Gradients of the nodes of one layer that were active at least once.
#[derive(Debug, Clone, Default)]
pub struct LayerGradient {
    pub nodes: HashMap<usize, NodeGradient>,
}

impl LayerGradient {
    pub fn accumulate(&mut self, node: usize, delta: f64, input: &SparseVector) {
        self.nodes.entry(node).or_default().accumulate(delta, input);
    }

    /// Number of distinct nodes touched.
    pub fn touched(&self) -> usize {
        self.nodes.len()
    }
}

/// Per-layer gradients of a whole batch, merged in example order.
#[derive(Debug, Clone, Default)]
pub struct BatchGradient {
    pub layers: Vec<LayerGradient>,
}

impl BatchGradient {
    pub fn new(num_layers: usize) -> BatchGradient {
        BatchGradient {
            layers: (0..num_layers).map(|_| LayerGradient::default()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate_skips_zero_inputs() {
        let input = SparseVector::new(vec![1, 4, 6], vec![2.0, 0.0, -1.0]).unwrap();
        let mut layer = LayerGradient::default();
        layer.accumulate(3, 0.5, &input);
        layer.accumulate(3, 0.25, &input);

        let node = &layer.nodes[&3];
        assert_eq!(node.bias, 0.75);
        assert_eq!(node.weights.len(), 2);
        assert_eq!(node.weights[&1], 1.5);
        assert_eq!(node.weights[&6], -0.75);
        assert_eq!(layer.touched(), 1);
    }
}
