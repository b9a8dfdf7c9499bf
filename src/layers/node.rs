use crate::activation::NodeType;
use crate::math::SparseVector;
use crate::optim::AdamMoments;

/// One neuron: a fixed-length weight vector over the previous layer plus a bias.
///
/// Only values mutate; the weight vector length is set at construction.
/// Per-example state (sums, activations) lives in `LayerOutput`, so a node can
/// be read by several examples at once.
#[derive(Debug, Clone)]
pub struct Node {
    /// Position of the node in its layer.
    pub id: usize,
    pub weights: Vec<f64>,
    pub bias: f64,
    pub kind: NodeType,
    pub(crate) moments: Option<AdamMoments>,
}

impl Node {
    pub fn new(id: usize, weights: Vec<f64>, bias: f64, kind: NodeType) -> Node {
        Node { id, weights, bias, kind, moments: None }
    }

    pub fn input_dim(&self) -> usize {
        self.weights.len()
    }

    /// `bias + w · x` over the non-zero inputs.
    pub fn pre_activation(&self, input: &SparseVector) -> f64 {
        self.bias + input.dot_dense(&self.weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_activation() {
        let node = Node::new(2, vec![0.5, -1.0, 2.0], 0.25, NodeType::ReLU);
        let x = SparseVector::new(vec![0, 2], vec![2.0, 0.5]).unwrap();
        assert_eq!(node.pre_activation(&x), 2.25);
        assert_eq!(node.input_dim(), 3);
    }
}
