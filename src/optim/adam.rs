use crate::{layers::node::Node, optim::gradient::NodeGradient};

/// First and second moment estimates of one node, allocated on its first update.
#[derive(Debug, Clone)]
pub struct AdamMoments {
    m: Vec<f64>,
    v: Vec<f64>,
    m_bias: f64,
    v_bias: f64,
}

impl AdamMoments {
    pub fn new(len: usize) -> AdamMoments {
        AdamMoments { m: vec![0.0; len], v: vec![0.0; len], m_bias: 0.0, v_bias: 0.0 }
    }
}

/// Adam restricted to the coordinates a batch actually touched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
}

impl Adam {
    /// `t` is the 1-based update count used for bias correction.
    pub fn step(&self, node: &mut Node, grad: &NodeGradient, t: usize) {
        let t = t.max(1) as i32;
        let lr = self.learning_rate * (1.0 - self.beta2.powi(t)).sqrt() / (1.0 - self.beta1.powi(t));
        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);

        let len = node.weights.len();
        let moments = node.moments.get_or_insert_with(|| AdamMoments::new(len));

        moments.m_bias = b1 * moments.m_bias + (1.0 - b1) * grad.bias;
        moments.v_bias = b2 * moments.v_bias + (1.0 - b2) * grad.bias * grad.bias;
        node.bias += lr * moments.m_bias / (moments.v_bias.sqrt() + eps);

        for (&j, &g) in &grad.weights {
            moments.m[j] = b1 * moments.m[j] + (1.0 - b1) * g;
            moments.v[j] = b2 * moments.v[j] + (1.0 - b2) * g * g;
            node.weights[j] += lr * moments.m[j] / (moments.v[j].sqrt() + eps);
        }
    }
}
