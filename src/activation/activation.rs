use serde::{Deserialize, Serialize};

/// Activation kind of every node in a layer.
///
/// Hidden layers are `ReLU`; the final layer is `Softmax`. Softmax is a
/// vector-valued activation; it is applied over the layer's active set by
/// `softmax_in_place()` rather than element-wise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    ReLU,
    Softmax,
}

impl NodeType {
    /// Element-wise activation. For `Softmax` this returns `x` unchanged; the
    /// normalisation happens over the whole active set afterwards.
    pub fn function(&self, x: f64) -> f64 {
        match self {
            NodeType::ReLU => if x > 0.0 { x } else { 0.0 },
            NodeType::Softmax => x,
        }
    }

    /// Derivative with respect to the pre-activation, given the post-activation
    /// value `a`.
    ///
    /// For `Softmax` the layer is always paired with cross-entropy and the
    /// combined gradient `target - predicted` is formed by the loss, so this
    /// returns `1.0` to pass that error through unchanged.
    pub fn derivative(&self, a: f64) -> f64 {
        match self {
            NodeType::ReLU => if a > 0.0 { 1.0 } else { 0.0 },
            NodeType::Softmax => 1.0,
        }
    }

    /// Turns pre-activation sums into activations, in place.
    pub fn activate(&self, values: &mut [f64]) {
        match self {
            NodeType::ReLU => {
                for v in values.iter_mut() {
                    *v = self.function(*v);
                }
            }
            NodeType::Softmax => softmax_in_place(values),
        }
    }
}

/// Numerically stable softmax (max-subtraction) over `values`.
pub fn softmax_in_place(values: &mut [f64]) {
    if values.is_empty() {
        return;
    }
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in values.iter_mut() {
        *v /= sum;
    }
}
