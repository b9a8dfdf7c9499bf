use crate::layers::LayerOutput;

/// Categorical cross-entropy loss for a Softmax output restricted to its active set.
///
/// Multi-label targets split the probability mass evenly: each of the
/// `n` labels has target `1/n`, every other node target 0.
pub struct CrossEntropyLoss;

/// Small epsilon added inside log() to prevent log(0) = -inf.
const EPS: f64 = 1e-12;

impl CrossEntropyLoss {
    /// Computes the scalar loss:
    ///   L = -sum over labels of (1/n) * log(p_label + eps)
    ///
    /// A label whose node is not active counts as probability 0.
    pub fn loss(output: &LayerOutput, labels: &[usize]) -> f64 {
        if labels.is_empty() {
            return 0.0;
        }
        let share = 1.0 / labels.len() as f64;
        labels
            .iter()
            .map(|&label| -share * (output.value_of(label).unwrap_or(0.0) + EPS).ln())
            .sum()
    }

    /// Error term of the combined Softmax + cross-entropy for each active
    /// output node, aligned with `output.active()`:
    ///   delta_i = (target_i - predicted_i) / batch_len
    ///
    /// The sign follows the descent direction, so updates add it.
    pub fn error(output: &LayerOutput, labels: &[usize], batch_len: usize) -> Vec<f64> {
        let share = if labels.is_empty() { 0.0 } else { 1.0 / labels.len() as f64 };
        let scale = 1.0 / batch_len.max(1) as f64;
        output
            .activations
            .iter()
            .map(|(id, p)| {
                let target = if labels.contains(&id) { share } else { 0.0 };
                (target - p) * scale
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::SparseVector;

    fn output() -> LayerOutput {
        LayerOutput {
            activations: SparseVector::new(vec![0, 2, 5], vec![0.2, 0.5, 0.3]).unwrap(),
            sums: vec![0.0; 3],
        }
    }

    #[test]
    fn test_single_label_loss() {
        let loss = CrossEntropyLoss::loss(&output(), &[2]);
        assert!((loss - (-(0.5f64 + EPS).ln())).abs() < 1e-12);
    }

    #[test]
    fn test_multi_label_split() {
        let loss = CrossEntropyLoss::loss(&output(), &[0, 5]);
        let expected = -0.5 * (0.2f64 + EPS).ln() - 0.5 * (0.3f64 + EPS).ln();
        assert!((loss - expected).abs() < 1e-12);
    }

    #[test]
    fn test_error_terms() {
        let delta = CrossEntropyLoss::error(&output(), &[2], 2);
        assert_eq!(delta.len(), 3);
        assert!((delta[0] + 0.1).abs() < 1e-12);
        assert!((delta[1] - 0.25).abs() < 1e-12);
        assert!((delta[2] + 0.15).abs() < 1e-12);
    }
}
