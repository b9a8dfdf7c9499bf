use serde::{Deserialize, Serialize};

/// Outcome of one evaluation pass over (part of) the test file.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EvalStats {
    /// Examples whose predicted class is one of their labels.
    pub correct: usize,
    /// Examples evaluated.
    pub total: usize,
    /// `correct / total`, or 0 when nothing was evaluated.
    pub accuracy: f64,
}

impl EvalStats {
    pub fn new(correct: usize, total: usize) -> Self {
        let accuracy = if total == 0 { 0.0 } else { correct as f64 / total as f64 };
        EvalStats { correct, total, accuracy }
    }
}

/// Evaluation taken just before training batch `step`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterimEval {
    pub step: usize,
    pub eval: EvalStats,
}

/// Per-epoch training statistics returned by `train_loop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Mean training loss over all examples in this epoch.
    pub mean_loss: f64,
    /// Training batches processed this epoch.
    pub batches: usize,
    /// End-of-epoch evaluation.
    pub eval: EvalStats,
    /// Interim evaluations taken during this epoch, in step order.
    pub interim: Vec<InterimEval>,
    /// Wall-clock duration of this epoch in milliseconds, evaluation included.
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        assert_eq!(EvalStats::new(3, 4).accuracy, 0.75);
        assert_eq!(EvalStats::new(0, 0).accuracy, 0.0);
    }
}
