use std::time::Duration;

/// Counters and timers of one run, threaded through every
/// `process_input` / `predict_class` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunContext {
    /// Training batches processed so far; the schedule's step.
    pub step: usize,
    /// Training examples processed so far.
    pub examples_seen: usize,
    /// Wall time spent in `process_input`.
    pub train_time: Duration,
    /// Wall time spent in `predict_class`.
    pub eval_time: Duration,
}

impl RunContext {
    pub fn new() -> RunContext {
        RunContext::default()
    }
}
