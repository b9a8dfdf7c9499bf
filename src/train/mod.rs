pub mod epoch_stats;
pub mod loop_fn;
pub mod train_config;

pub use epoch_stats::{EpochStats, EvalStats, InterimEval};
pub use loop_fn::{evaluate, train_loop};
pub use train_config::RunConfig;
