use std::path::Path;
use std::time::Instant;

use log::{info, warn};

use crate::data::SvmReader;
use crate::error::SlideResult;
use crate::network::{Network, RunContext};
use crate::train::epoch_stats::{EpochStats, EvalStats, InterimEval};
use crate::train::train_config::RunConfig;

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Trains `network` for `config.epochs` epochs over `config.train_data` and
/// returns one `EpochStats` per epoch.
///
/// Each epoch re-reads the training file from the top and processes
/// `total_records / batch_size` batches, fewer if the file runs out. Before
/// every global batch whose step is a multiple of `step_size` (step 0
/// included, giving an untrained baseline) a short evaluation over
/// `interim_eval_batches` test batches is run. Each epoch ends with an
/// evaluation over `eval_batches` test batches, or over the whole test file
/// on the last epoch.
pub fn train_loop(
    network: &mut Network,
    config: &RunConfig,
    ctx: &mut RunContext,
) -> SlideResult<Vec<EpochStats>> {
    let batch_size = network.config().batch_size;
    let batches_per_epoch = config.batches_per_epoch();
    let mut history = Vec::with_capacity(config.epochs);

    for epoch in 1..=config.epochs {
        let t_start = Instant::now();
        let mut reader = SvmReader::open(&config.train_data)?;
        let mut total_loss = 0.0;
        let mut seen = 0;
        let mut batches = 0;
        let mut interim = Vec::new();

        for _ in 0..batches_per_epoch {
            let batch = reader.next_batch(batch_size)?;
            if batch.is_empty() {
                warn!(
                    "epoch {epoch}: training data ended after {batches} of {batches_per_epoch} batches"
                );
                break;
            }

            if config.step_size > 0 && ctx.step % config.step_size == 0 {
                let step = ctx.step;
                let eval = evaluate(
                    network,
                    &config.test_data,
                    config.interim_eval_batches,
                    batch_size,
                    ctx,
                )?;
                info!(
                    "step {step}: interim accuracy {:.4} ({}/{})",
                    eval.accuracy, eval.correct, eval.total
                );
                interim.push(InterimEval { step, eval });
            }

            let report = network.process_input(&batch, ctx)?;
            total_loss += report.losses.iter().sum::<f64>();
            seen += report.len();
            batches += 1;
        }

        let eval_batches = if epoch == config.epochs {
            config.full_test_batches()
        } else {
            config.eval_batches
        };
        let eval = evaluate(network, &config.test_data, eval_batches, batch_size, ctx)?;

        let mean_loss = if seen == 0 { 0.0 } else { total_loss / seen as f64 };
        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            mean_loss,
            batches,
            eval,
            interim,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        info!(
            "epoch {}/{}: loss {:.6}, accuracy {:.4} ({}/{}), {} ms",
            stats.epoch,
            stats.total_epochs,
            stats.mean_loss,
            eval.accuracy,
            eval.correct,
            eval.total,
            stats.elapsed_ms
        );
        history.push(stats);
    }

    info!(
        "training done: {} steps, train {:.2}s, eval {:.2}s",
        ctx.step,
        ctx.train_time.as_secs_f64(),
        ctx.eval_time.as_secs_f64()
    );
    Ok(history)
}

/// Reads up to `num_batches` batches from the top of the SVM file at `path`
/// and counts correct predictions. The network is not modified.
pub fn evaluate<P: AsRef<Path>>(
    network: &Network,
    path: P,
    num_batches: usize,
    batch_size: usize,
    ctx: &mut RunContext,
) -> SlideResult<EvalStats> {
    let mut reader = SvmReader::open(path)?;
    let mut correct = 0;
    let mut total = 0;
    for _ in 0..num_batches {
        let batch = reader.next_batch(batch_size)?;
        if batch.is_empty() {
            break;
        }
        correct += network.predict_class(&batch, ctx)?;
        total += batch.len();
    }
    Ok(EvalStats::new(correct, total))
}
