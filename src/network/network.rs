use std::time::Instant;

use log::{debug, trace};
use rayon::prelude::*;

use crate::data::{Batch, Example};
use crate::error::{SlideError, SlideResult};
use crate::layers::{Layer, LayerOutput, Node};
use crate::loss::CrossEntropyLoss;
use crate::math::init::mix_seed;
use crate::network::context::RunContext;
use crate::network::schedule::{Maintenance, RehashSchedule};
use crate::network::spec::NetworkConfig;
use crate::network::weights::{LayerWeights, NetworkWeights};
use crate::optim::{BatchGradient, Optimizer};

/// Per-layer outputs of one example's forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardPass {
    pub layers: Vec<LayerOutput>,
}

impl ForwardPass {
    /// Output of the final (Softmax) layer.
    pub fn output(&self) -> &LayerOutput {
        // A network always has at least one layer.
        &self.layers[self.layers.len() - 1]
    }
}

/// Outcome of one `process_input` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Cross-entropy loss of each example, in batch order, computed with the
    /// weights as they were before this batch.
    pub losses: Vec<f64>,
    pub rehashed: bool,
    pub rebuilt: bool,
}

impl BatchReport {
    /// Number of examples actually processed.
    pub fn len(&self) -> usize {
        self.losses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.losses.is_empty()
    }

    pub fn mean_loss(&self) -> f64 {
        if self.losses.is_empty() {
            return 0.0;
        }
        self.losses.iter().sum::<f64>() / self.losses.len() as f64
    }
}

/// Everything one training example contributes to its batch.
struct ExampleTrace {
    loss: f64,
    pass: ForwardPass,
    /// Error terms per layer, aligned with that layer's active set.
    deltas: Vec<Vec<f64>>,
}

/// A feed-forward stack of hashed layers; the last layer is Softmax.
///
/// The network has a single owner: `process_input` takes `&mut self` and is
/// the only place weights and tables change. Within a batch every example
/// reads the same weights, error terms are merged in batch order, and table
/// maintenance runs after the merge.
#[derive(Debug, Clone)]
pub struct Network {
    config: NetworkConfig,
    layers: Vec<Layer>,
    optimizer: Optimizer,
    schedule: RehashSchedule,
}

impl Network {
    /// Builds a network with freshly initialised weights drawn from `config.seed`.
    pub fn new(config: &NetworkConfig) -> SlideResult<Network> {
        config.validate()?;
        let layers = config
            .layers
            .iter()
            .enumerate()
            .map(|(i, spec)| Layer::random(i, spec, config, layer_seed(config, i)))
            .collect::<SlideResult<Vec<Layer>>>()?;
        Ok(Network::assemble(config, layers))
    }

    /// Builds a network from previously saved or externally supplied weights.
    pub fn with_weights(config: &NetworkConfig, weights: NetworkWeights) -> SlideResult<Network> {
        config.validate()?;
        if weights.layers.len() != config.layers.len() {
            return Err(SlideError::ShapeMismatch(format!(
                "config has {} layers, weights have {}",
                config.layers.len(),
                weights.layers.len()
            )));
        }
        let layers = config
            .layers
            .iter()
            .zip(weights.layers)
            .enumerate()
            .map(|(i, (spec, lw))| {
                if lw.weights.len() != lw.biases.len() {
                    return Err(SlideError::ShapeMismatch(format!(
                        "layer {i}: {} weight rows but {} biases",
                        lw.weights.len(),
                        lw.biases.len()
                    )));
                }
                let nodes = lw
                    .weights
                    .into_iter()
                    .zip(lw.biases)
                    .enumerate()
                    .map(|(id, (w, b))| Node::new(id, w, b, spec.activation))
                    .collect();
                Layer::new(i, spec, config, layer_seed(config, i), nodes)
            })
            .collect::<SlideResult<Vec<Layer>>>()?;
        Ok(Network::assemble(config, layers))
    }

    fn assemble(config: &NetworkConfig, layers: Vec<Layer>) -> Network {
        Network {
            config: config.clone(),
            layers,
            optimizer: Optimizer::new(config.optimizer, config.learning_rate),
            schedule: RehashSchedule::from_config(config),
        }
    }

    /// Copies out every layer's weights and biases.
    pub fn snapshot(&self) -> NetworkWeights {
        NetworkWeights {
            layers: self
                .layers
                .iter()
                .map(|layer| LayerWeights {
                    weights: layer.nodes().iter().map(|n| n.weights.clone()).collect(),
                    biases: layer.nodes().iter().map(|n| n.bias).collect(),
                })
                .collect(),
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn schedule(&self) -> RehashSchedule {
        self.schedule
    }

    /// Trains on one batch and returns the per-example losses.
    ///
    /// Examples run in parallel against the current weights; their error
    /// terms are merged in batch order and applied once. If the schedule
    /// marks `ctx.step` as due, hashed layers are then rehashed (or rebuilt)
    /// from the updated weights before the next batch. A short batch is
    /// processed as is; an empty one is a no-op.
    pub fn process_input(&mut self, batch: &Batch, ctx: &mut RunContext) -> SlideResult<BatchReport> {
        if batch.is_empty() {
            return Ok(BatchReport::default());
        }
        for example in batch.iter() {
            self.check_example(example)?;
        }

        let start = Instant::now();
        let base_key = ctx.examples_seen as u64;
        let batch_len = batch.len();

        let traces: Vec<ExampleTrace> = batch
            .examples
            .par_iter()
            .enumerate()
            .map(|(i, example)| self.train_example(example, base_key + i as u64, batch_len))
            .collect();

        let gradient = self.merge(batch, &traces);
        let t = ctx.step + 1;
        for (layer, grad) in self.layers.iter_mut().zip(&gradient.layers) {
            trace!("layer {}: updating {} nodes", layer.index(), grad.touched());
            layer.apply_gradient(grad, &self.optimizer, t);
        }

        let due = self.schedule.due(ctx.step);
        self.maintain(due, ctx.step);

        ctx.step += 1;
        ctx.examples_seen += batch_len;
        ctx.train_time += start.elapsed();

        Ok(BatchReport {
            losses: traces.iter().map(|t| t.loss).collect(),
            rehashed: due.rehash || due.rebuild,
            rebuilt: due.rebuild,
        })
    }

    /// Counts examples whose highest-scoring active output node is one of
    /// their labels. Ties go to the lowest node id. Weights are not touched.
    pub fn predict_class(&self, batch: &Batch, ctx: &mut RunContext) -> SlideResult<usize> {
        for example in batch.iter() {
            self.check_example(example)?;
        }
        let start = Instant::now();
        let correct = batch
            .examples
            .par_iter()
            .enumerate()
            .filter(|(i, example)| {
                let pass = self.forward(example, *i as u64, false);
                pass.output()
                    .argmax()
                    .is_some_and(|predicted| example.labels.contains(&predicted))
            })
            .count();
        ctx.eval_time += start.elapsed();
        Ok(correct)
    }

    /// Forward pass for inspection. No label nodes are forced into the
    /// output's active set; `key` seeds the padding fallback.
    pub fn infer(&self, example: &Example, key: u64) -> SlideResult<ForwardPass> {
        self.check_features(example)?;
        Ok(self.forward(example, key, false))
    }

    /// Rehashes every hashed layer now, outside the schedule.
    pub fn rehash(&mut self) {
        for layer in &mut self.layers {
            layer.rehash();
        }
    }

    /// Rebuilds (and rehashes) every hashed layer now, outside the schedule.
    pub fn rebuild(&mut self) {
        for layer in &mut self.layers {
            layer.rebuild();
        }
    }

    fn maintain(&mut self, due: Maintenance, step: usize) {
        if due.rebuild {
            debug!("step {step}: rebuilding hash tables");
            self.rebuild();
        } else if due.rehash {
            debug!("step {step}: rehashing");
            self.rehash();
        }
    }

    fn forward(&self, example: &Example, key: u64, force_labels: bool) -> ForwardPass {
        let last = self.layers.len() - 1;
        let mut outputs: Vec<LayerOutput> = Vec::with_capacity(self.layers.len());
        for (i, layer) in self.layers.iter().enumerate() {
            let input = if i == 0 { &example.features } else { &outputs[i - 1].activations };
            let forced: &[usize] = if force_labels && i == last { &example.labels } else { &[] };
            let active = layer.select_active(input, forced, key);
            let output = layer.forward(input, active);
            outputs.push(output);
        }
        ForwardPass { layers: outputs }
    }

    fn train_example(&self, example: &Example, key: u64, batch_len: usize) -> ExampleTrace {
        let pass = self.forward(example, key, true);
        let last = self.layers.len() - 1;
        let loss = CrossEntropyLoss::loss(pass.output(), &example.labels);

        let mut deltas: Vec<Vec<f64>> = vec![Vec::new(); self.layers.len()];
        deltas[last] = CrossEntropyLoss::error(pass.output(), &example.labels, batch_len);
        for i in (1..=last).rev() {
            deltas[i - 1] = self.layers[i].back_propagate(
                &deltas[i],
                &pass.layers[i],
                &pass.layers[i - 1],
                self.layers[i - 1].kind(),
            );
        }
        ExampleTrace { loss, pass, deltas }
    }

    /// Sums every example's contribution, in batch order.
    fn merge(&self, batch: &Batch, traces: &[ExampleTrace]) -> BatchGradient {
        let mut gradient = BatchGradient::new(self.layers.len());
        for (example, trace) in batch.iter().zip(traces) {
            for (l, deltas) in trace.deltas.iter().enumerate() {
                let input = if l == 0 { &example.features } else { &trace.pass.layers[l - 1].activations };
                for (&id, &delta) in trace.pass.layers[l].active().iter().zip(deltas) {
                    if delta != 0.0 {
                        gradient.layers[l].accumulate(id, delta, input);
                    }
                }
            }
        }
        gradient
    }

    fn check_features(&self, example: &Example) -> SlideResult<()> {
        if let Some(max) = example.features.max_index() {
            if max >= self.config.input_dim {
                return Err(SlideError::InvalidExample(format!(
                    "feature index {max} out of range for input dimension {}",
                    self.config.input_dim
                )));
            }
        }
        Ok(())
    }

    fn check_example(&self, example: &Example) -> SlideResult<()> {
        self.check_features(example)?;
        if example.labels.is_empty() {
            return Err(SlideError::InvalidExample("example has no labels".into()));
        }
        let classes = self.config.num_classes();
        if let Some(&label) = example.labels.iter().find(|&&l| l >= classes) {
            return Err(SlideError::InvalidExample(format!(
                "label {label} out of range for {classes} output classes"
            )));
        }
        Ok(())
    }
}

fn layer_seed(config: &NetworkConfig, index: usize) -> u64 {
    mix_seed(config.seed, index as u64)
}
