use std::collections::HashSet;

use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::activation::NodeType;
use crate::error::{SlideError, SlideResult};
use crate::hash::{HashFamily, HashTable};
use crate::layers::node::Node;
use crate::math::init::{gaussian_vec, mix_seed, sample_standard_normal, WEIGHT_STD_DEV};
use crate::math::{SparseVector, VectorRef};
use crate::network::spec::{LayerMode, LayerSpec, NetworkConfig};
use crate::optim::{LayerGradient, Optimizer};

/// Result of one layer's forward pass for one example.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerOutput {
    /// Active node ids (ascending) and their activations. This is the next
    /// layer's input and hash query.
    pub activations: SparseVector,
    /// Pre-activation sums, aligned with `activations`.
    pub sums: Vec<f64>,
}

impl LayerOutput {
    pub fn active(&self) -> &[usize] {
        &self.activations.indices
    }

    pub fn len(&self) -> usize {
        self.activations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activations.is_empty()
    }

    /// Activation of node `id`, if it was active.
    pub fn value_of(&self, id: usize) -> Option<f64> {
        self.active()
            .binary_search(&id)
            .ok()
            .map(|pos| self.activations.values[pos])
    }

    /// Active node with the largest activation; ties go to the lowest id.
    pub fn argmax(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (id, v) in self.activations.iter() {
            match best {
                Some((_, b)) if v <= b => {}
                _ => best = Some((id, v)),
            }
        }
        best.map(|(id, _)| id)
    }
}

/// A fully connected layer whose neurons are indexed by an LSH table.
///
/// For each example only the nodes retrieved from the table (padded up to
/// the sparsity floor) are computed and updated.
#[derive(Debug, Clone)]
pub struct Layer {
    index: usize,
    kind: NodeType,
    min_active: usize,
    mode: LayerMode,
    seed: u64,
    nodes: Vec<Node>,
    /// Present when the layer selects its active set by hashing.
    table: Option<HashTable>,
}

impl Layer {
    /// Builds a layer with N(0, 0.01) weights and biases drawn from `seed`.
    pub fn random(
        index: usize,
        spec: &LayerSpec,
        config: &NetworkConfig,
        seed: u64,
    ) -> SlideResult<Layer> {
        let input_dim = config.layer_input_dim(index);
        let mut rng = StdRng::seed_from_u64(mix_seed(seed, 2));
        let nodes = (0..spec.size)
            .map(|id| {
                let weights = gaussian_vec(&mut rng, input_dim, WEIGHT_STD_DEV);
                let bias = sample_standard_normal(&mut rng) * WEIGHT_STD_DEV;
                Node::new(id, weights, bias, spec.activation)
            })
            .collect();
        Layer::new(index, spec, config, seed, nodes)
    }

    /// Builds a layer around existing nodes and fills its hash table.
    pub fn new(
        index: usize,
        spec: &LayerSpec,
        config: &NetworkConfig,
        seed: u64,
        nodes: Vec<Node>,
    ) -> SlideResult<Layer> {
        let input_dim = config.layer_input_dim(index);
        if nodes.len() != spec.size {
            return Err(SlideError::ShapeMismatch(format!(
                "layer {index}: expected {} nodes, got {}",
                spec.size,
                nodes.len()
            )));
        }
        if let Some((pos, node)) = nodes.iter().enumerate().find(|(pos, n)| n.id != *pos) {
            return Err(SlideError::ShapeMismatch(format!(
                "layer {index}: node at position {pos} has id {}",
                node.id
            )));
        }
        if let Some(node) = nodes.iter().find(|n| n.input_dim() != input_dim) {
            return Err(SlideError::ShapeMismatch(format!(
                "layer {index}: node {} has {} weights, expected {input_dim}",
                node.id,
                node.input_dim()
            )));
        }

        let hashed = config.layer_mode.uses_hashing() && spec.sparsity < 1.0;
        let table = if hashed {
            let family = HashFamily::new(
                config.hash.kind,
                spec.k,
                spec.l,
                input_dim,
                config.hash.bin_size,
                mix_seed(seed, 1),
            )?;
            Some(HashTable::new(family, spec.range_pow, config.bucket_size, mix_seed(seed, 3))?)
        } else {
            None
        };

        let mut layer = Layer {
            index,
            kind: spec.activation,
            min_active: spec.min_active(),
            mode: config.layer_mode,
            seed,
            nodes,
            table,
        };
        layer.rehash();
        Ok(layer)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn kind(&self) -> NodeType {
        self.kind
    }

    pub fn min_active(&self) -> usize {
        self.min_active
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: usize) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn table(&self) -> Option<&HashTable> {
        self.table.as_ref()
    }

    pub fn is_hashed(&self) -> bool {
        self.table.is_some()
    }

    /// Chooses the nodes to compute for one example.
    ///
    /// `forced` ids (label nodes during training) are always included.
    /// `key` identifies the example for the padding fallback, which walks
    /// node ids cyclically from a seeded offset until the sparsity floor is
    /// met. The result is sorted and free of duplicates.
    pub fn select_active(&self, query: &SparseVector, forced: &[usize], key: u64) -> Vec<usize> {
        let size = self.size();
        let Some(table) = &self.table else {
            return (0..size).collect();
        };
        let query = VectorRef::Sparse(query);

        let mut chosen: HashSet<usize> = match self.mode {
            LayerMode::Union => table.retrieve_counts(query).into_keys().collect(),
            LayerMode::Threshold { min_tables } => table
                .retrieve_counts(query)
                .into_iter()
                .filter(|&(_, count)| count >= min_tables)
                .map(|(id, _)| id)
                .collect(),
            LayerMode::TopK => {
                let mut ranked: Vec<(usize, usize)> = table.retrieve_counts(query).into_iter().collect();
                ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
                ranked.truncate(self.min_active);
                ranked.into_iter().map(|(id, _)| id).collect()
            }
            LayerMode::Dense => (0..size).collect(),
        };
        chosen.extend(forced.iter().copied().filter(|&id| id < size));

        if chosen.len() < self.min_active {
            let start = (mix_seed(self.seed, key) % size as u64) as usize;
            for step in 0..size {
                if chosen.len() >= self.min_active {
                    break;
                }
                chosen.insert((start + step) % size);
            }
        }

        let mut active: Vec<usize> = chosen.into_iter().collect();
        active.sort_unstable();
        active
    }

    /// Computes the active nodes only; softmax normalises over `active`.
    pub fn forward(&self, input: &SparseVector, active: Vec<usize>) -> LayerOutput {
        let sums: Vec<f64> = active
            .iter()
            .map(|&id| self.nodes[id].pre_activation(input))
            .collect();
        let mut values = sums.clone();
        self.kind.activate(&mut values);
        LayerOutput {
            activations: SparseVector { indices: active, values },
            sums,
        }
    }

    /// Error terms for the previous layer's active nodes, given this layer's
    /// error terms `deltas` (aligned with `output.active()`).
    ///
    /// Only connections between two active nodes contribute.
    pub fn back_propagate(
        &self,
        deltas: &[f64],
        output: &LayerOutput,
        previous: &LayerOutput,
        previous_kind: NodeType,
    ) -> Vec<f64> {
        previous
            .activations
            .iter()
            .map(|(j, a)| {
                let derivative = previous_kind.derivative(a);
                if derivative == 0.0 {
                    return 0.0;
                }
                let sum: f64 = output
                    .active()
                    .iter()
                    .zip(deltas)
                    .map(|(&i, &d)| d * self.nodes[i].weights[j])
                    .sum();
                derivative * sum
            })
            .collect()
    }

    /// Applies a merged batch gradient. Nodes absent from `grad` are not touched.
    pub fn apply_gradient(&mut self, grad: &LayerGradient, optimizer: &Optimizer, t: usize) {
        for (&id, node_grad) in &grad.nodes {
            optimizer.step(&mut self.nodes[id], node_grad, t);
        }
    }

    /// Re-signs every node from its current weights into cleared buckets.
    pub fn rehash(&mut self) {
        let Layer { table, nodes, index, .. } = self;
        if let Some(table) = table.as_mut() {
            table.rehash(nodes.par_iter().map(|n| (n.id, VectorRef::Dense(&n.weights))));
            let occupancy = table.occupancy();
            debug!(
                "layer {index}: rehashed, {} entries in {} buckets (largest {})",
                occupancy.entries, occupancy.buckets, occupancy.largest
            );
        }
    }

    /// Discards bucket storage, then rehashes.
    pub fn rebuild(&mut self) {
        if let Some(table) = self.table.as_mut() {
            table.rebuild();
            debug!("layer {}: rebuilt hash tables", self.index);
        }
        self.rehash();
    }
}
