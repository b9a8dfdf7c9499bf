use std::collections::BTreeSet;

use slide_nn::network::HashSpec;
use slide_nn::{
    Batch, Example, HashKind, LayerMode, LayerSpec, Network, NetworkConfig, NodeType,
    OptimizerKind, RunContext,
};

fn config(optimizer: OptimizerKind) -> NetworkConfig {
    NetworkConfig {
        input_dim: 50,
        batch_size: 3,
        learning_rate: 0.1,
        layers: vec![
            LayerSpec { size: 40, activation: NodeType::ReLU, k: 4, l: 2, range_pow: 8, sparsity: 0.1 },
            LayerSpec { size: 30, activation: NodeType::Softmax, k: 4, l: 2, range_pow: 8, sparsity: 0.1 },
        ],
        layer_mode: LayerMode::Union,
        hash: HashSpec { kind: HashKind::Dwta, bin_size: 4 },
        bucket_size: 64,
        rehash_interval: 3,
        rebuild_interval: 30,
        legacy_rebuild_trigger: false,
        seed: 21,
        optimizer,
    }
}

fn batch() -> Batch {
    Batch::new(vec![
        Example::new(vec![2, 17, 33], vec![1.0, 0.5, 2.0], vec![4]).unwrap(),
        Example::new(vec![8, 41], vec![1.5, 1.0], vec![19, 27]).unwrap(),
        Example::new(vec![0, 25, 49], vec![0.7, 0.7, 0.3], vec![11]).unwrap(),
    ])
}

/// Per layer, every node any example of `batch` activates during training.
/// Hidden layers never force labels, so `infer` reproduces them; the output
/// layer adds the labels the training pass forces in.
fn trained_nodes(net: &Network, batch: &Batch, first_key: u64) -> Vec<BTreeSet<usize>> {
    let last = net.layers().len() - 1;
    let mut union = vec![BTreeSet::new(); net.layers().len()];
    for (i, example) in batch.iter().enumerate() {
        let key = first_key + i as u64;
        let pass = net.infer(example, key).unwrap();
        for l in 0..last {
            union[l].extend(pass.layers[l].active().iter().copied());
        }
        let input = &pass.layers[last - 1].activations;
        let active = net.layers()[last].select_active(input, &example.labels, key);
        union[last].extend(active);
    }
    union
}

fn assert_untouched_outside(optimizer: OptimizerKind) {
    let mut net = Network::new(&config(optimizer)).unwrap();
    let before = net.snapshot();
    let touched = trained_nodes(&net, &batch(), 0);

    let mut ctx = RunContext::new();
    net.process_input(&batch(), &mut ctx).unwrap();
    let after = net.snapshot();

    let mut untouched = 0;
    for (l, (old, new)) in before.layers.iter().zip(&after.layers).enumerate() {
        for id in 0..old.biases.len() {
            if touched[l].contains(&id) {
                continue;
            }
            untouched += 1;
            assert_eq!(old.weights[id], new.weights[id], "layer {l} node {id} weights moved");
            assert_eq!(old.biases[id].to_bits(), new.biases[id].to_bits(), "layer {l} node {id} bias moved");
        }
    }
    assert!(untouched > 0);
}

#[test]
fn test_inactive_nodes_untouched_by_sgd() {
    assert_untouched_outside(OptimizerKind::Sgd);
}

#[test]
fn test_inactive_nodes_untouched_by_adam() {
    assert_untouched_outside(OptimizerKind::Adam { beta1: 0.9, beta2: 0.999, epsilon: 1e-8 });
}

#[test]
fn test_active_nodes_do_move() {
    let mut net = Network::new(&config(OptimizerKind::Sgd)).unwrap();
    let before = net.snapshot();
    let mut ctx = RunContext::new();
    net.process_input(&batch(), &mut ctx).unwrap();
    let after = net.snapshot();
    // Every label node receives a non-zero bias update.
    for label in [4, 11, 19, 27] {
        assert_ne!(before.layers[1].biases[label], after.layers[1].biases[label]);
    }
}
