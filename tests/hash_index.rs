use slide_nn::math::VectorRef;
use slide_nn::network::HashSpec;
use slide_nn::{
    Batch, Example, HashFamily, HashKind, HashTable, LayerMode, LayerSpec, Network, NetworkConfig,
    NodeType, OptimizerKind, RunContext,
};

fn config(kind: HashKind) -> NetworkConfig {
    NetworkConfig {
        input_dim: 30,
        batch_size: 4,
        learning_rate: 0.05,
        layers: vec![
            LayerSpec { size: 24, activation: NodeType::ReLU, k: 2, l: 6, range_pow: 6, sparsity: 0.25 },
            LayerSpec { size: 12, activation: NodeType::Softmax, k: 2, l: 6, range_pow: 6, sparsity: 0.5 },
        ],
        layer_mode: LayerMode::Union,
        hash: HashSpec { kind, bin_size: 4 },
        // Larger than any layer, so no bucket ever evicts.
        bucket_size: 64,
        rehash_interval: 4,
        rebuild_interval: 12,
        legacy_rebuild_trigger: false,
        seed: 5,
        optimizer: OptimizerKind::Sgd,
    }
}

fn batch(offset: usize) -> Batch {
    (0..4)
        .map(|i| {
            let a = (offset + i) % 30;
            let b = (offset + 3 * i + 7) % 30;
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            let indices = if lo == hi { vec![lo] } else { vec![lo, hi] };
            let values = vec![1.0; indices.len()];
            Example::new(indices, values, vec![(offset + i) % 12]).unwrap()
        })
        .collect()
}

/// Every node can be found, in every table, from its own weights.
fn assert_self_consistent(net: &Network) {
    for layer in net.layers() {
        let table = layer.table().expect("layer should be hashed");
        for node in layer.nodes() {
            for t in 0..table.num_tables() {
                let found = table.table_candidates(t, VectorRef::Dense(&node.weights));
                assert!(
                    found.contains(&node.id),
                    "layer {} node {} missing from table {t}",
                    layer.index(),
                    node.id
                );
            }
        }
    }
}

#[test]
fn test_fresh_network_is_self_consistent() {
    for kind in [HashKind::Wta, HashKind::Dwta, HashKind::Srp] {
        let net = Network::new(&config(kind)).unwrap();
        assert_self_consistent(&net);
    }
}

#[test]
fn test_self_consistent_after_scheduled_rehash() {
    let mut net = Network::new(&config(HashKind::Dwta)).unwrap();
    let mut ctx = RunContext::new();
    let mut rehashes = 0;
    for step in 0..6 {
        let report = net.process_input(&batch(step * 4), &mut ctx).unwrap();
        if report.rehashed {
            rehashes += 1;
            assert_self_consistent(&net);
        }
    }
    assert_eq!(rehashes, 6);
}

#[test]
fn test_manual_rebuild_restores_index() {
    let mut net = Network::new(&config(HashKind::Srp)).unwrap();
    let mut ctx = RunContext::new();
    net.process_input(&batch(1), &mut ctx).unwrap();
    net.rebuild();
    assert_self_consistent(&net);
}

#[test]
fn test_rebuild_twice_then_rehash() {
    let family = HashFamily::new(HashKind::Dwta, 2, 4, 6, 2, 11).unwrap();
    let mut table = HashTable::new(family, 5, 16, 3).unwrap();
    let vectors: Vec<Vec<f64>> = (0..8)
        .map(|i| (0..6).map(|j| ((i * 7 + j * 3) % 11) as f64 - 5.0).collect())
        .collect();
    table.rehash(vectors.iter().enumerate().map(|(id, v)| (id, VectorRef::Dense(v))).collect::<Vec<_>>());

    table.rebuild();
    table.rebuild();
    for v in &vectors {
        assert!(table.retrieve(VectorRef::Dense(v)).is_empty());
    }
    assert_eq!(table.occupancy().entries, 0);

    table.rehash(vectors.iter().enumerate().map(|(id, v)| (id, VectorRef::Dense(v))).collect::<Vec<_>>());
    for (id, v) in vectors.iter().enumerate() {
        assert!(table.retrieve(VectorRef::Dense(v)).contains(&id));
    }
    assert_eq!(table.occupancy().entries, 8 * 4);
}
