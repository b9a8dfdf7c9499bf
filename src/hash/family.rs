use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::{SlideError, SlideResult};
use crate::math::init::mix_seed;
use crate::math::VectorRef;

/// Marker for a WTA bin that no non-zero coordinate fell into.
const EMPTY_BIN: u32 = u32::MAX;

/// Probe budget when densifying an empty bin.
const DENSIFY_ATTEMPTS: u64 = 100;

/// Fraction of coordinates each signed projection samples (one in three).
const SRP_SAMPLE_RATIO: u32 = 3;

/// Locality-sensitive hash scheme used to sketch weight and query vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashKind {
    /// Winner-take-all over random permutation bins; empty bins hash to 0.
    Wta,
    /// Winner-take-all with densification of empty bins.
    Dwta,
    /// Signed random projection: one sign bit per hash.
    Srp,
    /// Every vector maps to code 0 in every table, so every node collides
    /// with every query.
    Constant,
}

impl Default for HashKind {
    fn default() -> Self {
        HashKind::Dwta
    }
}

/// Fixed random state a family draws at construction. Never re-randomized.
#[derive(Debug, Clone)]
enum Projection {
    /// `bins[p * dim + c]` is the bin that coordinate `c` lands in under
    /// permutation `p`, and `slots[p * dim + c]` its position inside that bin.
    Permutation {
        bins: Vec<u32>,
        slots: Vec<u8>,
        permutations: usize,
        densify: bool,
        probe_seed: u64,
    },
    /// Transposed sign matrix: `signs[c * num_hashes + h]` in {-1, 0, 1}.
    Signs { signs: Vec<i8> },
    Constant,
}

/// K x L hash functions over `dim`-dimensional vectors.
///
/// `signatures()` yields one code per table; each code concatenates the K
/// hash values belonging to that table. The result is a pure function of the
/// vector's non-zero entries and the seed.
#[derive(Debug, Clone)]
pub struct HashFamily {
    kind: HashKind,
    k: usize,
    l: usize,
    dim: usize,
    bits_per_hash: u32,
    projection: Projection,
}

impl HashFamily {
    pub fn new(
        kind: HashKind,
        k: usize,
        l: usize,
        dim: usize,
        bin_size: usize,
        seed: u64,
    ) -> SlideResult<HashFamily> {
        if l == 0 {
            return Err(SlideError::InvalidConfig("hash family needs at least one table (L)".into()));
        }
        if dim == 0 {
            return Err(SlideError::InvalidConfig("hash family dimension must be positive".into()));
        }
        if kind != HashKind::Constant && k == 0 {
            return Err(SlideError::InvalidConfig("hash family needs at least one hash per table (K)".into()));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let num_hashes = k * l;

        let (bits_per_hash, projection) = match kind {
            HashKind::Wta | HashKind::Dwta => {
                if !bin_size.is_power_of_two() || !(2..=256).contains(&bin_size) {
                    return Err(SlideError::InvalidConfig(format!(
                        "bin_size must be a power of two in 2..=256, got {bin_size}"
                    )));
                }
                let bits = bin_size.trailing_zeros();
                let permutations = (num_hashes * bin_size).div_ceil(dim);
                let mut bins = vec![0u32; permutations * dim];
                let mut slots = vec![0u8; permutations * dim];
                let mut order: Vec<usize> = (0..dim).collect();
                for p in 0..permutations {
                    order.shuffle(&mut rng);
                    for (j, &coord) in order.iter().enumerate() {
                        let global = p * dim + j;
                        bins[p * dim + coord] = (global / bin_size) as u32;
                        slots[p * dim + coord] = (global % bin_size) as u8;
                    }
                }
                let projection = Projection::Permutation {
                    bins,
                    slots,
                    permutations,
                    densify: kind == HashKind::Dwta,
                    probe_seed: rng.gen(),
                };
                (bits, projection)
            }
            HashKind::Srp => {
                let mut signs = vec![0i8; dim * num_hashes];
                for h in 0..num_hashes {
                    for c in 0..dim {
                        if rng.gen_ratio(1, SRP_SAMPLE_RATIO) {
                            signs[c * num_hashes + h] = if rng.gen::<bool>() { 1 } else { -1 };
                        }
                    }
                }
                (1, Projection::Signs { signs })
            }
            HashKind::Constant => (0, Projection::Constant),
        };

        let bits_per_table = bits_per_hash as usize * k;
        if bits_per_table > 32 {
            return Err(SlideError::InvalidConfig(format!(
                "K={k} hashes of {bits_per_hash} bits do not fit a 32-bit table code"
            )));
        }

        Ok(HashFamily { kind, k, l, dim, bits_per_hash, projection })
    }

    pub fn kind(&self) -> HashKind {
        self.kind
    }

    /// Hashes per table (K).
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of tables (L).
    pub fn l(&self) -> usize {
        self.l
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn num_hashes(&self) -> usize {
        self.k * self.l
    }

    /// Code of `vector` for table `table`.
    ///
    /// WTA-style sketches evaluate all bins in one pass, so callers that need
    /// several tables should use `signatures()` instead.
    pub fn signature(&self, vector: VectorRef<'_>, table: usize) -> u32 {
        match self.projection {
            Projection::Constant => 0,
            _ => {
                let hashes = self.raw_hashes(vector);
                self.table_code(&hashes, table)
            }
        }
    }

    /// One code per table, `L` in total.
    pub fn signatures(&self, vector: VectorRef<'_>) -> Vec<u32> {
        match self.projection {
            Projection::Constant => vec![0; self.l],
            _ => {
                let hashes = self.raw_hashes(vector);
                (0..self.l).map(|t| self.table_code(&hashes, t)).collect()
            }
        }
    }

    fn table_code(&self, hashes: &[u32], table: usize) -> u32 {
        hashes[table * self.k..(table + 1) * self.k]
            .iter()
            .fold(0u32, |code, &h| {
                if self.bits_per_hash == 0 {
                    code
                } else {
                    (code << self.bits_per_hash) | h
                }
            })
    }

    /// All K x L individual hash values.
    fn raw_hashes(&self, vector: VectorRef<'_>) -> Vec<u32> {
        let n = self.num_hashes();
        match &self.projection {
            Projection::Permutation { bins, slots, permutations, densify, probe_seed } => {
                let mut best = vec![f64::NEG_INFINITY; n];
                let mut hashes = vec![EMPTY_BIN; n];
                vector.for_each_nonzero(|coord, value| {
                    if coord >= self.dim {
                        return;
                    }
                    for p in 0..*permutations {
                        let at = p * self.dim + coord;
                        let bin = bins[at] as usize;
                        if bin >= n {
                            continue;
                        }
                        let slot = slots[at] as u32;
                        // Ties go to the lowest slot so the result does not
                        // depend on the order non-zeros are visited in.
                        if value > best[bin] || (value == best[bin] && slot < hashes[bin]) {
                            best[bin] = value;
                            hashes[bin] = slot;
                        }
                    }
                });
                if *densify {
                    densify_bins(&hashes, *probe_seed)
                } else {
                    hashes
                        .into_iter()
                        .map(|h| if h == EMPTY_BIN { 0 } else { h })
                        .collect()
                }
            }
            Projection::Signs { signs } => {
                let mut acc = vec![0.0f64; n];
                vector.for_each_nonzero(|coord, value| {
                    if coord >= self.dim {
                        return;
                    }
                    let row = &signs[coord * n..(coord + 1) * n];
                    for (a, &s) in acc.iter_mut().zip(row) {
                        if s != 0 {
                            *a += f64::from(s) * value;
                        }
                    }
                });
                acc.into_iter().map(|a| u32::from(a < 0.0)).collect()
            }
            Projection::Constant => vec![0; n],
        }
    }
}

/// Fills every empty bin with the value of a non-empty bin picked by a
/// seeded probe sequence. Probes read the pre-densification values only.
fn densify_bins(hashes: &[u32], probe_seed: u64) -> Vec<u32> {
    let n = hashes.len() as u64;
    hashes
        .iter()
        .enumerate()
        .map(|(i, &h)| {
            if h != EMPTY_BIN {
                return h;
            }
            (1..=DENSIFY_ATTEMPTS)
                .map(|attempt| hashes[(mix_seed(probe_seed ^ i as u64, attempt) % n) as usize])
                .find(|&candidate| candidate != EMPTY_BIN)
                .unwrap_or(0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::SparseVector;

    fn sample_dense(dim: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..dim).map(|_| rng.gen::<f64>() * 2.0 - 1.0).collect()
    }

    #[test]
    fn test_signatures_are_deterministic() {
        for kind in [HashKind::Wta, HashKind::Dwta, HashKind::Srp] {
            let a = HashFamily::new(kind, 3, 5, 40, 8, 11).unwrap();
            let b = HashFamily::new(kind, 3, 5, 40, 8, 11).unwrap();
            let v = sample_dense(40, 3);
            assert_eq!(a.signatures(VectorRef::Dense(&v)), b.signatures(VectorRef::Dense(&v)));
            assert_eq!(a.signatures(VectorRef::Dense(&v)).len(), 5);
        }
    }

    #[test]
    fn test_dense_and_sparse_views_hash_identically() {
        let sparse = SparseVector::new(vec![2, 7, 19, 33], vec![0.4, 1.5, -0.2, 0.9]).unwrap();
        let dense = sparse.to_dense(40);
        for kind in [HashKind::Wta, HashKind::Dwta, HashKind::Srp] {
            let family = HashFamily::new(kind, 2, 6, 40, 4, 5).unwrap();
            assert_eq!(
                family.signatures(VectorRef::Sparse(&sparse)),
                family.signatures(VectorRef::Dense(&dense)),
                "{kind:?}"
            );
        }
    }

    #[test]
    fn test_signature_matches_signatures() {
        let family = HashFamily::new(HashKind::Dwta, 2, 4, 16, 8, 9).unwrap();
        let v = sample_dense(16, 1);
        let all = family.signatures(VectorRef::Dense(&v));
        for t in 0..4 {
            assert_eq!(family.signature(VectorRef::Dense(&v), t), all[t]);
        }
    }

    #[test]
    fn test_codes_fit_table_width() {
        let family = HashFamily::new(HashKind::Wta, 3, 4, 30, 8, 2).unwrap();
        let v = sample_dense(30, 8);
        assert!(family.signatures(VectorRef::Dense(&v)).iter().all(|&c| c < 1 << 9));

        let srp = HashFamily::new(HashKind::Srp, 5, 4, 30, 8, 2).unwrap();
        assert!(srp.signatures(VectorRef::Dense(&v)).iter().all(|&c| c < 1 << 5));
    }

    #[test]
    fn test_constant_family_collapses_everything() {
        let family = HashFamily::new(HashKind::Constant, 0, 3, 10, 8, 0).unwrap();
        let v = sample_dense(10, 4);
        assert_eq!(family.signatures(VectorRef::Dense(&v)), vec![0, 0, 0]);
    }

    #[test]
    fn test_densify_fills_empty_bins() {
        let hashes = vec![EMPTY_BIN, 3, EMPTY_BIN, 5];
        let filled = densify_bins(&hashes, 17);
        assert_eq!(filled[1], 3);
        assert_eq!(filled[3], 5);
        assert!(filled.iter().all(|&h| h == 3 || h == 5));
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(HashFamily::new(HashKind::Wta, 2, 2, 10, 6, 0).is_err());
        assert!(HashFamily::new(HashKind::Dwta, 0, 2, 10, 8, 0).is_err());
        assert!(HashFamily::new(HashKind::Dwta, 12, 2, 10, 8, 0).is_err());
        assert!(HashFamily::new(HashKind::Srp, 2, 0, 10, 8, 0).is_err());
    }
}
