use serde::{Deserialize, Serialize};

use crate::error::{SlideError, SlideResult};

/// Index/value pairs of a sparse real vector.
///
/// Used for raw example features (indices into the input dimension) and for
/// layer outputs (indices are node ids of the producing layer).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseVector {
    /// Builds a sparse vector; `indices` and `values` must have equal length.
    pub fn new(indices: Vec<usize>, values: Vec<f64>) -> SlideResult<SparseVector> {
        if indices.len() != values.len() {
            return Err(SlideError::InvalidExample(format!(
                "{} feature indices but {} values",
                indices.len(),
                values.len()
            )));
        }
        Ok(SparseVector { indices, values })
    }

    pub fn with_capacity(capacity: usize) -> SparseVector {
        SparseVector {
            indices: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, index: usize, value: f64) {
        self.indices.push(index);
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Largest index present, if any.
    pub fn max_index(&self) -> Option<usize> {
        self.indices.iter().copied().max()
    }

    /// Dot product against a dense vector. Indices past `dense.len()` are skipped.
    pub fn dot_dense(&self, dense: &[f64]) -> f64 {
        self.iter()
            .filter_map(|(i, v)| dense.get(i).map(|w| w * v))
            .sum()
    }

    /// Expands into a dense vector of length `dim`.
    pub fn to_dense(&self, dim: usize) -> Vec<f64> {
        let mut out = vec![0.0; dim];
        for (i, v) in self.iter() {
            if i < dim {
                out[i] += v;
            }
        }
        out
    }
}

/// Borrowed view over either representation, used as hash input.
///
/// Hashing only looks at non-zero entries, so a dense vector and its sparse
/// rendition produce the same signature.
#[derive(Debug, Clone, Copy)]
pub enum VectorRef<'a> {
    Dense(&'a [f64]),
    Sparse(&'a SparseVector),
}

impl<'a> VectorRef<'a> {
    pub fn for_each_nonzero<F: FnMut(usize, f64)>(&self, mut f: F) {
        match self {
            VectorRef::Dense(values) => {
                for (i, &v) in values.iter().enumerate() {
                    if v != 0.0 {
                        f(i, v);
                    }
                }
            }
            VectorRef::Sparse(sparse) => {
                for (i, v) in sparse.iter() {
                    if v != 0.0 {
                        f(i, v);
                    }
                }
            }
        }
    }
}

impl<'a> From<&'a [f64]> for VectorRef<'a> {
    fn from(values: &'a [f64]) -> Self {
        VectorRef::Dense(values)
    }
}

impl<'a> From<&'a SparseVector> for VectorRef<'a> {
    fn from(sparse: &'a SparseVector) -> Self {
        VectorRef::Sparse(sparse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch_rejected() {
        assert!(SparseVector::new(vec![0, 1], vec![1.0]).is_err());
    }

    #[test]
    fn test_dot_dense() {
        let v = SparseVector::new(vec![0, 2, 9], vec![2.0, -1.0, 5.0]).unwrap();
        assert_eq!(v.dot_dense(&[1.0, 7.0, 3.0]), -1.0);
    }

    #[test]
    fn test_views_agree_on_nonzeros() {
        let sparse = SparseVector::new(vec![1, 3, 4], vec![0.5, 0.0, -2.0]).unwrap();
        let dense = sparse.to_dense(6);

        let mut a = Vec::new();
        VectorRef::Sparse(&sparse).for_each_nonzero(|i, v| a.push((i, v)));
        let mut b = Vec::new();
        VectorRef::Dense(&dense).for_each_nonzero(|i, v| b.push((i, v)));

        assert_eq!(a, vec![(1, 0.5), (4, -2.0)]);
        assert_eq!(a, b);
    }
}
