use crate::error::SlideResult;
use crate::math::SparseVector;

/// One parsed record: sparse features plus one or more class labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub features: SparseVector,
    pub labels: Vec<usize>,
}

impl Example {
    /// `indices` and `values` must have equal length.
    pub fn new(indices: Vec<usize>, values: Vec<f64>, labels: Vec<usize>) -> SlideResult<Example> {
        Ok(Example { features: SparseVector::new(indices, values)?, labels })
    }
}

/// Examples processed together by one `process_input` / `predict_class` call.
///
/// May hold fewer examples than the configured batch size when the source
/// ran out of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub examples: Vec<Example>,
}

impl Batch {
    pub fn new(examples: Vec<Example>) -> Batch {
        Batch { examples }
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Example> {
        self.examples.iter()
    }
}

impl FromIterator<Example> for Batch {
    fn from_iter<I: IntoIterator<Item = Example>>(iter: I) -> Self {
        Batch { examples: iter.into_iter().collect() }
    }
}
