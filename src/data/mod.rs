pub mod batch;
pub mod svm;

pub use batch::{Batch, Example};
pub use svm::{parse_line, SvmReader};
