pub mod init;
pub mod sparse;

pub use sparse::{SparseVector, VectorRef};
