pub mod activation;

pub use activation::{softmax_in_place, NodeType};
