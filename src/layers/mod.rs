pub mod hashed;
pub mod node;

pub use hashed::{Layer, LayerOutput};
pub use node::Node;
