pub mod family;
pub mod table;

pub use family::{HashFamily, HashKind};
pub use table::{HashTable, Occupancy, DEFAULT_BUCKET_SIZE};
