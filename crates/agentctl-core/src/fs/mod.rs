//! Filesystem primitives shared across features.

pub mod atomic;
pub mod tree_hash;

pub use atomic::{read_json_or_default, write_atomic, write_json_atomic};
pub use tree_hash::hash_tree;
