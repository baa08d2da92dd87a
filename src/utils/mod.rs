//! Shared utilities: bit sets and the generic graph layer.

mod bitset;
pub mod graph;

pub use bitset::{BitSet, BitSetIter};
