//! Context-tree weighting: the bit predictor driving the arithmetic coder.

pub mod ctw;
pub mod kt;
pub mod prob;
pub mod weighting;

pub use ctw::{ContextTree, CtwModel, Node, Window, MAX_DEPTH};
pub use prob::Prob;
