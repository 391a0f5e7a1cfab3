//! Probability building blocks for the discrete-choice engine.
//!
//! This crate hosts the non-hierarchical pieces shared by every model:
//! - stable log-sum-exp with retained normalizing constants
//! - the flat softmax with its overflow/underflow policy
//! - weighted and uniform selection from a probability map

pub mod math;
pub mod selection;
pub mod softmax;

pub use math::{LogSumExp, log_sum_exp};
pub use selection::{UniformSelect, WeightedSelect, select_uniform, select_weighted};
pub use softmax::{softmax, softmax_map};
