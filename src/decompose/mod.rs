//! Task decomposition

mod decomposer;

pub use decomposer::{Decomposition, TaskDecomposer};
