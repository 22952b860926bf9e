//! chunkd - task chunking service
//!
//! Stores tasks with estimated durations, asks a generative model to split
//! them into bounded chunks, and exposes planning helpers (slot scoring,
//! rebalancing, what-if simulation, summaries) over a small HTTP API.

pub mod config;
pub mod decompose;
pub mod domain;
pub mod error;
pub mod id;
pub mod llm;
pub mod normalize;
pub mod pipeline;
pub mod planning;
pub mod prompt;
pub mod server;
pub mod store;

pub use error::{ChunkdError, Result};
