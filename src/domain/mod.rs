//! Domain types for chunkd
//!
//! - Task: a unit of work with an estimate, created by callers
//! - Chunk: a bounded piece of a Task, created by decomposition
//! - CandidateChunk: a Chunk before it has been persisted

pub mod chunk;
pub mod task;

pub use chunk::{CandidateChunk, Chunk, TaskWithChunks};
pub use task::{ChunkStatus, NewTask, Task};

/// Open key-value metadata attached to tasks and chunks
pub type Tags = serde_json::Map<String, serde_json::Value>;
