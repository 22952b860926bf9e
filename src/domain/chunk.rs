//! Chunk records
//!
//! A Chunk is a bounded-duration piece of a Task, produced by decomposition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Tags, Task};
use crate::id::{generate_chunk_id, now_ms};

/// A persisted chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub id: String,

    /// Owning task
    pub task_id: String,

    pub title: String,

    /// Duration in minutes
    pub duration: u32,

    pub scheduled_at: Option<DateTime<Utc>>,

    pub calendar_event_id: Option<String>,

    pub tags: Tags,

    pub created_at: i64,
}

/// An unpersisted chunk produced by the decomposer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateChunk {
    pub task_id: String,
    pub title: String,
    pub duration: u32,
    #[serde(default)]
    pub tags: Tags,
}

impl CandidateChunk {
    /// The single full-length chunk used when decomposition falls back.
    pub fn full(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            title: format!("{} - Full", task.title),
            duration: task.estimate,
            tags: Tags::new(),
        }
    }

    /// Assign an identity; scheduling fields start empty.
    pub fn into_chunk(self) -> Chunk {
        Chunk {
            id: generate_chunk_id(),
            task_id: self.task_id,
            title: self.title,
            duration: self.duration,
            scheduled_at: None,
            calendar_event_id: None,
            tags: self.tags,
            created_at: now_ms(),
        }
    }
}

/// A task together with its chunks, as returned by the listing routes
#[derive(Debug, Clone, Serialize)]
pub struct TaskWithChunks {
    #[serde(flatten)]
    pub task: Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<Vec<Chunk>>,
}
