//! Task record and creation input
//!
//! A Task is a unit of work with an estimated duration. Deadline and
//! dependency are stored and returned but never used for ordering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::Tags;
use crate::error::{ChunkdError, Result};
use crate::id::{generate_task_id, now_ms};

/// A persisted task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier ("task-1738300800123-a1b2c3d4")
    pub id: String,

    pub title: String,

    /// Estimated duration in minutes
    pub estimate: u32,

    pub deadline: Option<DateTime<Utc>>,

    /// Open key-value metadata
    pub tags: Tags,

    /// Opaque reference to another task
    pub depends_on: Option<String>,

    /// Chunking claim state
    pub chunk_status: ChunkStatus,

    pub created_at: i64,
    pub updated_at: i64,
}

/// Claim state guarding a task against concurrent decomposition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStatus {
    /// No chunks yet, eligible for claiming
    Unchunked,
    /// Claimed by a running decomposition
    Chunking,
    /// Chunks persisted
    Chunked,
}

impl ChunkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkStatus::Unchunked => "unchunked",
            ChunkStatus::Chunking => "chunking",
            ChunkStatus::Chunked => "chunked",
        }
    }
}

impl std::fmt::Display for ChunkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ChunkStatus {
    type Err = ChunkdError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "unchunked" => Ok(ChunkStatus::Unchunked),
            "chunking" => Ok(ChunkStatus::Chunking),
            "chunked" => Ok(ChunkStatus::Chunked),
            other => Err(ChunkdError::Validation(format!("unknown chunk status '{}'", other))),
        }
    }
}

/// Body of a task creation request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub estimate: i64,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Option<Value>,
    #[serde(default)]
    pub depends_on: Option<String>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, estimate: i64) -> Self {
        Self {
            title: title.into(),
            estimate,
            ..Default::default()
        }
    }

    pub fn with_tags(mut self, tags: Value) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn with_depends_on(mut self, task_id: impl Into<String>) -> Self {
        self.depends_on = Some(task_id.into());
        self
    }

    /// Check the caller-supplied fields and build the task record.
    ///
    /// Existence of `depends_on` is checked by the store, not here.
    pub fn into_task(self) -> Result<Task> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(ChunkdError::Validation("title must not be empty".to_string()));
        }
        if self.estimate <= 0 || self.estimate > u32::MAX as i64 {
            return Err(ChunkdError::Validation(format!(
                "estimate must be a positive number of minutes, got {}",
                self.estimate
            )));
        }
        let tags = match self.tags {
            None | Some(Value::Null) => Tags::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(ChunkdError::Validation(format!("tags must be a JSON object, got {}", other)));
            }
        };
        let depends_on = self.depends_on.filter(|d| !d.trim().is_empty());

        let now = now_ms();
        Ok(Task {
            id: generate_task_id(),
            title,
            estimate: self.estimate as u32,
            deadline: self.deadline,
            tags,
            depends_on,
            chunk_status: ChunkStatus::Unchunked,
            created_at: now,
            updated_at: now,
        })
    }
}
