//! Chunk pipeline: claim unchunked tasks, decompose them, persist the chunks
//!
//! The claim is taken and settled in short store transactions; the store
//! lock is released while the generator runs.

use std::sync::Arc;

use serde::Serialize;

use crate::decompose::{Decomposition, TaskDecomposer};
use crate::domain::{CandidateChunk, Chunk};
use crate::error::{ChunkdError, Result};
use crate::store::{self, SharedStore};

/// Outcome of one pipeline run, as returned by `POST /chunk`
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChunkRunReport {
    pub chunks: Vec<Chunk>,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub warnings: Vec<String>,
}

pub struct ChunkPipeline {
    store: SharedStore,
    decomposer: Arc<TaskDecomposer>,
}

impl ChunkPipeline {
    pub fn new(store: SharedStore, decomposer: Arc<TaskDecomposer>) -> Self {
        Self { store, decomposer }
    }

    /// Decompose every task that has no chunks yet
    pub async fn run(&self) -> Result<ChunkRunReport> {
        let claimed = store::lock(&self.store)?.claim_unchunked()?;
        if claimed.is_empty() {
            log::info!("No unchunked tasks");
            return Ok(ChunkRunReport::default());
        }

        let task_ids: Vec<String> = claimed.iter().map(|t| t.id.clone()).collect();
        log::info!("Claimed {} task(s) for chunking", task_ids.len());

        let outcome = match self.decomposer.decompose(&claimed).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.release(&task_ids);
                return Err(e);
            }
        };

        if let Decomposition::Failed { reason } = &outcome {
            self.release(&task_ids);
            return Err(ChunkdError::DecompositionFailed(reason.clone()));
        }

        let chunks: Vec<Chunk> = outcome.chunks().iter().cloned().map(CandidateChunk::into_chunk).collect();

        let persisted = store::lock(&self.store).and_then(|mut s| s.complete_claim(&task_ids, &chunks));
        if let Err(e) = persisted {
            log::error!("Failed to persist chunks: {}", e);
            // A lost claim may now belong to another run; leave it alone
            if !matches!(e, ChunkdError::ClaimLost(_)) {
                self.release(&task_ids);
            }
            return Err(e);
        }

        log::info!(
            "Persisted {} chunk(s) for {} task(s){}",
            chunks.len(),
            task_ids.len(),
            if outcome.is_degraded() { " (degraded)" } else { "" }
        );

        Ok(ChunkRunReport {
            degraded: outcome.is_degraded(),
            reason: outcome.reason().map(str::to_string),
            warnings: outcome.warnings().to_vec(),
            chunks,
        })
    }

    fn release(&self, task_ids: &[String]) {
        match store::lock(&self.store).and_then(|mut s| s.release_claim(task_ids)) {
            Ok(n) => log::info!("Released {} claimed task(s)", n),
            Err(e) => log::error!("Failed to release claim: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecomposeConfig;
    use crate::domain::{ChunkStatus, NewTask};
    use crate::llm::MockGenerator;
    use crate::prompt::Prompts;
    use crate::store::TaskStore;

    fn pipeline(generator: Arc<MockGenerator>, fallback: bool) -> (SharedStore, ChunkPipeline) {
        let store = store::shared(TaskStore::open_in_memory().unwrap());
        let config = DecomposeConfig {
            fallback,
            ..Default::default()
        };
        let decomposer = TaskDecomposer::new(generator, Arc::new(Prompts::default()), config, "gemini-test");
        let pipeline = ChunkPipeline::new(store.clone(), Arc::new(decomposer));
        (store, pipeline)
    }

    fn add_task(store: &SharedStore, title: &str, estimate: i64) -> String {
        let task = NewTask::new(title, estimate).into_task().unwrap();
        store::lock(store).unwrap().create_task(&task).unwrap();
        task.id
    }

    #[tokio::test]
    async fn test_empty_store_makes_no_calls() {
        let generator = Arc::new(MockGenerator::always("[]"));
        let (_store, pipeline) = pipeline(generator.clone(), true);

        let report = pipeline.run().await.unwrap();
        assert!(report.chunks.is_empty());
        assert!(!report.degraded);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_run_persists_and_marks_chunked() {
        let generator = Arc::new(MockGenerator::always(r#"[{"title": "a - Part 1", "duration": 30}]"#));
        let (store, pipeline) = pipeline(generator.clone(), true);
        let id = add_task(&store, "a", 30);

        let report = pipeline.run().await.unwrap();
        assert_eq!(report.chunks.len(), 1);
        assert_eq!(report.chunks[0].task_id, id);

        let guard = store::lock(&store).unwrap();
        assert_eq!(guard.chunks_for_task(&id).unwrap().len(), 1);
        assert_eq!(guard.get_task(&id).unwrap().unwrap().chunk_status, ChunkStatus::Chunked);
    }

    #[tokio::test]
    async fn test_second_run_is_empty() {
        let generator = Arc::new(MockGenerator::failing("down"));
        let (store, pipeline) = pipeline(generator.clone(), true);
        add_task(&store, "a", 90);

        let first = pipeline.run().await.unwrap();
        assert!(first.degraded);
        assert_eq!(first.chunks.len(), 1);

        let second = pipeline.run().await.unwrap();
        assert!(second.chunks.is_empty());
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_releases_claim() {
        let generator = Arc::new(MockGenerator::always("nonsense"));
        let (store, pipeline) = pipeline(generator.clone(), false);
        let id = add_task(&store, "a", 90);

        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, ChunkdError::DecompositionFailed(_)));

        let guard = store::lock(&store).unwrap();
        assert_eq!(guard.get_task(&id).unwrap().unwrap().chunk_status, ChunkStatus::Unchunked);
        assert!(guard.list_chunks().unwrap().is_empty());
    }
}
