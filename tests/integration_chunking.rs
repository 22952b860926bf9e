//! Chunking pipeline integration tests
//!
//! Runs the claim, decompose and persist flow against a file-backed store
//! with a scripted generator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chunkd::config::DecomposeConfig;
use chunkd::decompose::TaskDecomposer;
use chunkd::domain::{ChunkStatus, NewTask};
use chunkd::error::{ChunkdError, Result};
use chunkd::llm::{GenerationRequest, Generator, MockGenerator, MockReply};
use chunkd::pipeline::ChunkPipeline;
use chunkd::prompt::Prompts;
use chunkd::store::{self, SharedStore, TaskStore};
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::Notify;

fn pipeline_for(store: &SharedStore, generator: Arc<dyn Generator>, fallback: bool) -> ChunkPipeline {
    let config = DecomposeConfig {
        fallback,
        ..Default::default()
    };
    let decomposer = TaskDecomposer::new(generator, Arc::new(Prompts::default()), config, "gemini-test");
    ChunkPipeline::new(store.clone(), Arc::new(decomposer))
}

/// Holds every call until the gate opens, then answers like the inner mock
struct GatedGenerator {
    inner: MockGenerator,
    gate: Arc<Notify>,
}

#[async_trait]
impl Generator for GatedGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        self.gate.notified().await;
        self.inner.generate(request).await
    }

    fn name(&self) -> &str {
        "gated"
    }
}

fn add_task(store: &SharedStore, new_task: NewTask) -> Result<String> {
    let task = new_task.into_task()?;
    store::lock(store)?.create_task(&task)?;
    Ok(task.id)
}

/// Integration test: two tasks become three persisted chunks
#[tokio::test]
async fn test_two_tasks_become_three_chunks() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("chunkd.db");

    let (a, b) = {
        let store = store::shared(TaskStore::open(&db_path)?);
        let a = add_task(&store, NewTask::new("a", 120))?;
        let b = add_task(&store, NewTask::new("b", 30))?;

        let reply = format!(
            r#"```json
[
  {{"taskId": "{a}", "title": "a - Part 1", "duration": 60, "tags": {{}}}},
  {{"taskId": "{a}", "title": "a - Part 2", "duration": 60, "tags": {{}}}},
  {{"taskId": "{b}", "title": "b", "duration": 30, "tags": {{}}}}
]
```"#
        );
        let generator = Arc::new(MockGenerator::always(reply));
        let report = pipeline_for(&store, generator, true).run().await?;

        assert_eq!(report.chunks.len(), 3);
        assert!(!report.degraded);
        assert!(report.warnings.is_empty());
        (a, b)
    };

    // Reload and verify persistence
    let store = TaskStore::open(&db_path)?;
    let a_chunks = store.chunks_for_task(&a)?;
    let b_chunks = store.chunks_for_task(&b)?;
    assert_eq!(a_chunks.len(), 2);
    assert_eq!(a_chunks.iter().map(|c| c.duration).sum::<u32>(), 120);
    assert_eq!(b_chunks.len(), 1);
    assert_eq!(store.count_by_status(ChunkStatus::Chunked)?, 2);

    Ok(())
}

/// Integration test: a second trigger does not call the generator again
#[tokio::test]
async fn test_second_trigger_makes_no_calls() -> Result<()> {
    let store = store::shared(TaskStore::open_in_memory()?);
    add_task(&store, NewTask::new("a", 40))?;

    let generator = Arc::new(MockGenerator::always(r#"[{"title": "a", "duration": 40}]"#));
    let pipeline = pipeline_for(&store, generator.clone(), true);

    assert_eq!(pipeline.run().await?.chunks.len(), 1);
    assert!(pipeline.run().await?.chunks.is_empty());
    assert_eq!(generator.call_count(), 1);

    Ok(())
}

/// Integration test: a trigger arriving mid-generation finds nothing to claim
#[tokio::test]
async fn test_concurrent_triggers_chunk_once() -> Result<()> {
    let store = store::shared(TaskStore::open_in_memory()?);
    let id = add_task(&store, NewTask::new("a", 40))?;

    let gate = Arc::new(Notify::new());
    let generator = Arc::new(GatedGenerator {
        inner: MockGenerator::always(r#"[{"title": "a", "duration": 40}]"#),
        gate: gate.clone(),
    });
    let pipeline = pipeline_for(&store, generator.clone(), true);

    // The first run parks inside the generator holding the claim; the second
    // run completes while it waits and then opens the gate
    let joined = tokio::time::timeout(
        Duration::from_secs(5),
        async {
            tokio::join!(pipeline.run(), async {
                let report = pipeline.run().await;
                gate.notify_one();
                report
            })
        },
    )
    .await;
    let (first, second) = joined.map_err(|_| ChunkdError::Validation("pipeline runs deadlocked".to_string()))?;
    let (first, second) = (first?, second?);

    assert_eq!(first.chunks.len(), 1);
    assert!(second.chunks.is_empty());
    assert_eq!(generator.inner.call_count(), 1);
    assert_eq!(store::lock(&store)?.chunks_for_task(&id)?.len(), 1);
    assert_eq!(
        store::lock(&store)?.get_task(&id)?.map(|t| t.chunk_status),
        Some(ChunkStatus::Chunked)
    );

    Ok(())
}

/// Integration test: a failed decomposition can be retried
#[tokio::test]
async fn test_failed_run_releases_tasks_for_retry() -> Result<()> {
    let store = store::shared(TaskStore::open_in_memory()?);
    let id = add_task(&store, NewTask::new("a", 40))?;

    let generator = Arc::new(MockGenerator::new(vec![
        MockReply::Fail("503 Service Unavailable".to_string()),
        MockReply::Text(r#"[{"title": "a", "duration": 40}]"#.to_string()),
    ]));
    let pipeline = pipeline_for(&store, generator.clone(), false);

    let err = pipeline.run().await.unwrap_err();
    assert!(matches!(err, ChunkdError::DecompositionFailed(_)));
    assert_eq!(
        store::lock(&store)?.get_task(&id)?.map(|t| t.chunk_status),
        Some(ChunkStatus::Unchunked)
    );

    let report = pipeline.run().await?;
    assert_eq!(report.chunks.len(), 1);
    assert_eq!(generator.call_count(), 2);

    Ok(())
}

/// Integration test: claims left by a crash are recovered on reopen
#[tokio::test]
async fn test_stale_claim_recovered_after_restart() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("chunkd.db");

    {
        let mut store = TaskStore::open(&db_path)?;
        store.create_task(&NewTask::new("a", 40).into_task()?)?;
        assert_eq!(store.claim_unchunked()?.len(), 1);
        // Dropped without completing or releasing the claim
    }

    let mut reopened = TaskStore::open(&db_path)?;
    assert_eq!(reopened.recover_stale_claims()?, 1);

    let store = store::shared(reopened);
    let generator = Arc::new(MockGenerator::failing("offline"));
    let report = pipeline_for(&store, generator, true).run().await?;

    assert!(report.degraded);
    assert_eq!(report.chunks[0].title, "a - Full");

    Ok(())
}

/// Integration test: structured tags survive storage
#[test]
fn test_tags_round_trip() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("chunkd.db");

    let id = {
        let mut store = TaskStore::open(&db_path)?;
        let task = NewTask::new("Write report", 120)
            .with_tags(json!({"priority": "high"}))
            .into_task()?;
        store.create_task(&task)?;
        task.id
    };

    let store = TaskStore::open(&db_path)?;
    let loaded = store.get_task(&id)?.ok_or_else(|| ChunkdError::NotFound(id.clone()))?;
    assert_eq!(serde_json::Value::Object(loaded.tags), json!({"priority": "high"}));

    Ok(())
}
