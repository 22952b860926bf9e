//! TaskDecomposer - generator-driven splitting of Tasks into Chunks
//!
//! Asks the chunk model to break each task into parts no longer than the
//! configured chunk size, checks the reply against the requested shape, and
//! reports the outcome explicitly. When generation fails and fallback is
//! enabled, every task gets one full-length chunk instead.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value, json};

use crate::config::DecomposeConfig;
use crate::domain::{CandidateChunk, Tags, Task};
use crate::error::{ChunkdError, Result};
use crate::llm::{GenerationRequest, Generator};
use crate::normalize::normalize_as;
use crate::prompt::Prompts;

/// Result of decomposing a batch of tasks
#[derive(Debug, Clone, PartialEq)]
pub enum Decomposition {
    /// Model output accepted
    Decomposed {
        chunks: Vec<CandidateChunk>,
        /// Tasks whose chunk durations do not add up to the estimate
        warnings: Vec<String>,
    },
    /// Some or all chunks are full-length fallbacks
    Degraded { chunks: Vec<CandidateChunk>, reason: String },
    /// Generation failed and fallback is disabled
    Failed { reason: String },
}

impl Decomposition {
    /// Candidate chunks to persist; empty for `Failed`
    pub fn chunks(&self) -> &[CandidateChunk] {
        match self {
            Decomposition::Decomposed { chunks, .. } | Decomposition::Degraded { chunks, .. } => chunks,
            Decomposition::Failed { .. } => &[],
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Decomposition::Degraded { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Decomposition::Failed { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Decomposition::Decomposed { .. } => None,
            Decomposition::Degraded { reason, .. } | Decomposition::Failed { reason } => Some(reason),
        }
    }

    pub fn warnings(&self) -> &[String] {
        match self {
            Decomposition::Decomposed { warnings, .. } => warnings,
            _ => &[],
        }
    }
}

/// What the model is shown for each task
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskPrompt<'a> {
    id: &'a str,
    title: &'a str,
    estimate: u32,
    chunk_size: u32,
}

/// What the model returns for each chunk
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChunkOutput {
    #[serde(default)]
    task_id: Option<String>,
    title: String,
    duration: Number,
    #[serde(default)]
    tags: Option<Value>,
}

/// TaskDecomposer breaks Tasks into Chunks
pub struct TaskDecomposer {
    generator: Arc<dyn Generator>,
    prompts: Arc<Prompts>,
    config: DecomposeConfig,
    model: String,
}

impl TaskDecomposer {
    pub fn new(
        generator: Arc<dyn Generator>,
        prompts: Arc<Prompts>,
        config: DecomposeConfig,
        model: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            prompts,
            config,
            model: model.into(),
        }
    }

    /// Decompose a non-empty batch of tasks
    pub async fn decompose(&self, tasks: &[Task]) -> Result<Decomposition> {
        if tasks.is_empty() {
            return Err(ChunkdError::Validation("no tasks to decompose".to_string()));
        }

        log::info!(
            "Decomposing {} task(s) with {} via {}",
            tasks.len(),
            self.model,
            self.generator.name()
        );

        let chunks = match self.request_chunks(tasks).await {
            Ok(chunks) => chunks,
            Err(e) if e.is_upstream() => {
                log::warn!("Decomposition failed: {}", e);
                return Ok(self.fall_back(tasks, None, e.to_string()));
            }
            Err(e) => return Err(e),
        };

        let covered: HashSet<&str> = chunks.iter().map(|c| c.task_id.as_str()).collect();
        let omitted: Vec<&Task> = tasks.iter().filter(|t| !covered.contains(t.id.as_str())).collect();

        if !omitted.is_empty() {
            let ids: Vec<&str> = omitted.iter().map(|t| t.id.as_str()).collect();
            let reason = format!("model returned no chunks for: {}", ids.join(", "));
            log::warn!("{}", reason);
            return Ok(self.fall_back(&omitted.into_iter().cloned().collect::<Vec<_>>(), Some(chunks), reason));
        }

        let warnings = duration_warnings(tasks, &chunks);
        for warning in &warnings {
            log::warn!("{}", warning);
        }

        log::info!("Decomposed {} task(s) into {} chunk(s)", tasks.len(), chunks.len());
        Ok(Decomposition::Decomposed { chunks, warnings })
    }

    /// Render the prompt, call the generator and resolve the reply
    async fn request_chunks(&self, tasks: &[Task]) -> Result<Vec<CandidateChunk>> {
        let prompt = self.build_prompt(tasks)?;
        let request = GenerationRequest::new(&self.model, prompt)
            .with_temperature(self.config.temperature)
            .with_max_output_tokens(self.config.max_output_tokens);

        let text = self.generator.generate(request).await?;
        log::debug!("Decomposition reply: {}", text);

        let outputs: Vec<ChunkOutput> = normalize_as(&text)?;
        resolve_chunks(tasks, outputs)
    }

    fn build_prompt(&self, tasks: &[Task]) -> Result<String> {
        let records: Vec<TaskPrompt> = tasks
            .iter()
            .map(|t| TaskPrompt {
                id: &t.id,
                title: &t.title,
                estimate: t.estimate,
                chunk_size: self.config.chunk_size_minutes,
            })
            .collect();

        let tasks_json = serde_json::to_string_pretty(&records)?;
        self.prompts.render("chunk_tasks", &json!({ "tasks_json": tasks_json }))
    }

    /// Give every task in `missing` one full-length chunk, after any `accepted` chunks
    fn fall_back(&self, missing: &[Task], accepted: Option<Vec<CandidateChunk>>, reason: String) -> Decomposition {
        if !self.config.fallback {
            return Decomposition::Failed { reason };
        }

        let mut chunks = accepted.unwrap_or_default();
        chunks.extend(missing.iter().map(CandidateChunk::full));
        log::info!("Using {} fallback chunk(s)", missing.len());
        Decomposition::Degraded { chunks, reason }
    }
}

/// Map each model chunk onto the task it belongs to
fn resolve_chunks(tasks: &[Task], outputs: Vec<ChunkOutput>) -> Result<Vec<CandidateChunk>> {
    let by_id: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();
    let by_title: HashMap<&str, &Task> = tasks.iter().map(|t| (t.title.as_str(), t)).collect();

    outputs
        .into_iter()
        .map(|out| -> Result<CandidateChunk> {
            let task = out
                .task_id
                .as_deref()
                .and_then(|id| by_id.get(id))
                .or_else(|| by_title.get(out.title.as_str()))
                .or_else(|| {
                    out.title
                        .rmatch_indices(" - ")
                        .find_map(|(idx, _)| by_title.get(&out.title[..idx]))
                })
                .ok_or_else(|| ChunkdError::ShapeMismatch(format!("chunk '{}' matches no task", out.title)))?;

            let duration = whole_minutes(&out.duration).ok_or_else(|| {
                ChunkdError::ShapeMismatch(format!("chunk '{}' has invalid duration {}", out.title, out.duration))
            })?;

            let tags = match out.tags {
                Some(Value::Object(map)) => map,
                _ => Tags::new(),
            };

            Ok(CandidateChunk {
                task_id: task.id.clone(),
                title: out.title,
                duration,
                tags,
            })
        })
        .collect()
}

/// A positive whole number of minutes; `60` and `60.0` both count
fn whole_minutes(n: &Number) -> Option<u32> {
    let minutes = match n.as_u64() {
        Some(m) => m,
        None => {
            let f = n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX))?;
            f as u64
        }
    };
    u32::try_from(minutes).ok().filter(|m| *m > 0)
}

fn duration_warnings(tasks: &[Task], chunks: &[CandidateChunk]) -> Vec<String> {
    tasks
        .iter()
        .filter_map(|task| {
            let total: u64 = chunks
                .iter()
                .filter(|c| c.task_id == task.id)
                .map(|c| u64::from(c.duration))
                .sum();
            (total != u64::from(task.estimate)).then(|| {
                format!(
                    "chunks for task {} total {} minutes, estimate is {}",
                    task.id, total, task.estimate
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewTask;
    use crate::llm::{MockGenerator, MockReply};

    fn task(title: &str, estimate: i64) -> Task {
        NewTask::new(title, estimate).into_task().unwrap()
    }

    fn decomposer(generator: Arc<MockGenerator>, fallback: bool) -> TaskDecomposer {
        let config = DecomposeConfig {
            fallback,
            ..Default::default()
        };
        TaskDecomposer::new(generator, Arc::new(Prompts::default()), config, "gemini-test")
    }

    #[tokio::test]
    async fn test_splits_long_task_into_parts() {
        let t = task("Write report", 120);
        let reply = format!(
            r#"```json
[
  {{"taskId": "{id}", "title": "Write report - Part 1", "duration": 60, "tags": {{}}}},
  {{"taskId": "{id}", "title": "Write report - Part 2", "duration": 60, "tags": {{}}}}
]
```"#,
            id = t.id
        );
        let generator = Arc::new(MockGenerator::always(reply));
        let result = decomposer(generator.clone(), true).decompose(&[t.clone()]).await.unwrap();

        assert!(matches!(result, Decomposition::Decomposed { .. }));
        let chunks = result.chunks();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].title, "Write report - Part 1");
        assert_eq!(chunks[1].title, "Write report - Part 2");
        assert_eq!(chunks.iter().map(|c| c.duration).sum::<u32>(), 120);
        assert!(chunks.iter().all(|c| c.task_id == t.id));
        assert!(result.warnings().is_empty());
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_request_carries_model_and_task_records() {
        let t = task("Email", 30);
        let reply = format!(r#"[{{"taskId": "{}", "title": "Email", "duration": 30}}]"#, t.id);
        let generator = Arc::new(MockGenerator::always(reply));
        decomposer(generator.clone(), true).decompose(&[t.clone()]).await.unwrap();

        let requests = generator.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "gemini-test");
        assert_eq!(requests[0].max_output_tokens, 2048);
        assert!(requests[0].prompt.contains(&t.id));
        assert!(requests[0].prompt.contains("\"chunkSize\": 60"));
    }

    #[tokio::test]
    async fn test_resolves_by_title_when_task_id_missing() {
        let a = task("a", 120);
        let b = task("b", 30);
        let reply = r#"[
            {"title": "a - Part 1", "duration": 60, "tags": {"focus": "deep"}},
            {"title": "a - Part 2", "duration": 60},
            {"title": "b", "duration": 30}
        ]"#;
        let generator = Arc::new(MockGenerator::always(reply));
        let result = decomposer(generator, true)
            .decompose(&[a.clone(), b.clone()])
            .await
            .unwrap();

        let chunks = result.chunks();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.iter().filter(|c| c.task_id == a.id).count(), 2);
        assert_eq!(chunks.iter().filter(|c| c.task_id == b.id).count(), 1);
        assert_eq!(chunks[0].tags.get("focus"), Some(&Value::from("deep")));
        assert!(!result.is_degraded());
    }

    #[tokio::test]
    async fn test_upstream_failure_falls_back() {
        let a = task("a", 120);
        let b = task("b", 30);
        let generator = Arc::new(MockGenerator::failing("503 Service Unavailable"));
        let result = decomposer(generator, true)
            .decompose(&[a.clone(), b.clone()])
            .await
            .unwrap();

        assert!(result.is_degraded());
        assert!(result.reason().unwrap().contains("503"));
        let chunks = result.chunks();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].title, "a - Full");
        assert_eq!(chunks[0].duration, 120);
        assert_eq!(chunks[1].duration, 30);
        assert!(chunks.iter().all(|c| c.tags.is_empty()));
    }

    #[tokio::test]
    async fn test_non_json_reply_falls_back() {
        let t = task("a", 45);
        let generator = Arc::new(MockGenerator::always("I cannot help with that."));
        let result = decomposer(generator, true).decompose(&[t]).await.unwrap();

        assert!(result.is_degraded());
        assert_eq!(result.chunks().len(), 1);
        assert_eq!(result.chunks()[0].duration, 45);
    }

    #[tokio::test]
    async fn test_failure_without_fallback_is_failed() {
        let t = task("a", 45);
        let generator = Arc::new(MockGenerator::always("not json"));
        let result = decomposer(generator, false).decompose(&[t]).await.unwrap();

        assert!(result.is_failed());
        assert!(result.chunks().is_empty());
        assert!(result.reason().is_some());
    }

    #[tokio::test]
    async fn test_unresolvable_chunk_is_shape_mismatch() {
        let t = task("a", 45);
        let generator = Arc::new(MockGenerator::always(r#"[{"title": "zzz", "duration": 45}]"#));
        let result = decomposer(generator, false).decompose(&[t]).await.unwrap();

        assert!(result.reason().unwrap().contains("matches no task"));
    }

    #[tokio::test]
    async fn test_zero_duration_falls_back() {
        let t = task("a", 45);
        let reply = format!(r#"[{{"taskId": "{}", "title": "a", "duration": 0}}]"#, t.id);
        let generator = Arc::new(MockGenerator::always(reply));
        let result = decomposer(generator, true).decompose(&[t]).await.unwrap();

        assert!(result.is_degraded());
        assert_eq!(result.chunks()[0].duration, 45);
    }

    #[tokio::test]
    async fn test_integral_float_duration_accepted() {
        let t = task("a", 60);
        let reply = format!(r#"[{{"taskId": "{}", "title": "a", "duration": 60.0}}]"#, t.id);
        let generator = Arc::new(MockGenerator::always(reply));
        let result = decomposer(generator, false).decompose(&[t]).await.unwrap();

        assert!(!result.is_degraded());
        assert_eq!(result.chunks()[0].duration, 60);
    }

    #[tokio::test]
    async fn test_fractional_duration_rejected() {
        let t = task("a", 60);
        let reply = format!(r#"[{{"taskId": "{}", "title": "a", "duration": 60.5}}]"#, t.id);
        let generator = Arc::new(MockGenerator::always(reply));
        let result = decomposer(generator, false).decompose(&[t]).await.unwrap();

        assert!(matches!(result, Decomposition::Failed { .. }));
        assert!(result.reason().unwrap().contains("invalid duration 60.5"));
    }

    #[test]
    fn test_whole_minutes() {
        let n = |s: &str| serde_json::from_str::<Number>(s).unwrap();
        assert_eq!(whole_minutes(&n("45")), Some(45));
        assert_eq!(whole_minutes(&n("45.0")), Some(45));
        assert_eq!(whole_minutes(&n("0")), None);
        assert_eq!(whole_minutes(&n("-30")), None);
        assert_eq!(whole_minutes(&n("1e12")), None);
        assert_eq!(whole_minutes(&n("29.9")), None);
    }

    #[tokio::test]
    async fn test_omitted_task_gets_fallback_chunk() {
        let a = task("a", 60);
        let b = task("b", 30);
        let reply = format!(r#"[{{"taskId": "{}", "title": "a", "duration": 60}}]"#, a.id);
        let generator = Arc::new(MockGenerator::always(reply));
        let result = decomposer(generator, true)
            .decompose(&[a.clone(), b.clone()])
            .await
            .unwrap();

        assert!(result.is_degraded());
        assert!(result.reason().unwrap().contains(&b.id));
        let chunks = result.chunks();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].title, "a");
        assert_eq!(chunks[1].title, "b - Full");
    }

    #[tokio::test]
    async fn test_duration_mismatch_warns() {
        let t = task("a", 120);
        let reply = format!(r#"[{{"taskId": "{}", "title": "a - Part 1", "duration": 60}}]"#, t.id);
        let generator = Arc::new(MockGenerator::always(reply));
        let result = decomposer(generator, true).decompose(&[t.clone()]).await.unwrap();

        assert!(matches!(result, Decomposition::Decomposed { .. }));
        assert_eq!(result.warnings().len(), 1);
        assert!(result.warnings()[0].contains(&t.id));
    }

    #[tokio::test]
    async fn test_every_task_gets_a_chunk() {
        let tasks: Vec<Task> = (1..=4).map(|i| task(&format!("t{}", i), i * 25)).collect();
        for generator in [MockGenerator::always("[]"), MockGenerator::failing("boom")] {
            let result = decomposer(Arc::new(generator), true).decompose(&tasks).await.unwrap();
            for t in &tasks {
                assert!(result.chunks().iter().any(|c| c.task_id == t.id));
            }
        }
    }

    #[tokio::test]
    async fn test_empty_input_is_validation_error() {
        let generator = Arc::new(MockGenerator::new(vec![MockReply::Text("[]".to_string())]));
        let err = decomposer(generator.clone(), true).decompose(&[]).await.unwrap_err();

        assert!(matches!(err, ChunkdError::Validation(_)));
        assert_eq!(generator.call_count(), 0);
    }
}
