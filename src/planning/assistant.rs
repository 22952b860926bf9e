//! PlanningAssistant - scheduling helpers backed by the generator
//!
//! Every operation renders one prompt, calls the model configured for its
//! role, and checks the reply. There is no fallback here; failures surface
//! to the caller.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};

use crate::config::LlmConfig;
use crate::error::{ChunkdError, Result};
use crate::llm::{GenerationRequest, Generator, ModelRole};
use crate::normalize::normalize_as;
use crate::planning::types::{Assignment, HypotheticalEvent, SimulationDiff, Slot, SlotScore};
use crate::prompt::Prompts;

const MIN_SCORE: u8 = 1;
const MAX_SCORE: u8 = 10;

pub struct PlanningAssistant {
    generator: Arc<dyn Generator>,
    prompts: Arc<Prompts>,
    llm: LlmConfig,
}

impl PlanningAssistant {
    pub fn new(generator: Arc<dyn Generator>, prompts: Arc<Prompts>, llm: LlmConfig) -> Self {
        Self { generator, prompts, llm }
    }

    /// Score every slot-chunk pair from 1 to 10
    pub async fn score_slots(&self, slots: &[Slot], chunks: &[Value]) -> Result<Vec<SlotScore>> {
        let context = json!({
            "slots_json": pretty(slots)?,
            "chunks_json": pretty(chunks)?,
        });
        let text = self.call(ModelRole::Score, "score_slots", &context).await?;
        let scores: Vec<SlotScore> = normalize_as(&text)?;

        for s in &scores {
            if !(MIN_SCORE..=MAX_SCORE).contains(&s.score) {
                return Err(ChunkdError::ShapeMismatch(format!(
                    "score {} for slot {} / chunk {} is outside {}-{}",
                    s.score, s.slot_index, s.chunk_index, MIN_SCORE, MAX_SCORE
                )));
            }
            check_index("slot", s.slot_index, slots.len())?;
            check_index("chunk", s.chunk_index, chunks.len())?;
        }
        Ok(scores)
    }

    /// Assign chunks to slots, maximizing total score
    pub async fn rebalance(&self, slots: &[Slot], chunks: &[Value], scores: &[SlotScore]) -> Result<Vec<Assignment>> {
        let context = json!({
            "slots_json": pretty(slots)?,
            "chunks_json": pretty(chunks)?,
            "scores_json": pretty(scores)?,
        });
        let text = self.call(ModelRole::Rebalance, "rebalance", &context).await?;
        let assignments: Vec<Assignment> = normalize_as(&text)?;

        for a in &assignments {
            check_index("slot", a.slot_index, slots.len())?;
            check_index("chunk", a.chunk_index, chunks.len())?;
        }
        Ok(assignments)
    }

    /// Diff of the schedule if `event` were added
    pub async fn simulate(
        &self,
        slots: &[Slot],
        chunks: &[Value],
        scores: &[SlotScore],
        event: &HypotheticalEvent,
    ) -> Result<SimulationDiff> {
        let context = json!({
            "event_start": event.start,
            "event_end": event.end,
            "slots_json": pretty(slots)?,
            "chunks_json": pretty(chunks)?,
            "scores_json": pretty(scores)?,
        });
        let text = self.call(ModelRole::Simulate, "simulate", &context).await?;
        let diff: SimulationDiff = normalize_as(&text)?;

        for m in &diff.moved {
            check_index("chunk", m.chunk_index, chunks.len())?;
            for slot in m.from_slot.into_iter().chain(m.to_slot) {
                check_index("slot", slot, slots.len())?;
            }
        }
        for idx in &diff.unassigned {
            check_index("chunk", *idx, chunks.len())?;
        }
        Ok(diff)
    }

    /// Brief summary of tomorrow's schedule
    pub async fn summarize_day(&self, schedule: &[Value]) -> Result<String> {
        let context = json!({ "schedule_json": pretty(schedule)? });
        let text = self.call(ModelRole::Notify, "notify", &context).await?;
        non_empty(text)
    }

    /// Three tips derived from productivity stats
    pub async fn insights(&self, stats: &serde_json::Map<String, Value>) -> Result<String> {
        let context = json!({ "stats_json": pretty(stats)? });
        let text = self.call(ModelRole::Analytics, "analytics", &context).await?;
        non_empty(text)
    }

    async fn call(&self, role: ModelRole, template: &str, context: &Value) -> Result<String> {
        let prompt = self.prompts.render(template, context)?;
        let model = self.llm.models.for_role(role);
        log::info!("Planning call '{}' with {}", role, model);

        let request = GenerationRequest::new(model, prompt)
            .with_temperature(self.llm.temperature)
            .with_max_output_tokens(self.llm.max_output_tokens);
        self.generator.generate(request).await
    }
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn check_index(kind: &str, idx: usize, len: usize) -> Result<()> {
    if idx >= len {
        return Err(ChunkdError::ShapeMismatch(format!(
            "{} index {} out of range ({} given)",
            kind, idx, len
        )));
    }
    Ok(())
}

fn non_empty(text: String) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ChunkdError::MalformedResponse("empty reply".to_string()));
    }
    Ok(trimmed.to_string())
}
