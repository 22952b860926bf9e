//! Embedded prompt templates
//!
//! These are compiled into the binary and used when no template file with the
//! same name exists in the configured prompts directory.

/// Split tasks into bounded chunks
pub const CHUNK_TASKS: &str = r#"Break these tasks into sub-tasks no longer than each task's chunkSize minutes.

Rules:
- A task whose estimate exceeds its chunkSize becomes consecutive parts titled "<title> - Part N", N starting at 1.
- A task that fits within its chunkSize stays a single part titled with the task title.
- The durations of one task's parts must add up to that task's estimate.
- Copy the task's id into the taskId field of every part.

Input JSON:
{{tasks_json}}

Output ONLY a JSON array of { "taskId", "title", "duration", "tags" } with no other text.
"#;

/// Score every slot-chunk pair
pub const SCORE_SLOTS: &str = r#"We have these free time slots and these task chunks with tags:
Slots: {{slots_json}}
Chunks: {{chunks_json}}

For each slot-chunk pair, assign a suitability score 1-10.
Output ONLY a JSON array of { "slotIndex", "chunkIndex", "score" } with no other text.
"#;

/// Assign chunks to slots
pub const REBALANCE: &str = r#"Optimize the upcoming week: assign each task chunk to a free slot to maximize total score.
Constraints: no overlaps, deadlines must be met, dependencies respected.

Input:
  Slots: {{slots_json}}
  Chunks: {{chunks_json}}
  Scores: {{scores_json}}

Output ONLY a JSON array of { "chunkIndex", "slotIndex" } with no other text.
"#;

/// Recompute the schedule around a hypothetical event
pub const SIMULATE: &str = r#"Simulate adding a hypothetical event ({{event_start}} to {{event_end}}).

Given:
  Current Slots: {{slots_json}}
  Chunks: {{chunks_json}}
  Scores: {{scores_json}}

Recompute the schedule and output ONLY the diff as JSON:
{ "moved": [{ "chunkIndex", "fromSlot", "toSlot" }], "unassigned": [chunkIndex] }
"#;

/// Plain-text summary of tomorrow's schedule
pub const NOTIFY: &str = r#"Summarize the schedule for tomorrow:
{{schedule_json}}

Draft a brief, actionable summary.
"#;

/// Plain-text productivity insights
pub const ANALYTICS: &str = r#"Here are your productivity stats:
{{stats_json}}

Provide 3 insights or tips based on these metrics.
"#;

/// Names of every embedded template
pub const TEMPLATE_NAMES: &[&str] = &["chunk_tasks", "score_slots", "rebalance", "simulate", "notify", "analytics"];

/// Look up an embedded template by name
pub fn embedded(name: &str) -> Option<&'static str> {
    match name {
        "chunk_tasks" => Some(CHUNK_TASKS),
        "score_slots" => Some(SCORE_SLOTS),
        "rebalance" => Some(REBALANCE),
        "simulate" => Some(SIMULATE),
        "notify" => Some(NOTIFY),
        "analytics" => Some(ANALYTICS),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_name_resolves() {
        for name in TEMPLATE_NAMES {
            assert!(embedded(name).is_some(), "missing template {}", name);
        }
        assert!(embedded("nope").is_none());
    }

    #[test]
    fn test_chunk_template_mentions_contract() {
        assert!(CHUNK_TASKS.contains("Part N"));
        assert!(CHUNK_TASKS.contains("taskId"));
        assert!(CHUNK_TASKS.contains("{{tasks_json}}"));
    }
}
