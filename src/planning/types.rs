//! Planning request and reply types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A free calendar interval, as ISO-8601 strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: String,
    pub end: String,
}

/// An event that does not exist yet, for what-if simulation
pub type HypotheticalEvent = Slot;

/// Suitability of one chunk for one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotScore {
    pub slot_index: usize,
    pub chunk_index: usize,
    /// 1 (poor) to 10 (ideal)
    pub score: u8,
}

/// Chunk placed into a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub chunk_index: usize,
    pub slot_index: usize,
}

/// Chunk that changes slot in a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub chunk_index: usize,
    #[serde(default)]
    pub from_slot: Option<usize>,
    #[serde(default)]
    pub to_slot: Option<usize>,
}

/// Schedule changes caused by a hypothetical event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationDiff {
    #[serde(default)]
    pub moved: Vec<Move>,
    /// Chunks that no longer fit anywhere
    #[serde(default)]
    pub unassigned: Vec<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreRequest {
    pub slots: Vec<Slot>,
    pub chunks: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RebalanceRequest {
    pub slots: Vec<Slot>,
    pub chunks: Vec<Value>,
    #[serde(default)]
    pub scores: Vec<SlotScore>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateRequest {
    pub slots: Vec<Slot>,
    pub chunks: Vec<Value>,
    #[serde(default)]
    pub scores: Vec<SlotScore>,
    pub hypothetical_event: HypotheticalEvent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummaryRequest {
    pub schedule: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsightsRequest {
    pub stats: serde_json::Map<String, Value>,
}

/// Plain-text reply of the summary and insights routes
#[derive(Debug, Clone, Serialize)]
pub struct TextReply {
    pub text: String,
}
