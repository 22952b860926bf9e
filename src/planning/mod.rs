//! Planning assistant: slot scoring, rebalancing, simulation, summaries

mod assistant;
pub mod types;

pub use assistant::PlanningAssistant;
pub use types::{Assignment, HypotheticalEvent, Move, SimulationDiff, Slot, SlotScore};
