//! Generation Layer - Gemini API integration behind a pluggable trait
//!
//! This module provides:
//! - Generator trait for API abstraction, with a scripted MockGenerator
//! - GeminiClient implementation
//! - Versioned response-shape adapters
//! - Request types and per-call-site model roles

pub mod client;
pub mod gemini;
pub mod schema;
pub mod types;

pub use client::{Generator, MockGenerator, MockReply};
pub use gemini::GeminiClient;
pub use schema::ResponseShape;
pub use types::{DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE, GenerationRequest, ModelRole};
