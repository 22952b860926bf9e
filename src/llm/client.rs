//! Generator trait and a scripted implementation for tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ChunkdError, Result};
use crate::llm::types::GenerationRequest;

/// Stateless text generator - each call is independent
#[async_trait]
pub trait Generator: Send + Sync {
    /// Run one generation and return the first candidate's text
    async fn generate(&self, request: GenerationRequest) -> Result<String>;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// A scripted reply for `MockGenerator`
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Fail(String),
}

/// Deterministic generator that replays scripted replies and records requests
#[derive(Debug, Default)]
pub struct MockGenerator {
    replies: Mutex<VecDeque<MockReply>>,
    repeat: Option<MockReply>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerator {
    /// Replies returned in order; further calls fail
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    /// Always answer with the same text
    pub fn always(text: impl Into<String>) -> Self {
        Self {
            repeat: Some(MockReply::Text(text.into())),
            ..Default::default()
        }
    }

    /// Always fail with an upstream error
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            repeat: Some(MockReply::Fail(message.into())),
            ..Default::default()
        }
    }

    /// Number of generate calls so far
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Every request received, in order
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let next = self
            .replies
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .or_else(|| self.repeat.clone());

        match next {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fail(message)) => Err(ChunkdError::Upstream(message)),
            None => Err(ChunkdError::Upstream("mock generator has no scripted reply".to_string())),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
