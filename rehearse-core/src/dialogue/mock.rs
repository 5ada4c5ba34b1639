//! Scriptable generator for tests
//!
//! Queue replies or errors with [`MockGenerator::queue_reply`] and
//! [`MockGenerator::queue_error`]; each `generate()` consumes one. When the
//! queue is empty the default reply is used, or an error if none is set.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::traits::{DialogueContext, DialogueGenerator};
use crate::error::GenerationError;

#[derive(Default)]
pub struct MockGenerator {
    queued: Mutex<VecDeque<Result<String, GenerationError>>>,
    default_reply: Option<String>,
    contexts: Mutex<Vec<DialogueContext>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A generator that answers every request with `reply`
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            default_reply: Some(reply.into()),
            ..Self::default()
        }
    }

    /// A generator whose every call fails
    pub fn failing() -> Self {
        Self::default()
    }

    pub async fn queue_reply(&self, reply: impl Into<String>) {
        self.queued.lock().await.push_back(Ok(reply.into()));
    }

    pub async fn queue_error(&self, error: GenerationError) {
        self.queued.lock().await.push_back(Err(error));
    }

    pub async fn queued_count(&self) -> usize {
        self.queued.lock().await.len()
    }

    /// Every context passed to `generate()`, in call order
    pub async fn contexts(&self) -> Vec<DialogueContext> {
        self.contexts.lock().await.clone()
    }
}

#[async_trait]
impl DialogueGenerator for MockGenerator {
    async fn generate(&self, context: &DialogueContext) -> Result<String, GenerationError> {
        self.contexts.lock().await.push(context.clone());

        if let Some(next) = self.queued.lock().await.pop_front() {
            return next;
        }
        self.default_reply
            .clone()
            .ok_or_else(|| GenerationError::Failed("no queued reply in MockGenerator".to_string()))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
