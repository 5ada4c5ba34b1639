//! Slow generator for concurrency, timeout and cancellation tests
//!
//! Wraps [`MockGenerator`] and sleeps before every call.

use std::time::Duration;

use async_trait::async_trait;

use super::mock::MockGenerator;
use super::traits::{DialogueContext, DialogueGenerator};
use crate::error::GenerationError;

pub struct SlowMockGenerator {
    inner: MockGenerator,
    delay: Duration,
}

impl SlowMockGenerator {
    pub fn new(delay: Duration, inner: MockGenerator) -> Self {
        Self { inner, delay }
    }

    /// Slow generator answering every request with `reply`
    pub fn always(delay: Duration, reply: impl Into<String>) -> Self {
        Self::new(delay, MockGenerator::always(reply))
    }

    pub fn inner(&self) -> &MockGenerator {
        &self.inner
    }
}

#[async_trait]
impl DialogueGenerator for SlowMockGenerator {
    async fn generate(&self, context: &DialogueContext) -> Result<String, GenerationError> {
        tokio::time::sleep(self.delay).await;
        self.inner.generate(context).await
    }

    fn name(&self) -> &str {
        "slow-mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::mock::test_support::context;
    use crate::dialogue::traits::UtterancePurpose;

    #[tokio::test(start_paused = true)]
    async fn generate_waits_for_configured_delay() {
        let generator = SlowMockGenerator::always(Duration::from_secs(3), "hello");
        let start = tokio::time::Instant::now();

        let reply = generator
            .generate(&context(UtterancePurpose::Greeting))
            .await
            .unwrap();

        assert_eq!(reply, "hello");
        assert!(start.elapsed() >= Duration::from_secs(3));
    }
}
