//! Scripted partner that works without a model

use async_trait::async_trait;
use rehearse_core::dialogue::fallback_line;
use rehearse_core::{DialogueContext, DialogueGenerator, GenerationError, GradeBand};

/// Answers every request with the scripted line for its phase and grade band.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineGenerator;

impl OfflineGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DialogueGenerator for OfflineGenerator {
    async fn generate(&self, context: &DialogueContext) -> Result<String, GenerationError> {
        let band = GradeBand::classify(&context.grade_band);
        Ok(fallback_line(context.phase, band, context.purpose).to_string())
    }

    fn name(&self) -> &str {
        "offline"
    }
}
