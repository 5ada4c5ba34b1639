//! DialogueGenerator trait and the context handed to it

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::session::phase::Phase;
use crate::session::record::Turn;

/// What the requested utterance is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtterancePurpose {
    /// Opening line of a new session
    Greeting,
    /// Response to a learner turn
    Reply,
    /// Closing line once the session is complete
    WrapUp,
}

/// Everything a generator may use to produce the next partner turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueContext {
    pub session_id: String,
    /// Most recent turns, oldest first.
    pub history: Vec<Turn>,
    pub phase: Phase,
    pub difficulty_level: f64,
    pub scenario: String,
    pub scenario_details: Option<String>,
    pub grade_band: String,
    pub purpose: UtterancePurpose,
}

/// Produces partner utterances.
///
/// Implementations may be slow or fail; the session manager bounds every
/// call with a timeout and substitutes scripted text on error.
#[async_trait]
pub trait DialogueGenerator: Send + Sync {
    async fn generate(&self, context: &DialogueContext) -> Result<String, GenerationError>;

    /// Short name for logs
    fn name(&self) -> &str {
        "generator"
    }
}
