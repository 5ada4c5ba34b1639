//! Completed-session projection consumed by the difficulty advisor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable summary of a completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub participant_id: String,
    pub scenario: String,
    pub score: u8,
    pub points: u32,
    pub exchange_count: u32,
    /// Difficulty the session was played at.
    pub difficulty_level: f64,
    /// Topic mastery at the time of the session, when known.
    pub mastery_percent: Option<f64>,
    pub completed_at: DateTime<Utc>,
}
