//! Event type definitions

use serde::{Deserialize, Serialize};

use crate::session::phase::{Phase, TransitionReason};
use crate::session::record::Role;

/// Something that happened to a practice session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Started {
        session_id: String,
        participant_id: String,
        scenario: String,
        difficulty_level: f64,
    },
    /// A turn was appended to the history.
    TurnRecorded {
        session_id: String,
        role: Role,
        phase: Phase,
        exchange_count: u32,
    },
    PhaseChanged {
        session_id: String,
        from: Phase,
        to: Phase,
        reason: TransitionReason,
    },
    /// A scripted line stood in for a failed generation.
    Degraded {
        session_id: String,
        phase: Phase,
        cause: String,
    },
    DifficultyApplied {
        session_id: String,
        level: f64,
    },
    Completed {
        session_id: String,
        score: u8,
        points: u32,
    },
}

impl SessionEvent {
    pub fn session_id(&self) -> &str {
        match self {
            Self::Started { session_id, .. }
            | Self::TurnRecorded { session_id, .. }
            | Self::PhaseChanged { session_id, .. }
            | Self::Degraded { session_id, .. }
            | Self::DifficultyApplied { session_id, .. }
            | Self::Completed { session_id, .. } => session_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::TurnRecorded { .. } => "turn_recorded",
            Self::PhaseChanged { .. } => "phase_changed",
            Self::Degraded { .. } => "degraded",
            Self::DifficultyApplied { .. } => "difficulty_applied",
            Self::Completed { .. } => "completed",
        }
    }
}
