//! Practice session lifecycle

pub mod manager;
pub mod metrics;
pub mod phase;
pub mod record;
pub mod scoring;
pub mod summary;

// Re-export key types for convenience
pub use manager::{
    EndOutcome, PracticeSessionManager, StartOptions, StartOutcome, TurnOptions, TurnOutcome,
};
pub use metrics::{LearnerSample, Metrics, MetricsAggregator, TurnFlags, count_words};
pub use phase::{Phase, PhaseEngine, PhaseTransition, TransitionInput, TransitionReason};
pub use record::{NewSession, Role, SessionRecord, Turn};
pub use scoring::{Performance, PerformanceScorer};
pub use summary::SessionSummary;
