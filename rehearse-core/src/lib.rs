//! rehearse-core: practice session engine for conversation coaching
//!
//! This crate runs a learner through a practice conversation with a dialogue
//! partner and keeps score along the way:
//!
//! - **Session lifecycle** - [`PracticeSessionManager`] with `start`, `continue_session` and `end`
//! - **Phase engine** - [`PhaseEngine`] moving sessions through intro, practice, feedback, complete
//! - **Metrics and scoring** - [`MetricsAggregator`] and [`PerformanceScorer`]
//! - **Difficulty advice** - [`DifficultyAdvisor`] over recent [`SessionSummary`] values
//! - **Collaborators** - [`DialogueGenerator`], [`SessionStore`] and [`EventBus`] traits
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rehearse_core::{
//!     EngineConfig, MemoryEventBus, MemorySessionStore, MockGenerator, PracticeSessionManager,
//!     StartOptions, TurnOptions,
//! };
//!
//! async fn example() -> Result<(), rehearse_core::SessionError> {
//!     let manager = PracticeSessionManager::new(
//!         Arc::new(MemorySessionStore::new()),
//!         Arc::new(MockGenerator::always("Nice! Tell me more.")),
//!         Arc::new(MemoryEventBus::default()),
//!         EngineConfig::default(),
//!     );
//!
//!     let started = manager
//!         .start("learner-1", "3-5", "making a new friend", StartOptions::default())
//!         .await?;
//!     let turn = manager
//!         .continue_session(&started.session_id, "Hi, I'm Sam!", TurnOptions::default())
//!         .await?;
//!     println!("{} ({})", turn.response, turn.phase);
//!
//!     let ended = manager.end(&started.session_id).await?;
//!     println!("score {}", ended.summary.score);
//!     Ok(())
//! }
//! ```

pub mod advisor;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod events;
pub mod session;
pub mod store;

// Re-export key types for convenience
pub use advisor::{AdjustmentReason, DifficultyAdvisor, DifficultyRecommendation};
pub use config::{ConcurrencyPolicy, EngineConfig};
pub use dialogue::{
    DialogueContext, DialogueGenerator, FeedbackParse, GradeBand, MockGenerator,
    SlowMockGenerator, StructuredFeedback, UtterancePurpose,
};
pub use error::{GenerationError, SessionError, StoreError};
pub use events::{EventBus, EventSeq, MemoryEventBus, SessionEvent};
pub use session::{
    EndOutcome, Metrics, MetricsAggregator, Performance, PerformanceScorer, Phase, PhaseEngine,
    PhaseTransition, PracticeSessionManager, Role, SessionRecord, SessionSummary, StartOptions,
    StartOutcome, TransitionReason, Turn, TurnFlags, TurnOptions, TurnOutcome,
};
pub use store::{JsonFileStore, MemorySessionStore, SessionStore};
