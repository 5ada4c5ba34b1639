//! Dialogue partner abstraction
//!
//! The engine never produces conversational text itself. It asks a
//! [`DialogueGenerator`] and falls back to scripted lines when the generator
//! fails, times out, or returns nothing.

pub mod fallback;
pub mod feedback;
pub mod mock;
pub mod slow_mock;
pub mod traits;

// Re-export key types for convenience
pub use fallback::{GradeBand, fallback_line};
pub use feedback::{FeedbackParse, StructuredFeedback, parse_feedback};
pub use mock::MockGenerator;
pub use slow_mock::SlowMockGenerator;
pub use traits::{DialogueContext, DialogueGenerator, UtterancePurpose};
