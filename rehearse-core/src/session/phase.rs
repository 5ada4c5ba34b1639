//! Phase transition engine
//!
//! A session moves through `intro → practice → feedback → complete`, never
//! backwards. After every learner turn the engine is asked whether the
//! current phase is finished:
//!
//! ```text
//! ┌───────┐ min met ┌──────────┐ max reached / ┌──────────┐ min met +  ┌──────────┐
//! │ intro │ ──────► │ practice │ ─────────────►│ feedback │ ─────────► │ complete │
//! └───────┘         └──────────┘ strong score  └──────────┘ delivered  └──────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{PhaseConfig, PhaseRule};
use crate::error::SessionError;

/// Stage of a practice session. Declaration order is the lifecycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Intro,
    Practice,
    Feedback,
    Complete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intro => "intro",
            Self::Practice => "practice",
            Self::Feedback => "feedback",
            Self::Complete => "complete",
        }
    }

    /// The phase that follows this one, `None` for `Complete`.
    pub fn next(&self) -> Option<Phase> {
        match self {
            Self::Intro => Some(Self::Practice),
            Self::Practice => Some(Self::Feedback),
            Self::Feedback => Some(Self::Complete),
            Self::Complete => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Phase {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intro" => Ok(Self::Intro),
            "practice" => Ok(Self::Practice),
            "feedback" => Ok(Self::Feedback),
            "complete" => Ok(Self::Complete),
            other => Err(SessionError::Configuration(format!(
                "unknown phase '{}'",
                other
            ))),
        }
    }
}

/// Why a phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionReason {
    MinExchangesMet,
    MaxExchangesReached,
    StrongPerformance,
    FeedbackDelivered,
    /// The session was ended explicitly.
    Ended,
}

impl TransitionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MinExchangesMet => "min exchanges met",
            Self::MaxExchangesReached => "max exchanges reached",
            Self::StrongPerformance => "early exit on strong performance",
            Self::FeedbackDelivered => "feedback delivered",
            Self::Ended => "session ended",
        }
    }
}

impl fmt::Display for TransitionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A decided phase change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
    pub reason: TransitionReason,
}

/// Inputs the engine decides on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionInput {
    pub phase: Phase,
    pub exchange_count: u32,
    /// Current performance score, consulted for the practice early exit.
    pub score: u8,
    /// At least one partner turn tagged `feedback` exists.
    pub feedback_delivered: bool,
}

/// Decides when a session moves to its next phase.
#[derive(Debug, Clone, Default)]
pub struct PhaseEngine {
    config: PhaseConfig,
}

impl PhaseEngine {
    pub fn new(config: PhaseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PhaseConfig {
        &self.config
    }

    /// Evaluate the rules for the current phase.
    ///
    /// Returns `Ok(None)` when the session stays where it is. Fails with
    /// `Configuration` when the thresholds for the phase are unusable.
    pub fn evaluate(
        &self,
        input: TransitionInput,
    ) -> Result<Option<PhaseTransition>, SessionError> {
        let Some(rule) = self.config.rule(input.phase) else {
            return Ok(None);
        };
        validate_rule(input.phase, rule)?;

        let count = input.exchange_count;
        let reason = match input.phase {
            Phase::Intro if count >= rule.min_exchanges => {
                Some(TransitionReason::MinExchangesMet)
            }
            Phase::Practice if count >= rule.max_exchanges => {
                Some(TransitionReason::MaxExchangesReached)
            }
            Phase::Practice
                if count >= rule.min_exchanges && input.score > self.config.early_exit_score =>
            {
                Some(TransitionReason::StrongPerformance)
            }
            Phase::Feedback if count >= rule.min_exchanges && input.feedback_delivered => {
                Some(TransitionReason::FeedbackDelivered)
            }
            _ => None,
        };

        Ok(reason.and_then(|reason| {
            input.phase.next().map(|to| PhaseTransition {
                from: input.phase,
                to,
                reason,
            })
        }))
    }

    /// Transition straight to `Complete`, used when a session is ended early.
    pub fn force_complete(&self, phase: Phase) -> Option<PhaseTransition> {
        if phase.is_terminal() {
            return None;
        }
        Some(PhaseTransition {
            from: phase,
            to: Phase::Complete,
            reason: TransitionReason::Ended,
        })
    }
}

fn validate_rule(phase: Phase, rule: PhaseRule) -> Result<(), SessionError> {
    if rule.max_exchanges == 0 || rule.min_exchanges > rule.max_exchanges {
        return Err(SessionError::Configuration(format!(
            "phase {} has unusable thresholds: min {} max {}",
            phase, rule.min_exchanges, rule.max_exchanges
        )));
    }
    Ok(())
}
