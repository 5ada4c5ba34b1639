//! Session record and its reducers
//!
//! A [`SessionRecord`] is never edited in place by callers. Each reducer
//! consumes the record and returns the next one, so a rejected update leaves
//! the caller holding nothing half-applied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;

use super::metrics::{LearnerSample, Metrics, MetricsAggregator, TurnFlags};
use super::phase::{Phase, PhaseTransition};
use super::scoring::Performance;
use super::summary::SessionSummary;

/// Lowest and highest difficulty a session can run at.
pub const MIN_DIFFICULTY: f64 = 1.0;
pub const MAX_DIFFICULTY: f64 = 5.0;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Learner,
    Partner,
}

/// One utterance in the session history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Phase the session was in when the turn was created.
    pub phase: Phase,
    pub exchange_number: u32,
    /// Learner turns only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<u32>,
    /// Learner turns only, and only when a valid sample was given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_latency_ms: Option<u64>,
}

/// Fields required to create a session.
#[derive(Debug, Clone, Default)]
pub struct NewSession {
    pub participant_id: String,
    pub grade_band: String,
    pub scenario: String,
    pub scenario_details: Option<String>,
    pub difficulty_level: Option<f64>,
    pub mastery_percent: Option<f64>,
}

/// The authoritative state of one practice session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    session_id: String,
    participant_id: String,
    grade_band: String,
    scenario: String,
    scenario_details: Option<String>,
    phase: Phase,
    difficulty_level: f64,
    mastery_percent: Option<f64>,
    turn_history: Vec<Turn>,
    exchange_count: u32,
    metrics: Metrics,
    performance: Performance,
    transitions: Vec<PhaseTransition>,
    summary: Option<SessionSummary>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    is_active: bool,
    /// Set when an internal inconsistency took the session out of service.
    #[serde(default)]
    unusable_reason: Option<String>,
    /// Incremented on every save; used for optimistic conflict detection.
    revision: u64,
}

impl SessionRecord {
    /// Create a record in `intro` with a fresh identifier.
    pub fn new(params: NewSession, now: DateTime<Utc>) -> Result<Self, SessionError> {
        require_field("participant_id", &params.participant_id)?;
        require_field("grade_band", &params.grade_band)?;
        require_field("scenario", &params.scenario)?;

        let difficulty_level = match params.difficulty_level {
            Some(level) => validate_difficulty(level)?,
            None => MIN_DIFFICULTY,
        };
        let mastery_percent = params
            .mastery_percent
            .filter(|m| m.is_finite())
            .map(|m| m.clamp(0.0, 100.0));

        Ok(Self {
            session_id: Uuid::new_v4().to_string(),
            participant_id: params.participant_id,
            grade_band: params.grade_band,
            scenario: params.scenario,
            scenario_details: params.scenario_details,
            phase: Phase::Intro,
            difficulty_level,
            mastery_percent,
            turn_history: Vec::new(),
            exchange_count: 0,
            metrics: Metrics::new(),
            performance: Performance::default(),
            transitions: Vec::new(),
            summary: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
            is_active: false,
            unusable_reason: None,
            revision: 0,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    pub fn grade_band(&self) -> &str {
        &self.grade_band
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn scenario_details(&self) -> Option<&str> {
        self.scenario_details.as_deref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn difficulty_level(&self) -> f64 {
        self.difficulty_level
    }

    pub fn mastery_percent(&self) -> Option<f64> {
        self.mastery_percent
    }

    pub fn turn_history(&self) -> &[Turn] {
        &self.turn_history
    }

    /// The last `n` turns, oldest first.
    pub fn recent_turns(&self, n: usize) -> &[Turn] {
        let start = self.turn_history.len().saturating_sub(n);
        &self.turn_history[start..]
    }

    pub fn exchange_count(&self) -> u32 {
        self.exchange_count
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn performance(&self) -> Performance {
        self.performance
    }

    /// Phase changes in the order they happened.
    pub fn transitions(&self) -> &[PhaseTransition] {
        &self.transitions
    }

    /// Set once, when the session completes.
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_complete(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn unusable_reason(&self) -> Option<&str> {
        self.unusable_reason.as_deref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether a partner turn was produced during `feedback`.
    pub fn feedback_delivered(&self) -> bool {
        self.turn_history
            .iter()
            .any(|t| t.role == Role::Partner && t.phase == Phase::Feedback)
    }

    /// Whether the closing partner turn has been appended.
    pub fn has_wrap_up(&self) -> bool {
        self.turn_history
            .iter()
            .any(|t| t.role == Role::Partner && t.phase == Phase::Complete)
    }

    /// Mark the session as running.
    pub fn start(mut self, now: DateTime<Utc>) -> Self {
        if self.started_at.is_none() && !self.is_complete() {
            self.started_at = Some(now);
            self.is_active = true;
            self.updated_at = now;
        }
        self
    }

    /// Append a learner turn and feed it through the metrics aggregator.
    pub fn apply_learner_turn(
        mut self,
        aggregator: &MetricsAggregator,
        content: &str,
        latency_ms: Option<f64>,
        flags: TurnFlags,
        now: DateTime<Utc>,
    ) -> Result<(Self, LearnerSample), SessionError> {
        if self.is_complete() {
            return Err(SessionError::InvalidInput(format!(
                "session {} is complete",
                self.session_id
            )));
        }
        if !self.is_active {
            return Err(SessionError::InvalidInput(format!(
                "session {} has not been started",
                self.session_id
            )));
        }

        let sample = aggregator.record_learner_turn(&mut self.metrics, content, latency_ms, flags)?;
        self.exchange_count += 1;
        self.turn_history.push(Turn {
            role: Role::Learner,
            content: content.trim().to_string(),
            timestamp: now,
            phase: self.phase,
            exchange_number: self.exchange_count,
            word_count: Some(sample.word_count),
            response_latency_ms: sample.latency_ms,
        });
        self.updated_at = now;
        Ok((self, sample))
    }

    /// Append a partner turn tagged with the current phase.
    ///
    /// A complete session accepts exactly one partner turn, the wrap-up.
    pub fn apply_partner_turn(
        mut self,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(SessionError::InvalidInput(
                "partner turn content must not be empty".to_string(),
            ));
        }
        if self.is_complete() && self.has_wrap_up() {
            return Err(SessionError::InvalidInput(format!(
                "session {} is complete",
                self.session_id
            )));
        }

        self.turn_history.push(Turn {
            role: Role::Partner,
            content: content.to_string(),
            timestamp: now,
            phase: self.phase,
            exchange_number: self.exchange_count,
            word_count: None,
            response_latency_ms: None,
        });
        self.updated_at = now;
        Ok(self)
    }

    /// Store the latest score and points. Frozen once complete.
    pub fn apply_score(mut self, performance: Performance) -> Self {
        if !self.is_complete() {
            self.performance = performance;
        }
        self
    }

    /// Move to a later phase. Entering `complete` seals the record.
    pub fn apply_transition(
        mut self,
        transition: PhaseTransition,
        now: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if transition.from != self.phase || transition.to <= transition.from {
            return Err(SessionError::Configuration(format!(
                "invalid transition {} -> {} for session {} in {}",
                transition.from, transition.to, self.session_id, self.phase
            )));
        }

        self.phase = transition.to;
        self.transitions.push(transition);
        self.updated_at = now;

        if self.phase == Phase::Complete {
            self.completed_at = Some(now);
            self.is_active = false;
            self.summary = Some(self.project_summary(now));
        }
        Ok(self)
    }

    /// Change the active difficulty for the remaining turns.
    pub fn apply_difficulty(mut self, level: f64, now: DateTime<Utc>) -> Result<Self, SessionError> {
        if self.is_complete() {
            return Err(SessionError::InvalidInput(format!(
                "session {} is complete",
                self.session_id
            )));
        }
        self.difficulty_level = validate_difficulty(level)?;
        self.updated_at = now;
        Ok(self)
    }

    /// Take the session out of service. Later mutations are refused.
    pub fn mark_unusable(mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Self {
        self.unusable_reason = Some(reason.into());
        self.is_active = false;
        self.updated_at = now;
        self
    }

    /// Advance the revision ahead of a save.
    pub fn next_revision(mut self) -> Self {
        self.revision += 1;
        self
    }

    fn project_summary(&self, completed_at: DateTime<Utc>) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            participant_id: self.participant_id.clone(),
            scenario: self.scenario.clone(),
            score: self.performance.score,
            points: self.performance.points,
            exchange_count: self.exchange_count,
            difficulty_level: self.difficulty_level,
            mastery_percent: self.mastery_percent,
            completed_at,
        }
    }
}

fn require_field(name: &str, value: &str) -> Result<(), SessionError> {
    if value.trim().is_empty() {
        return Err(SessionError::InvalidInput(format!("{} is required", name)));
    }
    Ok(())
}

fn validate_difficulty(level: f64) -> Result<f64, SessionError> {
    if !level.is_finite() || !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&level) {
        return Err(SessionError::InvalidInput(format!(
            "difficulty level {} outside [{}, {}]",
            level, MIN_DIFFICULTY, MAX_DIFFICULTY
        )));
    }
    Ok(level)
}
