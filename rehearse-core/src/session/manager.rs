//! PracticeSessionManager: the session lifecycle facade
//!
//! Callers drive a session with [`start`](PracticeSessionManager::start),
//! [`continue_session`](PracticeSessionManager::continue_session) and
//! [`end`](PracticeSessionManager::end). Each mutating call holds the
//! session's lock for its whole read-modify-write, including the one
//! outbound generation request, so turns of one session never interleave.
//! Sessions with different ids proceed independently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::advisor::{DifficultyAdvisor, DifficultyRecommendation};
use crate::config::{ConcurrencyPolicy, EngineConfig};
use crate::dialogue::fallback::{GradeBand, fallback_line};
use crate::dialogue::feedback::{FeedbackParse, parse_feedback};
use crate::dialogue::traits::{DialogueContext, DialogueGenerator, UtterancePurpose};
use crate::error::{GenerationError, SessionError};
use crate::events::{EventBus, SessionEvent};
use crate::store::SessionStore;

use super::metrics::{Metrics, MetricsAggregator, TurnFlags};
use super::phase::{Phase, PhaseEngine, PhaseTransition, TransitionInput};
use super::record::{NewSession, Role, SessionRecord};
use super::scoring::{Performance, PerformanceScorer};
use super::summary::SessionSummary;

/// Optional fields for [`PracticeSessionManager::start`].
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    pub scenario_details: Option<String>,
    /// Starting difficulty in `[1, 5]`, defaults to 1.
    pub difficulty_level: Option<f64>,
    pub mastery_percent: Option<f64>,
}

/// Optional fields for [`PracticeSessionManager::continue_session`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TurnOptions {
    /// Time between the partner prompt and the learner's reply.
    pub latency_ms: Option<f64>,
    pub flags: TurnFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartOutcome {
    pub session_id: String,
    pub greeting: String,
    pub phase: Phase,
    pub difficulty_level: f64,
    /// The greeting is scripted because generation failed.
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub response: String,
    pub phase: Phase,
    pub should_continue: bool,
    pub exchange_count: u32,
    pub metrics: Metrics,
    pub performance: Performance,
    /// Phase change caused by this turn, if any.
    pub transition: Option<PhaseTransition>,
    pub degraded: bool,
    /// Parsed form of a feedback-phase response.
    pub feedback: Option<FeedbackParse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndOutcome {
    pub summary: SessionSummary,
    pub degraded: bool,
}

/// A partner utterance ready to append.
struct Utterance {
    text: String,
    degraded: bool,
}

/// Drives practice sessions against an injected store, generator and bus.
pub struct PracticeSessionManager {
    store: Arc<dyn SessionStore>,
    generator: Arc<dyn DialogueGenerator>,
    event_bus: Arc<dyn EventBus>,
    config: EngineConfig,
    phases: PhaseEngine,
    aggregator: MetricsAggregator,
    scorer: PerformanceScorer,
    advisor: DifficultyAdvisor,
    /// Per-session mutation locks
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
    /// Cancellation handles for generation requests in flight
    in_flight: RwLock<HashMap<String, CancellationToken>>,
}

impl PracticeSessionManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        generator: Arc<dyn DialogueGenerator>,
        event_bus: Arc<dyn EventBus>,
        config: EngineConfig,
    ) -> Self {
        Self {
            phases: PhaseEngine::new(config.phases.clone()),
            aggregator: MetricsAggregator::new(config.metrics.clone()),
            scorer: PerformanceScorer::new(config.scoring.clone()),
            advisor: DifficultyAdvisor::new(config.advisor.clone()),
            store,
            generator,
            event_bus,
            config,
            locks: RwLock::new(HashMap::new()),
            in_flight: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &Arc<dyn EventBus> {
        &self.event_bus
    }

    /// Create a session in `intro` and produce its greeting.
    ///
    /// Never fails because of the generator: a scripted greeting is used
    /// instead and the outcome is marked degraded.
    pub async fn start(
        &self,
        participant_id: &str,
        grade_band: &str,
        scenario: &str,
        options: StartOptions,
    ) -> Result<StartOutcome, SessionError> {
        let now = Utc::now();
        let record = SessionRecord::new(
            NewSession {
                participant_id: participant_id.to_string(),
                grade_band: grade_band.to_string(),
                scenario: scenario.to_string(),
                scenario_details: options.scenario_details,
                difficulty_level: options.difficulty_level,
                mastery_percent: options.mastery_percent,
            },
            now,
        )?
        .start(now);

        let greeting = self.utter(&record, UtterancePurpose::Greeting).await?;
        let record = record
            .apply_partner_turn(&greeting.text, Utc::now())?
            .next_revision();
        self.store.save(&record).await?;

        let session_id = record.session_id().to_string();
        info!(
            session_id = %session_id,
            participant_id = %participant_id,
            scenario = %scenario,
            degraded = greeting.degraded,
            "Session started"
        );

        self.event_bus
            .publish(SessionEvent::Started {
                session_id: session_id.clone(),
                participant_id: record.participant_id().to_string(),
                scenario: record.scenario().to_string(),
                difficulty_level: record.difficulty_level(),
            })
            .await;
        self.publish_turn(&record, Role::Partner).await;

        Ok(StartOutcome {
            session_id,
            greeting: greeting.text,
            phase: record.phase(),
            difficulty_level: record.difficulty_level(),
            degraded: greeting.degraded,
        })
    }

    /// Record a learner turn and produce the partner's reply.
    ///
    /// Metrics are updated first, then the phase rules are evaluated against
    /// the fresh score, then the reply is generated in the resulting phase.
    /// A turn that completes the session is answered with the wrap-up.
    pub async fn continue_session(
        &self,
        session_id: &str,
        utterance: &str,
        options: TurnOptions,
    ) -> Result<TurnOutcome, SessionError> {
        let guard = self.acquire(session_id).await?;
        let result = self.continue_locked(session_id, utterance, options).await;
        self.release(session_id, guard).await;
        result
    }

    async fn continue_locked(
        &self,
        session_id: &str,
        utterance: &str,
        options: TurnOptions,
    ) -> Result<TurnOutcome, SessionError> {
        let record = self.load_usable(session_id).await?;
        let started_in = record.phase();

        let (record, sample) = record.apply_learner_turn(
            &self.aggregator,
            utterance,
            options.latency_ms,
            options.flags,
            Utc::now(),
        )?;
        debug!(
            session_id = %session_id,
            exchange = record.exchange_count(),
            words = sample.word_count,
            latency_ms = ?sample.latency_ms,
            hesitation = sample.hesitation,
            "Learner turn recorded"
        );

        let performance = self.scorer.evaluate(record.metrics());
        let transition = match self.phases.evaluate(TransitionInput {
            phase: record.phase(),
            exchange_count: record.exchange_count(),
            score: performance.score,
            feedback_delivered: record.feedback_delivered(),
        }) {
            Ok(transition) => transition,
            Err(e) => return Err(self.fatal(session_id, e).await),
        };

        let mut record = record.apply_score(performance);
        if let Some(transition) = transition {
            record = match record.apply_transition(transition, Utc::now()) {
                Ok(record) => record,
                Err(e) => return Err(self.fatal(session_id, e).await),
            };
        }

        let purpose = if record.is_complete() {
            UtterancePurpose::WrapUp
        } else {
            UtterancePurpose::Reply
        };
        let reply = match self.utter(&record, purpose).await {
            Ok(reply) => reply,
            Err(SessionError::Cancelled(id)) => {
                // The learner turn happened; only the reply is discarded
                let record = record.next_revision();
                self.store.save(&record).await?;
                self.publish_turn(&record, Role::Learner).await;
                self.publish_progress(&record, started_in, transition).await;
                return Err(SessionError::Cancelled(id));
            }
            Err(e) => return Err(e),
        };

        let record = record
            .apply_partner_turn(&reply.text, Utc::now())?
            .next_revision();
        self.store.save(&record).await?;

        self.publish_turn(&record, Role::Learner).await;
        self.publish_progress(&record, started_in, transition).await;
        self.publish_turn(&record, Role::Partner).await;

        let feedback = (record.phase() == Phase::Feedback).then(|| parse_feedback(&reply.text));

        Ok(TurnOutcome {
            response: reply.text,
            phase: record.phase(),
            should_continue: !record.is_complete(),
            exchange_count: record.exchange_count(),
            metrics: record.metrics().clone(),
            performance: record.performance(),
            transition,
            degraded: reply.degraded,
            feedback,
        })
    }

    /// Finish a session and return its summary.
    ///
    /// Calling `end` on a complete session returns the stored summary and
    /// does not generate another wrap-up.
    pub async fn end(&self, session_id: &str) -> Result<EndOutcome, SessionError> {
        let guard = self.acquire(session_id).await?;
        let result = self.end_locked(session_id).await;
        self.release(session_id, guard).await;
        result
    }

    async fn end_locked(&self, session_id: &str) -> Result<EndOutcome, SessionError> {
        let record = self.load_usable(session_id).await?;

        if record.is_complete() {
            let Some(summary) = record.summary().cloned() else {
                let err = SessionError::Configuration(format!(
                    "complete session {} has no summary",
                    session_id
                ));
                return Err(self.fatal(session_id, err).await);
            };
            debug!(session_id = %session_id, "Session already complete");
            return Ok(EndOutcome {
                summary,
                degraded: false,
            });
        }

        let started_in = record.phase();
        let performance = self.scorer.evaluate(record.metrics());
        let Some(transition) = self.phases.force_complete(started_in) else {
            let err =
                SessionError::Configuration(format!("session {} cannot be completed", session_id));
            return Err(self.fatal(session_id, err).await);
        };
        let record = match record
            .apply_score(performance)
            .apply_transition(transition, Utc::now())
        {
            Ok(record) => record,
            Err(e) => return Err(self.fatal(session_id, e).await),
        };

        let (record, degraded) = match self.utter(&record, UtterancePurpose::WrapUp).await {
            Ok(wrap_up) => (
                record.apply_partner_turn(&wrap_up.text, Utc::now())?,
                wrap_up.degraded,
            ),
            Err(SessionError::Cancelled(_)) => {
                debug!(session_id = %session_id, "Wrap-up discarded after cancellation");
                (record, false)
            }
            Err(e) => return Err(e),
        };
        let record = record.next_revision();
        self.store.save(&record).await?;

        self.publish_progress(&record, started_in, Some(transition)).await;
        if record.has_wrap_up() {
            self.publish_turn(&record, Role::Partner).await;
        }

        let Some(summary) = record.summary().cloned() else {
            let err =
                SessionError::Configuration(format!("session {} sealed without summary", session_id));
            return Err(self.fatal(session_id, err).await);
        };
        Ok(EndOutcome { summary, degraded })
    }

    /// Cross-session recommendation for a participant's next session.
    pub fn assess_difficulty(
        &self,
        recent_summaries: &[SessionSummary],
        current_level: f64,
        mastery_percent: f64,
    ) -> DifficultyRecommendation {
        self.advisor
            .recommend(recent_summaries, current_level, mastery_percent)
    }

    /// Run the advisor over the participant's stored history and apply the
    /// unrounded level to this session's remaining turns.
    pub async fn assess_session_difficulty(
        &self,
        session_id: &str,
        mastery_percent: f64,
    ) -> Result<DifficultyRecommendation, SessionError> {
        let guard = self.acquire(session_id).await?;
        let result = self.apply_difficulty_locked(session_id, mastery_percent).await;
        self.release(session_id, guard).await;
        result
    }

    async fn apply_difficulty_locked(
        &self,
        session_id: &str,
        mastery_percent: f64,
    ) -> Result<DifficultyRecommendation, SessionError> {
        let record = self.load_usable(session_id).await?;

        let summaries = self
            .store
            .list_by_participant(record.participant_id(), self.config.advisor.window_size)
            .await?;
        let recommendation =
            self.advisor
                .recommend(&summaries, record.difficulty_level(), mastery_percent);

        let record = record
            .apply_difficulty(recommendation.unrounded_level, Utc::now())?
            .next_revision();
        self.store.save(&record).await?;

        info!(
            session_id = %session_id,
            level = recommendation.unrounded_level,
            reason = %recommendation.reason,
            "Difficulty applied"
        );
        self.event_bus
            .publish(SessionEvent::DifficultyApplied {
                session_id: session_id.to_string(),
                level: recommendation.unrounded_level,
            })
            .await;

        Ok(recommendation)
    }

    /// Cancel the session's in-flight generation request, if any.
    ///
    /// Returns whether a request was cancelled.
    pub async fn abandon(&self, session_id: &str) -> bool {
        match self.in_flight.read().await.get(session_id) {
            Some(token) => {
                info!(session_id = %session_id, "Abandoning in-flight generation");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Current stored state of a session
    pub async fn session(&self, session_id: &str) -> Result<SessionRecord, SessionError> {
        self.load(session_id).await
    }

    /// Completed-session summaries for a participant, most recent first
    pub async fn recent_summaries(
        &self,
        participant_id: &str,
        limit: usize,
    ) -> Result<Vec<SessionSummary>, SessionError> {
        Ok(self.store.list_by_participant(participant_id, limit).await?)
    }

    async fn load(&self, session_id: &str) -> Result<SessionRecord, SessionError> {
        self.store
            .load(session_id)
            .await?
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    /// Load for mutation; sessions taken out of service are refused.
    async fn load_usable(&self, session_id: &str) -> Result<SessionRecord, SessionError> {
        let record = self.load(session_id).await?;
        match record.unusable_reason() {
            Some(reason) => Err(SessionError::Configuration(format!(
                "session {} is unusable: {}",
                session_id, reason
            ))),
            None => Ok(record),
        }
    }

    async fn acquire(&self, session_id: &str) -> Result<OwnedMutexGuard<()>, SessionError> {
        let lock = {
            let mut locks = self.locks.write().await;
            locks.entry(session_id.to_string()).or_default().clone()
        };
        match self.config.concurrency.policy {
            ConcurrencyPolicy::Reject => lock.try_lock_owned().map_err(|_| {
                debug!(session_id = %session_id, "Rejecting concurrent mutation");
                SessionError::ConcurrentModification(session_id.to_string())
            }),
            ConcurrencyPolicy::Queue => Ok(lock.lock_owned().await),
        }
    }

    /// Release the session's lock and drop its map entry once nobody else
    /// holds or waits on it.
    async fn release(&self, session_id: &str, guard: OwnedMutexGuard<()>) {
        drop(guard);
        let mut locks = self.locks.write().await;
        // Only the map's own reference left
        if locks
            .get(session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(session_id);
        }
    }

    /// Ask the generator for an utterance, falling back to scripted text.
    ///
    /// Only cancellation is returned as an error.
    async fn utter(
        &self,
        record: &SessionRecord,
        purpose: UtterancePurpose,
    ) -> Result<Utterance, SessionError> {
        let session_id = record.session_id();
        let context = DialogueContext {
            session_id: session_id.to_string(),
            history: record
                .recent_turns(self.config.dialogue.history_turns)
                .to_vec(),
            phase: record.phase(),
            difficulty_level: record.difficulty_level(),
            scenario: record.scenario().to_string(),
            scenario_details: record.scenario_details().map(str::to_string),
            grade_band: record.grade_band().to_string(),
            purpose,
        };

        let token = CancellationToken::new();
        self.in_flight
            .write()
            .await
            .insert(session_id.to_string(), token.clone());

        let timeout_secs = self.config.dialogue.timeout_seconds;
        let result = tokio::select! {
            _ = token.cancelled() => Err(GenerationError::Cancelled),
            outcome = tokio::time::timeout(
                Duration::from_secs(timeout_secs),
                self.generator.generate(&context),
            ) => match outcome {
                Ok(generated) => generated,
                Err(_) => Err(GenerationError::Timeout(timeout_secs)),
            },
        };
        self.in_flight.write().await.remove(session_id);

        let error = match result {
            Ok(text) if !text.trim().is_empty() => {
                return Ok(Utterance {
                    text: text.trim().to_string(),
                    degraded: false,
                });
            }
            Ok(_) => GenerationError::EmptyUtterance,
            Err(GenerationError::Cancelled) => {
                return Err(SessionError::Cancelled(session_id.to_string()));
            }
            Err(e) => e,
        };

        warn!(
            session_id = %session_id,
            generator = self.generator.name(),
            phase = %record.phase(),
            error = %error,
            "Generation failed, using scripted line"
        );
        self.event_bus
            .publish(SessionEvent::Degraded {
                session_id: session_id.to_string(),
                phase: record.phase(),
                cause: error.to_string(),
            })
            .await;

        let band = GradeBand::classify(record.grade_band());
        Ok(Utterance {
            text: fallback_line(record.phase(), band, purpose).to_string(),
            degraded: true,
        })
    }

    /// Persist the session as unusable after an invariant violation.
    ///
    /// The stored copy is marked, not the in-flight record, so no half-applied
    /// turn is saved.
    async fn fatal(&self, session_id: &str, err: SessionError) -> SessionError {
        if !matches!(err, SessionError::Configuration(_)) {
            return err;
        }
        error!(session_id = %session_id, error = %err, "Session invariant violated");

        let marked = match self.store.load(session_id).await {
            Ok(Some(record)) => {
                let record = record
                    .mark_unusable(err.to_string(), Utc::now())
                    .next_revision();
                self.store.save(&record).await
            }
            Ok(None) => return err,
            Err(e) => Err(e),
        };
        if let Err(e) = marked {
            warn!(session_id = %session_id, error = %e, "Failed to mark session unusable");
        }
        err
    }

    async fn publish_turn(&self, record: &SessionRecord, role: Role) {
        let Some(turn) = record
            .turn_history()
            .iter()
            .rev()
            .find(|t| t.role == role)
        else {
            return;
        };
        self.event_bus
            .publish(SessionEvent::TurnRecorded {
                session_id: record.session_id().to_string(),
                role,
                phase: turn.phase,
                exchange_count: turn.exchange_number,
            })
            .await;
    }

    async fn publish_progress(
        &self,
        record: &SessionRecord,
        started_in: Phase,
        transition: Option<PhaseTransition>,
    ) {
        let Some(transition) = transition else {
            return;
        };
        info!(
            session_id = %record.session_id(),
            from = %started_in,
            to = %transition.to,
            reason = %transition.reason,
            "Phase changed"
        );
        self.event_bus
            .publish(SessionEvent::PhaseChanged {
                session_id: record.session_id().to_string(),
                from: transition.from,
                to: transition.to,
                reason: transition.reason,
            })
            .await;

        if let Some(summary) = record.summary() {
            info!(
                session_id = %record.session_id(),
                score = summary.score,
                points = summary.points,
                exchanges = summary.exchange_count,
                "Session complete"
            );
            self.event_bus
                .publish(SessionEvent::Completed {
                    session_id: record.session_id().to_string(),
                    score: summary.score,
                    points: summary.points,
                })
                .await;
        }
    }
}
