//! Engine configuration types.
//!
//! Every threshold the lifecycle engine decides on lives here rather than in
//! the code that uses it, so product tuning never requires a code change.
//! All sections use `#[serde(default)]`, which lets a partial TOML file
//! override only the values it names.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::session::phase::Phase;
use crate::session::record::{MAX_DIFFICULTY, MIN_DIFFICULTY};

/// Main configuration for the practice-session engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Phase thresholds and the early-exit rule.
    pub phases: PhaseConfig,
    /// Metrics aggregation settings.
    pub metrics: MetricsConfig,
    /// Score and points constants.
    pub scoring: ScoringConfig,
    /// Difficulty advisor rules.
    pub advisor: AdvisorConfig,
    /// Dialogue generator call settings.
    pub dialogue: DialogueConfig,
    /// Handling of concurrent mutations on one session.
    pub concurrency: ConcurrencyConfig,
}

/// Exchange thresholds for a single phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseRule {
    pub min_exchanges: u32,
    pub max_exchanges: u32,
}

impl PhaseRule {
    pub const fn new(min_exchanges: u32, max_exchanges: u32) -> Self {
        Self {
            min_exchanges,
            max_exchanges,
        }
    }
}

/// Per-phase thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    /// Practice ends early once the score exceeds this and the minimum is met.
    pub early_exit_score: u8,
    pub intro: PhaseRule,
    pub practice: PhaseRule,
    pub feedback: PhaseRule,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            early_exit_score: 80,
            intro: PhaseRule::new(1, 2),
            practice: PhaseRule::new(5, 10),
            feedback: PhaseRule::new(1, 2),
        }
    }
}

impl PhaseConfig {
    /// Thresholds for a phase. `Complete` is terminal and has none.
    pub fn rule(&self, phase: Phase) -> Option<PhaseRule> {
        match phase {
            Phase::Intro => Some(self.intro),
            Phase::Practice => Some(self.practice),
            Phase::Feedback => Some(self.feedback),
            Phase::Complete => None,
        }
    }
}

/// Metrics aggregation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// A latency sample above this counts as a hesitation.
    pub hesitation_threshold_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            hesitation_threshold_ms: 5000,
        }
    }
}

/// Score and points constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub base_score: f64,
    /// Weight applied to the good-response ratio.
    pub good_response_weight: f64,
    /// Average latency below this earns the fast bonus.
    pub fast_latency_ms: f64,
    /// Average latency above this incurs the slow penalty.
    pub slow_latency_ms: f64,
    pub latency_adjustment: f64,
    /// Average word count at or above this earns the length bonus.
    pub min_average_words: f64,
    pub length_bonus: f64,
    pub assist_weight: f64,
    pub hesitation_weight: f64,
    pub points: PointsConfig,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_score: 50.0,
            good_response_weight: 30.0,
            fast_latency_ms: 3000.0,
            slow_latency_ms: 8000.0,
            latency_adjustment: 10.0,
            min_average_words: 8.0,
            length_bonus: 10.0,
            assist_weight: 20.0,
            hesitation_weight: 15.0,
            points: PointsConfig::default(),
        }
    }
}

/// Reward points rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointsConfig {
    pub per_exchange: u32,
    pub per_good_response: u32,
    /// Awarded per response faster than `speed_threshold_ms`.
    pub speed_bonus: u32,
    pub speed_threshold_ms: u64,
    /// Awarded per response with at least `quality_min_words` words.
    pub quality_bonus: u32,
    pub quality_min_words: u32,
    pub assist_penalty: u32,
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            per_exchange: 10,
            per_good_response: 5,
            speed_bonus: 2,
            speed_threshold_ms: 3000,
            quality_bonus: 3,
            quality_min_words: 10,
            assist_penalty: 2,
        }
    }
}

/// Difficulty advisor rules, evaluated in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Most recent summaries kept per participant.
    pub window_size: usize,
    pub min_level: f64,
    pub max_level: f64,
    pub increase_min_score: f64,
    pub increase_min_consistency: f64,
    pub increase_min_mastery: f64,
    pub decrease_max_score: f64,
    pub decrease_max_consistency: f64,
    pub slight_increase_min_score: f64,
    pub slight_increase_min_mastery: f64,
    /// Size of the "slight increase" step.
    pub half_step: f64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            min_level: 1.0,
            max_level: 5.0,
            increase_min_score: 85.0,
            increase_min_consistency: 0.8,
            increase_min_mastery: 75.0,
            decrease_max_score: 60.0,
            decrease_max_consistency: 0.6,
            slight_increase_min_score: 70.0,
            slight_increase_min_mastery: 50.0,
            half_step: 0.5,
        }
    }
}

/// Dialogue generator call settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    /// Number of most recent turns passed as context.
    pub history_turns: usize,
    /// Upper bound on a single generation call.
    pub timeout_seconds: u64,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            history_turns: 6,
            timeout_seconds: 20,
        }
    }
}

/// What to do when a second mutation arrives for a busy session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyPolicy {
    /// Fail fast with `ConcurrentModification`.
    #[default]
    Reject,
    /// Wait for the running operation to finish.
    Queue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub policy: ConcurrencyPolicy,
}

impl EngineConfig {
    /// Parse a (possibly partial) TOML document.
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Check the values serde cannot: level bounds and phase thresholds.
    pub fn validate(&self) -> Result<(), SessionError> {
        let advisor = &self.advisor;
        let in_range = |level: f64| (MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&level);
        if !in_range(advisor.min_level) || !in_range(advisor.max_level) {
            return Err(SessionError::Configuration(format!(
                "advisor levels must lie within [{}, {}], got min {} max {}",
                MIN_DIFFICULTY, MAX_DIFFICULTY, advisor.min_level, advisor.max_level
            )));
        }
        if advisor.min_level > advisor.max_level {
            return Err(SessionError::Configuration(format!(
                "advisor min_level {} exceeds max_level {}",
                advisor.min_level, advisor.max_level
            )));
        }

        for phase in [Phase::Intro, Phase::Practice, Phase::Feedback] {
            if let Some(rule) = self.phases.rule(phase)
                && rule.min_exchanges > rule.max_exchanges
            {
                return Err(SessionError::Configuration(format!(
                    "{} min_exchanges {} exceeds max_exchanges {}",
                    phase, rule.min_exchanges, rule.max_exchanges
                )));
            }
        }
        Ok(())
    }
}
