//! Cross-session difficulty advisor
//!
//! Looks at a participant's most recent completed sessions and recommends the
//! difficulty for the next one. Rules are checked in order and the first
//! match wins:
//!
//! 1. high average, consistent, high mastery: one level up
//! 2. low average and inconsistent: one level down
//! 3. good average and some mastery: half a level up
//! 4. otherwise: stay
//!
//! The advisor never fails. Unusable input yields the current level with
//! neutral confidence.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AdvisorConfig;
use crate::session::record::{MAX_DIFFICULTY, MIN_DIFFICULTY};
use crate::session::summary::SessionSummary;

/// Consistency used when fewer than two scores are available.
const NEUTRAL_CONSISTENCY: f64 = 0.5;
/// Confidence reported on fail-soft results.
const NEUTRAL_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    HighPerformanceAndMastery,
    LowPerformance,
    SlightIncrease,
    Maintain,
    InsufficientData,
}

impl AdjustmentReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighPerformanceAndMastery => "high performance and mastery",
            Self::LowPerformance => "low performance",
            Self::SlightIncrease => "good performance, slight increase",
            Self::Maintain => "maintain current level",
            Self::InsufficientData => "insufficient data",
        }
    }
}

impl fmt::Display for AdjustmentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyRecommendation {
    /// Whole level shown to callers.
    pub recommended_level: u8,
    /// Level before rounding; feed this back as the next current level.
    pub unrounded_level: f64,
    pub reason: AdjustmentReason,
    pub confidence: f64,
    pub average_score: Option<f64>,
    pub consistency: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct DifficultyAdvisor {
    config: AdvisorConfig,
}

impl DifficultyAdvisor {
    /// Level bounds outside the difficulty range are pulled back into it;
    /// inverted bounds fall back to the full range.
    pub fn new(config: AdvisorConfig) -> Self {
        let (min_level, max_level) = level_bounds(&config);
        Self {
            config: AdvisorConfig {
                min_level,
                max_level,
                ..config
            },
        }
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    /// Recommend a level from `summaries`, most recent first.
    ///
    /// Only the first `window_size` summaries are considered.
    pub fn recommend(
        &self,
        summaries: &[SessionSummary],
        current_level: f64,
        mastery_percent: f64,
    ) -> DifficultyRecommendation {
        let c = &self.config;
        let current = if current_level.is_finite() {
            current_level.clamp(c.min_level, c.max_level)
        } else {
            c.min_level
        };

        let scores: Vec<f64> = summaries
            .iter()
            .take(c.window_size)
            .map(|s| f64::from(s.score))
            .collect();
        if scores.is_empty() || !mastery_percent.is_finite() {
            debug!(
                summaries = summaries.len(),
                mastery_percent, "Not enough data for a difficulty change"
            );
            return self.fail_soft(current);
        }
        let mastery = mastery_percent.clamp(0.0, 100.0);

        let average = mean(&scores);
        let consistency = consistency(&scores);
        let confidence =
            (0.4 * (average / 100.0) + 0.3 * consistency + 0.3 * (mastery / 100.0)).clamp(0.0, 1.0);

        let (level, reason) = if average >= c.increase_min_score
            && consistency >= c.increase_min_consistency
            && mastery >= c.increase_min_mastery
        {
            (current + 1.0, AdjustmentReason::HighPerformanceAndMastery)
        } else if average <= c.decrease_max_score && consistency <= c.decrease_max_consistency {
            (current - 1.0, AdjustmentReason::LowPerformance)
        } else if average >= c.slight_increase_min_score
            && mastery >= c.slight_increase_min_mastery
            && current < c.max_level
        {
            (current + c.half_step, AdjustmentReason::SlightIncrease)
        } else {
            (current, AdjustmentReason::Maintain)
        };
        let level = level.clamp(c.min_level, c.max_level);

        debug!(
            average,
            consistency,
            confidence,
            level,
            reason = %reason,
            "Difficulty assessed"
        );

        DifficultyRecommendation {
            recommended_level: self.round_level(level),
            unrounded_level: level,
            reason,
            confidence,
            average_score: Some(average),
            consistency: Some(consistency),
        }
    }

    fn fail_soft(&self, current: f64) -> DifficultyRecommendation {
        DifficultyRecommendation {
            recommended_level: self.round_level(current),
            unrounded_level: current,
            reason: AdjustmentReason::InsufficientData,
            confidence: NEUTRAL_CONFIDENCE,
            average_score: None,
            consistency: None,
        }
    }

    fn round_level(&self, level: f64) -> u8 {
        level.round().clamp(MIN_DIFFICULTY, MAX_DIFFICULTY) as u8
    }
}

fn level_bounds(config: &AdvisorConfig) -> (f64, f64) {
    let bound = |level: f64, fallback: f64| {
        if level.is_finite() {
            level.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
        } else {
            fallback
        }
    };
    let min_level = bound(config.min_level, MIN_DIFFICULTY);
    let max_level = bound(config.max_level, MAX_DIFFICULTY);
    if min_level > max_level {
        warn!(
            min_level = config.min_level,
            max_level = config.max_level,
            "Inverted advisor level bounds, using the full difficulty range"
        );
        return (MIN_DIFFICULTY, MAX_DIFFICULTY);
    }
    (min_level, max_level)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// `max(0, 1 - stddev / 50)` over the population standard deviation.
fn consistency(scores: &[f64]) -> f64 {
    if scores.len() < 2 {
        return NEUTRAL_CONSISTENCY;
    }
    let avg = mean(scores);
    let variance = scores.iter().map(|s| (s - avg).powi(2)).sum::<f64>() / scores.len() as f64;
    (1.0 - variance.sqrt() / 50.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn summary(score: u8) -> SessionSummary {
        SessionSummary {
            session_id: format!("s-{}", score),
            participant_id: "learner-1".to_string(),
            scenario: "ordering lunch".to_string(),
            score,
            points: 0,
            exchange_count: 6,
            difficulty_level: 3.0,
            mastery_percent: None,
            completed_at: Utc::now(),
        }
    }

    fn summaries(scores: &[u8]) -> Vec<SessionSummary> {
        scores.iter().copied().map(summary).collect()
    }

    // ==================== Rule Tests ====================

    #[test]
    fn strong_consistent_learner_moves_up_a_level() {
        let advisor = DifficultyAdvisor::default();
        // mean 90, population stddev ~8.16, consistency ~0.84
        let result = advisor.recommend(&summaries(&[80, 100, 90]), 3.0, 80.0);

        assert_eq!(result.recommended_level, 4);
        assert_eq!(result.reason, AdjustmentReason::HighPerformanceAndMastery);
        assert_eq!(result.reason.to_string(), "high performance and mastery");
        assert_eq!(result.average_score, Some(90.0));
    }

    #[test]
    fn struggling_inconsistent_learner_moves_down() {
        let advisor = DifficultyAdvisor::default();
        // mean 50, stddev 40, consistency 0.2
        let result = advisor.recommend(&summaries(&[10, 90]), 3.0, 90.0);

        assert_eq!(result.recommended_level, 2);
        assert_eq!(result.reason, AdjustmentReason::LowPerformance);
    }

    #[test]
    fn good_performance_adds_half_step() {
        let advisor = DifficultyAdvisor::default();
        let result = advisor.recommend(&summaries(&[75, 75, 75]), 2.0, 60.0);

        assert_eq!(result.reason, AdjustmentReason::SlightIncrease);
        assert_eq!(result.unrounded_level, 2.5);
        assert_eq!(result.recommended_level, 3);
    }

    #[test]
    fn two_half_steps_make_a_full_level() {
        let advisor = DifficultyAdvisor::default();
        let window = summaries(&[75, 75, 75]);

        let first = advisor.recommend(&window, 2.0, 60.0);
        let second = advisor.recommend(&window, first.unrounded_level, 60.0);

        assert_eq!(second.unrounded_level, 3.0);
        assert_eq!(second.recommended_level, 3);
    }

    #[test]
    fn middling_performance_maintains_level() {
        let advisor = DifficultyAdvisor::default();
        let result = advisor.recommend(&summaries(&[65, 65]), 3.0, 40.0);

        assert_eq!(result.reason, AdjustmentReason::Maintain);
        assert_eq!(result.recommended_level, 3);
    }

    #[test]
    fn top_level_is_capped() {
        let advisor = DifficultyAdvisor::default();
        let result = advisor.recommend(&summaries(&[95, 95, 95]), 5.0, 100.0);

        assert_eq!(result.recommended_level, 5);
        assert_eq!(result.reason, AdjustmentReason::HighPerformanceAndMastery);
    }

    #[test]
    fn bottom_level_is_floored() {
        let advisor = DifficultyAdvisor::default();
        let result = advisor.recommend(&summaries(&[0, 100]), 1.0, 0.0);

        assert_eq!(result.recommended_level, 1);
        assert_eq!(result.reason, AdjustmentReason::LowPerformance);
    }

    #[test]
    fn configured_max_above_difficulty_range_is_capped() {
        let advisor = DifficultyAdvisor::new(AdvisorConfig {
            max_level: 8.0,
            ..AdvisorConfig::default()
        });
        let result = advisor.recommend(&summaries(&[95, 95, 95]), 5.0, 100.0);

        assert_eq!(advisor.config().max_level, MAX_DIFFICULTY);
        assert_eq!(result.recommended_level, 5);
        assert_eq!(result.unrounded_level, 5.0);
    }

    #[test]
    fn inverted_bounds_fall_back_to_full_range() {
        let advisor = DifficultyAdvisor::new(AdvisorConfig {
            min_level: 4.0,
            max_level: 2.0,
            ..AdvisorConfig::default()
        });
        let result = advisor.recommend(&summaries(&[95, 95, 95]), 3.0, 100.0);

        assert_eq!(advisor.config().min_level, MIN_DIFFICULTY);
        assert_eq!(advisor.config().max_level, MAX_DIFFICULTY);
        assert_eq!(result.recommended_level, 4);
    }

    #[test]
    fn narrowed_bounds_are_kept() {
        let advisor = DifficultyAdvisor::new(AdvisorConfig {
            min_level: 2.0,
            max_level: 3.0,
            ..AdvisorConfig::default()
        });
        let up = advisor.recommend(&summaries(&[95, 95, 95]), 3.0, 100.0);
        let down = advisor.recommend(&summaries(&[0, 100]), 2.0, 0.0);

        assert_eq!(up.recommended_level, 3);
        assert_eq!(down.recommended_level, 2);
    }

    // ==================== Derived Input Tests ====================

    #[test]
    fn single_summary_has_neutral_consistency() {
        let advisor = DifficultyAdvisor::default();
        // consistency 0.5 blocks rule 1 even with perfect scores
        let result = advisor.recommend(&summaries(&[100]), 3.0, 100.0);

        assert_eq!(result.consistency, Some(0.5));
        assert_eq!(result.reason, AdjustmentReason::SlightIncrease);
    }

    #[test]
    fn confidence_combines_average_consistency_and_mastery() {
        let advisor = DifficultyAdvisor::default();
        let result = advisor.recommend(&summaries(&[50, 50]), 3.0, 50.0);

        // 0.4 * 0.5 + 0.3 * 1.0 + 0.3 * 0.5
        assert!((result.confidence - 0.65).abs() < 1e-9);
    }

    #[test]
    fn only_window_size_summaries_are_used() {
        let advisor = DifficultyAdvisor::new(AdvisorConfig {
            window_size: 2,
            ..AdvisorConfig::default()
        });
        let result = advisor.recommend(&summaries(&[90, 90, 0, 0]), 3.0, 80.0);

        assert_eq!(result.average_score, Some(90.0));
    }

    // ==================== Fail-soft Tests ====================

    #[test]
    fn empty_window_keeps_current_level() {
        let advisor = DifficultyAdvisor::default();
        let result = advisor.recommend(&[], 4.0, 90.0);

        assert_eq!(result.recommended_level, 4);
        assert_eq!(result.reason, AdjustmentReason::InsufficientData);
        assert_eq!(result.reason.to_string(), "insufficient data");
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn non_finite_inputs_fail_soft() {
        let advisor = DifficultyAdvisor::default();

        let nan_mastery = advisor.recommend(&summaries(&[90]), 2.0, f64::NAN);
        assert_eq!(nan_mastery.reason, AdjustmentReason::InsufficientData);
        assert_eq!(nan_mastery.recommended_level, 2);

        let nan_level = advisor.recommend(&[], f64::NAN, 50.0);
        assert_eq!(nan_level.recommended_level, 1);
    }

    #[test]
    fn out_of_range_current_level_is_clamped() {
        let advisor = DifficultyAdvisor::default();
        let result = advisor.recommend(&[], 9.0, 50.0);
        assert_eq!(result.recommended_level, 5);
    }
}
