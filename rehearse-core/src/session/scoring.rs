//! Performance score and reward points.
//!
//! Both are pure functions of a [`Metrics`] snapshot. The score is a 0-100
//! quality measure built from a base value plus independently capped
//! adjustments; points accumulate per exchange and are never negative.

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;

use super::metrics::Metrics;

/// Score and points for one metrics snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Performance {
    pub score: u8,
    pub points: u32,
}

#[derive(Debug, Clone, Default)]
pub struct PerformanceScorer {
    config: ScoringConfig,
}

impl PerformanceScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(&self, metrics: &Metrics) -> Performance {
        Performance {
            score: self.score(metrics),
            points: self.points(metrics),
        }
    }

    /// Quality score in `[0, 100]`. A session without exchanges scores 0.
    pub fn score(&self, metrics: &Metrics) -> u8 {
        let total = metrics.total_exchanges();
        if total == 0 {
            return 0;
        }
        let c = &self.config;

        let good = ratio(metrics.good_response_count(), total) * c.good_response_weight;

        let latency = match metrics.average_latency_ms() {
            Some(avg) if avg < c.fast_latency_ms => c.latency_adjustment,
            Some(avg) if avg > c.slow_latency_ms => -c.latency_adjustment,
            _ => 0.0,
        };

        let length = match metrics.average_word_count() {
            Some(avg) if avg >= c.min_average_words => c.length_bonus,
            _ => 0.0,
        };

        let assists = ratio(metrics.assist_count(), total) * c.assist_weight;
        let hesitations = ratio(metrics.hesitation_count(), total) * c.hesitation_weight;

        let raw = c.base_score + good + latency + length - assists - hesitations;
        if raw.is_nan() {
            return 0;
        }
        raw.clamp(0.0, 100.0).round() as u8
    }

    /// Reward points, floored at zero.
    pub fn points(&self, metrics: &Metrics) -> u32 {
        let p = &self.config.points;

        let fast_responses = metrics
            .response_latencies_ms()
            .iter()
            .filter(|&&latency| latency < p.speed_threshold_ms as f64)
            .count() as i64;
        let quality_responses = metrics
            .word_counts()
            .iter()
            .filter(|&&words| words >= p.quality_min_words)
            .count() as i64;

        let earned = i64::from(metrics.total_exchanges()) * i64::from(p.per_exchange)
            + i64::from(metrics.good_response_count()) * i64::from(p.per_good_response)
            + fast_responses * i64::from(p.speed_bonus)
            + quality_responses * i64::from(p.quality_bonus);
        let penalty = i64::from(metrics.assist_count()) * i64::from(p.assist_penalty);

        (earned - penalty).clamp(0, i64::from(u32::MAX)) as u32
    }
}

/// `count / total`, capped at 1.
fn ratio(count: u32, total: u32) -> f64 {
    (f64::from(count) / f64::from(total)).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::metrics::{MetricsAggregator, TurnFlags};

    fn build(turns: &[(&str, Option<f64>, TurnFlags)]) -> Metrics {
        let aggregator = MetricsAggregator::default();
        let mut metrics = Metrics::new();
        for (content, latency, flags) in turns {
            aggregator
                .record_learner_turn(&mut metrics, content, *latency, *flags)
                .unwrap();
        }
        metrics
    }

    const TWELVE_WORDS: &str = "I would really like to hear more about your weekend plans please";

    fn good() -> TurnFlags {
        TurnFlags {
            is_high_quality_response: true,
            ..TurnFlags::default()
        }
    }

    fn assist() -> TurnFlags {
        TurnFlags {
            is_assist_request: true,
            ..TurnFlags::default()
        }
    }

    #[test]
    fn fresh_session_scores_zero_with_zero_points() {
        let scorer = PerformanceScorer::default();
        let performance = scorer.evaluate(&Metrics::new());

        assert_eq!(performance, Performance { score: 0, points: 0 });
    }

    #[test]
    fn strong_session_clamps_at_one_hundred() {
        let turns: Vec<_> = (0..5).map(|_| (TWELVE_WORDS, Some(2000.0), good())).collect();
        let metrics = build(&turns);
        let scorer = PerformanceScorer::default();

        assert_eq!(metrics.average_word_count(), Some(12.0));
        assert_eq!(scorer.score(&metrics), 100);
        // 5 * 10 + 5 * 5 + 5 * 2 + 5 * 3
        assert_eq!(scorer.points(&metrics), 100);
    }

    #[test]
    fn neutral_session_stays_at_base() {
        let metrics = build(&[("sure thing", Some(4000.0), TurnFlags::default())]);
        let scorer = PerformanceScorer::default();

        assert_eq!(scorer.score(&metrics), 50);
    }

    #[test]
    fn slow_and_assisted_session_is_penalised() {
        let metrics = build(&[
            ("umm", Some(9000.0), assist()),
            ("I dont know", Some(9500.0), assist()),
        ]);
        let scorer = PerformanceScorer::default();

        // 50 - 10 (slow) - 20 (all assisted) - 15 (all hesitations)
        assert_eq!(scorer.score(&metrics), 5);
    }

    #[test]
    fn missing_latency_skips_latency_adjustment() {
        let metrics = build(&[("fine thanks", None, TurnFlags::default())]);
        let scorer = PerformanceScorer::default();

        assert_eq!(scorer.score(&metrics), 50);
    }

    #[test]
    fn points_are_floored_at_zero() {
        let config = ScoringConfig {
            points: crate::config::PointsConfig {
                per_exchange: 1,
                assist_penalty: 50,
                ..Default::default()
            },
            ..ScoringConfig::default()
        };
        let scorer = PerformanceScorer::new(config);
        let metrics = build(&[("help me", Some(4000.0), assist())]);

        assert_eq!(scorer.points(&metrics), 0);
    }

    #[test]
    fn assist_penalty_reduces_points() {
        let metrics = build(&[("help please", Some(4000.0), assist())]);
        let scorer = PerformanceScorer::default();

        // 10 base - 2 penalty
        assert_eq!(scorer.points(&metrics), 8);
    }

    #[test]
    fn speed_bonus_uses_unrounded_latency() {
        let scorer = PerformanceScorer::default();
        let just_under = build(&[("yes", Some(2999.6), TurnFlags::default())]);
        let just_over = build(&[("yes", Some(3000.4), TurnFlags::default())]);

        // 10 base + 2 speed bonus
        assert_eq!(scorer.points(&just_under), 12);
        assert_eq!(scorer.points(&just_over), 10);
    }

    #[test]
    fn custom_base_score_is_used() {
        let scorer = PerformanceScorer::new(ScoringConfig {
            base_score: 70.0,
            ..ScoringConfig::default()
        });
        let metrics = build(&[("sure thing", Some(4000.0), TurnFlags::default())]);

        assert_eq!(scorer.score(&metrics), 70);
    }
}
