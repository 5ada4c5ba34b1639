//! Running performance metrics for one active session.
//!
//! Statistics are updated incrementally on every learner turn so that
//! scoring never re-scans the turn history. Samples are only ever appended.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::MetricsConfig;
use crate::error::SessionError;

/// Per-turn annotations supplied by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnFlags {
    pub is_assist_request: bool,
    pub is_high_quality_response: bool,
    pub hint_given: bool,
}

/// Accumulated statistics for a session.
///
/// Fields are read-only outside this module; only [`MetricsAggregator`]
/// appends to them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    response_latencies_ms: Vec<f64>,
    word_counts: Vec<u32>,
    total_exchanges: u32,
    assist_count: u32,
    hesitation_count: u32,
    hints_given: u32,
    good_response_count: u32,
    average_latency_ms: Option<f64>,
    average_word_count: Option<f64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learner turns recorded.
    pub fn total_exchanges(&self) -> u32 {
        self.total_exchanges
    }

    /// Accepted latency samples, in recording order.
    pub fn response_latencies_ms(&self) -> &[f64] {
        &self.response_latencies_ms
    }

    pub fn word_counts(&self) -> &[u32] {
        &self.word_counts
    }

    pub fn assist_count(&self) -> u32 {
        self.assist_count
    }

    pub fn hesitation_count(&self) -> u32 {
        self.hesitation_count
    }

    pub fn hints_given(&self) -> u32 {
        self.hints_given
    }

    pub fn good_response_count(&self) -> u32 {
        self.good_response_count
    }

    /// `None` until the first valid latency sample.
    pub fn average_latency_ms(&self) -> Option<f64> {
        self.average_latency_ms
    }

    /// `None` until the first learner turn.
    pub fn average_word_count(&self) -> Option<f64> {
        self.average_word_count
    }
}

/// What the aggregator accepted from one learner turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearnerSample {
    pub word_count: u32,
    /// `None` when no latency was given or the sample was rejected.
    pub latency_ms: Option<u64>,
    pub hesitation: bool,
}

/// Applies learner turns to a [`Metrics`] value.
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator {
    config: MetricsConfig,
}

impl MetricsAggregator {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Record one learner turn.
    ///
    /// Empty content is rejected and leaves `metrics` untouched. A negative or
    /// non-finite latency is logged and skipped; the turn and its word count
    /// are still recorded.
    pub fn record_learner_turn(
        &self,
        metrics: &mut Metrics,
        content: &str,
        latency_ms: Option<f64>,
        flags: TurnFlags,
    ) -> Result<LearnerSample, SessionError> {
        let word_count = count_words(content);
        if word_count == 0 {
            return Err(SessionError::InvalidInput(
                "learner turn content must not be empty".to_string(),
            ));
        }

        let latency = match latency_ms {
            Some(value) if value.is_finite() && value >= 0.0 => Some(value),
            Some(value) => {
                warn!(latency_ms = value, "Rejecting invalid latency sample");
                None
            }
            None => None,
        };

        let n = metrics.word_counts.len() as f64;
        metrics.average_word_count = Some(running_average(
            metrics.average_word_count,
            n,
            word_count as f64,
        ));
        metrics.word_counts.push(word_count);
        metrics.total_exchanges += 1;

        let mut hesitation = false;
        if let Some(latency) = latency {
            let n = metrics.response_latencies_ms.len() as f64;
            metrics.average_latency_ms = Some(running_average(
                metrics.average_latency_ms,
                n,
                latency,
            ));
            metrics.response_latencies_ms.push(latency);

            // Unrounded, so 5000.4 ms is over a 5000 ms threshold
            if latency > self.config.hesitation_threshold_ms as f64 {
                metrics.hesitation_count += 1;
                hesitation = true;
            }
        }

        if flags.is_assist_request {
            metrics.assist_count += 1;
        }
        if flags.is_high_quality_response {
            metrics.good_response_count += 1;
        }
        if flags.hint_given {
            metrics.hints_given += 1;
        }

        Ok(LearnerSample {
            word_count,
            latency_ms: latency.map(|value| value.round() as u64),
            hesitation,
        })
    }
}

/// Whitespace-separated word count.
pub fn count_words(content: &str) -> u32 {
    content.split_whitespace().count() as u32
}

fn running_average(previous: Option<f64>, n: f64, value: f64) -> f64 {
    match previous {
        Some(avg) => (avg * n + value) / (n + 1.0),
        None => value,
    }
}
