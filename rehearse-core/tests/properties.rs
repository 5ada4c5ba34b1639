//! Property tests for scoring, difficulty, phase ordering and persistence

use std::sync::Arc;

use chrono::Utc;
use proptest::prelude::*;

use rehearse_core::config::{PointsConfig, ScoringConfig};
use rehearse_core::session::NewSession;
use rehearse_core::{
    DifficultyAdvisor, EngineConfig, MemoryEventBus, MemorySessionStore, Metrics,
    MetricsAggregator, MockGenerator, Performance, PerformanceScorer, PracticeSessionManager,
    SessionRecord, SessionSummary, StartOptions, TurnFlags, TurnOptions,
};

#[derive(Debug, Clone)]
struct TurnInput {
    words: usize,
    latency_ms: Option<f64>,
    flags: TurnFlags,
}

fn arb_flags() -> impl Strategy<Value = TurnFlags> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(assist, good, hint)| TurnFlags {
        is_assist_request: assist,
        is_high_quality_response: good,
        hint_given: hint,
    })
}

fn arb_latency() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        Just(None),
        (0.0f64..20_000.0).prop_map(Some),
        (-5_000.0f64..0.0).prop_map(Some),
        Just(Some(f64::NAN)),
    ]
}

fn arb_turn() -> impl Strategy<Value = TurnInput> {
    (1usize..25, arb_latency(), arb_flags()).prop_map(|(words, latency_ms, flags)| TurnInput {
        words,
        latency_ms,
        flags,
    })
}

fn utterance(words: usize) -> String {
    vec!["word"; words].join(" ")
}

fn metrics_from(turns: &[TurnInput]) -> Metrics {
    let aggregator = MetricsAggregator::default();
    let mut metrics = Metrics::new();
    for turn in turns {
        aggregator
            .record_learner_turn(&mut metrics, &utterance(turn.words), turn.latency_ms, turn.flags)
            .unwrap();
    }
    metrics
}

fn arb_scoring_config() -> impl Strategy<Value = ScoringConfig> {
    (
        -200.0f64..300.0,
        -100.0f64..100.0,
        -50.0f64..50.0,
        -100.0f64..100.0,
        0u32..100,
    )
        .prop_map(|(base, good, latency, assist, penalty)| ScoringConfig {
            base_score: base,
            good_response_weight: good,
            latency_adjustment: latency,
            assist_weight: assist,
            points: PointsConfig {
                assist_penalty: penalty,
                ..PointsConfig::default()
            },
            ..ScoringConfig::default()
        })
}

fn summary(score: u8) -> SessionSummary {
    SessionSummary {
        session_id: format!("s-{}", score),
        participant_id: "p".to_string(),
        scenario: "greeting a neighbor".to_string(),
        score,
        points: 0,
        exchange_count: 5,
        difficulty_level: 2.0,
        mastery_percent: None,
        completed_at: Utc::now(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Score stays within [0, 100] for any metrics and any scoring weights
    #[test]
    fn prop_score_is_bounded(
        turns in prop::collection::vec(arb_turn(), 0..30),
        config in arb_scoring_config(),
    ) {
        let metrics = metrics_from(&turns);
        let score = PerformanceScorer::new(config).score(&metrics);
        prop_assert!(score <= 100);
    }

    /// Points are floored at zero even when penalties dominate
    #[test]
    fn prop_points_floor_at_zero_under_heavy_penalty(
        turns in prop::collection::vec(arb_turn(), 1..30),
        penalty in 20u32..1_000,
    ) {
        // One exchange earns at most 10 + 5 + 2 + 3 points
        let assisted: Vec<_> = turns
            .into_iter()
            .map(|t| TurnInput {
                flags: TurnFlags {
                    is_assist_request: true,
                    ..t.flags
                },
                ..t
            })
            .collect();
        let metrics = metrics_from(&assisted);
        let scorer = PerformanceScorer::new(ScoringConfig {
            points: PointsConfig {
                assist_penalty: penalty,
                ..PointsConfig::default()
            },
            ..ScoringConfig::default()
        });

        let Performance { points, .. } = scorer.evaluate(&metrics);
        prop_assert_eq!(points, 0);
    }

    /// Without assists, points grow with every exchange
    #[test]
    fn prop_points_without_assists_cover_exchanges(
        turns in prop::collection::vec(arb_turn(), 0..30),
    ) {
        let unassisted: Vec<_> = turns
            .into_iter()
            .map(|t| TurnInput {
                flags: TurnFlags {
                    is_assist_request: false,
                    ..t.flags
                },
                ..t
            })
            .collect();
        let metrics = metrics_from(&unassisted);
        let points = PerformanceScorer::default().points(&metrics);

        prop_assert!(points >= 10 * unassisted.len() as u32);
    }

    /// Recommended level stays within [1, 5] for any input
    #[test]
    fn prop_difficulty_is_bounded(
        scores in prop::collection::vec(0u8..=100, 0..12),
        current in -10.0f64..20.0,
        mastery in -50.0f64..150.0,
    ) {
        let summaries: Vec<_> = scores.into_iter().map(summary).collect();
        let advisor = DifficultyAdvisor::default();
        let result = advisor.recommend(&summaries, current, mastery);

        prop_assert!((1..=5).contains(&result.recommended_level));
        prop_assert!((1.0..=5.0).contains(&result.unrounded_level));
        prop_assert!((0.0..=1.0).contains(&result.confidence));
    }

    /// Any record built through the reducers survives a JSON round trip
    #[test]
    fn prop_record_roundtrips_through_json(
        turns in prop::collection::vec(arb_turn(), 0..15),
        difficulty in 1.0f64..=5.0,
        mastery in prop::option::of(0.0f64..=100.0),
    ) {
        let now = Utc::now();
        let aggregator = MetricsAggregator::default();
        let mut record = SessionRecord::new(
            NewSession {
                participant_id: "p".to_string(),
                grade_band: "3-5".to_string(),
                scenario: "sharing a snack".to_string(),
                scenario_details: None,
                difficulty_level: Some(difficulty),
                mastery_percent: mastery,
            },
            now,
        )
        .unwrap()
        .start(now)
        .apply_partner_turn("Hi!", now)
        .unwrap();
        for turn in &turns {
            let (next, _) = record
                .apply_learner_turn(&aggregator, &utterance(turn.words), turn.latency_ms, turn.flags, now)
                .unwrap();
            record = next.apply_partner_turn("Go on.", now).unwrap();
        }
        let record = record.next_revision();

        let json = serde_json::to_string(&record).unwrap();
        let restored: SessionRecord = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(restored, record);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    /// Phases observed across continue calls never go backwards
    #[test]
    fn prop_phases_are_monotonic(turns in prop::collection::vec(arb_turn(), 1..25)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let phases = runtime.block_on(async {
            let manager = PracticeSessionManager::new(
                Arc::new(MemorySessionStore::new()),
                Arc::new(MockGenerator::always("I see.")),
                Arc::new(MemoryEventBus::default()),
                EngineConfig::default(),
            );
            let started = manager
                .start("p", "6-8", "asking directions", StartOptions::default())
                .await
                .unwrap();

            let mut phases = vec![started.phase];
            for turn in &turns {
                let outcome = manager
                    .continue_session(
                        &started.session_id,
                        &utterance(turn.words),
                        TurnOptions {
                            latency_ms: turn.latency_ms,
                            flags: turn.flags,
                        },
                    )
                    .await
                    .unwrap();
                phases.push(outcome.phase);
                if !outcome.should_continue {
                    break;
                }
            }
            phases
        });

        prop_assert!(phases.windows(2).all(|w| w[0] <= w[1]), "phases: {:?}", phases);
    }
}
