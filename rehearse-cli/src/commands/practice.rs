//! Interactive practice session in the terminal
//!
//! The learner types replies on stdin. Latency is measured from the moment
//! the partner's line is printed until the reply is read.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::Args;
use rehearse_core::{
    EndOutcome, EngineConfig, FeedbackParse, MemoryEventBus, Phase, PracticeSessionManager,
    StartOptions, TurnFlags, TurnOptions, TurnOutcome,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use super::open_store;
use crate::config::ConfigLoader;
use crate::generator;

const DEFAULT_ASSIST_TEXT: &str = "Can you help me with what to say?";

#[derive(Args, Debug)]
pub struct PracticeArgs {
    /// Participant practicing
    #[arg(long)]
    pub participant: String,

    /// Grade band, e.g. "K-2", "6-8"
    #[arg(long)]
    pub grade: String,

    /// Scenario to rehearse
    #[arg(long)]
    pub scenario: String,

    /// Extra scenario details for the partner
    #[arg(long)]
    pub details: Option<String>,

    /// Starting difficulty (1-5); defaults to the advisor's recommendation
    #[arg(long)]
    pub level: Option<f64>,

    /// Topic mastery percentage (0-100)
    #[arg(long)]
    pub mastery: Option<f64>,
}

/// A line typed by the learner.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LearnerInput {
    Say(String),
    Assist(String),
    Hint,
    Quit,
    Empty,
}

fn parse_input(line: &str) -> LearnerInput {
    let line = line.trim();
    if line.is_empty() {
        return LearnerInput::Empty;
    }
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };
    match command {
        "/quit" | "/exit" => LearnerInput::Quit,
        "/hint" => LearnerInput::Hint,
        "/assist" if rest.is_empty() => LearnerInput::Assist(DEFAULT_ASSIST_TEXT.to_string()),
        "/assist" => LearnerInput::Assist(rest.to_string()),
        _ => LearnerInput::Say(line.to_string()),
    }
}

fn hint_for(phase: Phase) -> &'static str {
    match phase {
        Phase::Intro => "Say hello and share one thing about yourself.",
        Phase::Practice => "Answer, then ask a question about what they just said.",
        Phase::Feedback => "Thank your partner and say what you want to try next time.",
        Phase::Complete => "The session is over.",
    }
}

pub async fn run(args: PracticeArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let store = Arc::new(open_store(&config).await?);
    let generator = generator::from_config(&config.generator);
    info!(generator = generator.name(), "Starting practice");

    let manager = PracticeSessionManager::new(
        store,
        generator,
        Arc::new(MemoryEventBus::default()),
        config.engine.clone(),
    );

    let level = match args.level {
        Some(level) => level,
        None => recommended_level(&manager, &config.engine, &args).await?,
    };

    let started = manager
        .start(
            &args.participant,
            &args.grade,
            &args.scenario,
            StartOptions {
                scenario_details: args.details.clone(),
                difficulty_level: Some(level),
                mastery_percent: args.mastery,
            },
        )
        .await?;

    println!(
        "Session {} ({}, level {:.1}). Type /hint, /assist [text] or /quit.",
        started.session_id, started.phase, started.difficulty_level
    );
    println!();
    print_partner(&started.greeting, started.degraded);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut phase = started.phase;
    let mut hint_given = false;
    let mut prompted_at = Instant::now();

    loop {
        prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let (content, is_assist_request) = match parse_input(&line) {
            LearnerInput::Empty => continue,
            LearnerInput::Quit => break,
            LearnerInput::Hint => {
                println!("  hint: {}", hint_for(phase));
                hint_given = true;
                continue;
            }
            LearnerInput::Assist(text) => (text, true),
            LearnerInput::Say(text) => (text, false),
        };

        let latency_ms = prompted_at.elapsed().as_secs_f64() * 1000.0;
        let outcome = manager
            .continue_session(
                &started.session_id,
                &content,
                TurnOptions {
                    latency_ms: Some(latency_ms),
                    flags: TurnFlags {
                        is_assist_request,
                        hint_given,
                        ..TurnFlags::default()
                    },
                },
            )
            .await?;
        hint_given = false;

        print_turn(&outcome);
        phase = outcome.phase;
        prompted_at = Instant::now();

        if !outcome.should_continue {
            break;
        }
    }

    let ended = manager.end(&started.session_id).await?;
    print_end(&ended);
    Ok(())
}

/// Advisor level from stored history, falling back to level 1.
async fn recommended_level(
    manager: &PracticeSessionManager,
    engine: &EngineConfig,
    args: &PracticeArgs,
) -> Result<f64> {
    let summaries = manager
        .recent_summaries(&args.participant, engine.advisor.window_size)
        .await?;
    let Some(latest) = summaries.first() else {
        return Ok(engine.advisor.min_level);
    };

    let recommendation = manager.assess_difficulty(
        &summaries,
        latest.difficulty_level,
        args.mastery.unwrap_or(0.0),
    );
    println!(
        "Level {} recommended ({})",
        recommendation.recommended_level, recommendation.reason
    );
    Ok(recommendation.unrounded_level)
}

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

fn print_partner(text: &str, degraded: bool) {
    let marker = if degraded { " (scripted)" } else { "" };
    println!("partner{}: {}", marker, text);
}

fn print_turn(outcome: &TurnOutcome) {
    if let Some(transition) = &outcome.transition {
        println!(
            "-- {} -> {} ({}) --",
            transition.from, transition.to, transition.reason
        );
    }
    print_partner(&outcome.response, outcome.degraded);

    if let Some(FeedbackParse::Parsed(feedback)) = &outcome.feedback {
        for strength in &feedback.strengths {
            println!("  + {}", strength);
        }
        for tip in &feedback.tips {
            println!("  > {}", tip);
        }
        if let Some(rating) = feedback.rating {
            println!("  rating: {}/10", rating);
        }
    }
}

fn print_end(ended: &EndOutcome) {
    let summary = &ended.summary;
    println!();
    println!("Session complete.");
    println!("  Score:     {}", summary.score);
    println!("  Points:    {}", summary.points);
    println!("  Exchanges: {}", summary.exchange_count);
    println!("  Level:     {:.1}", summary.difficulty_level);
}
