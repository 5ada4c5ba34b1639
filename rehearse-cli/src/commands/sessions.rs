//! Stored session commands

use anyhow::Result;
use clap::{Args, Subcommand};
use rehearse_core::{Role, SessionRecord, SessionStore};

use super::open_store;
use crate::config::ConfigLoader;

/// Sessions arguments
#[derive(Args, Debug)]
pub struct SessionsArgs {
    #[command(subcommand)]
    pub command: SessionsCommands,
}

/// Sessions subcommands
#[derive(Subcommand, Debug)]
pub enum SessionsCommands {
    /// List stored sessions, newest first
    List {
        /// Only show sessions of this participant
        #[arg(long)]
        participant: Option<String>,
    },
    /// Show a session's transcript and results
    Show {
        /// Session ID to show
        session_id: String,

        /// Print the full record as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Run sessions command
pub async fn run(args: SessionsArgs) -> Result<()> {
    match args.command {
        SessionsCommands::List { participant } => list_sessions(participant.as_deref()).await,
        SessionsCommands::Show { session_id, json } => show_session(&session_id, json).await,
    }
}

async fn list_sessions(participant: Option<&str>) -> Result<()> {
    let config = ConfigLoader::load()?;
    let store = open_store(&config).await?;

    let mut sessions: Vec<_> = store
        .list_sessions()
        .await?
        .into_iter()
        .filter(|s| participant.is_none_or(|p| s.participant_id() == p))
        .collect();
    sessions.sort_by_key(|s| std::cmp::Reverse(s.created_at()));

    if sessions.is_empty() {
        println!("No stored sessions");
        return Ok(());
    }

    println!("Stored sessions:");
    println!();
    for session in &sessions {
        println!("  {}", session_line(session));
    }
    Ok(())
}

async fn show_session(session_id: &str, json: bool) -> Result<()> {
    let config = ConfigLoader::load()?;
    let store = open_store(&config).await?;

    let Some(record) = store.load(session_id).await? else {
        anyhow::bail!("Session not found: {}", session_id);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("Session:     {}", record.session_id());
    println!("Participant: {}", record.participant_id());
    println!("Scenario:    {} (grade {})", record.scenario(), record.grade_band());
    println!(
        "Phase:       {} after {} exchanges",
        record.phase(),
        record.exchange_count()
    );
    println!("Difficulty:  {:.1}", record.difficulty_level());
    let performance = record.performance();
    println!(
        "Result:      score {}, points {}",
        performance.score, performance.points
    );
    println!();
    for turn in record.turn_history() {
        let speaker = match turn.role {
            Role::Partner => "partner",
            Role::Learner => "you",
        };
        println!("[{:>8}] {:>7}: {}", turn.phase.as_str(), speaker, turn.content);
    }
    Ok(())
}

fn session_line(record: &SessionRecord) -> String {
    let status = if record.is_complete() {
        format!("score {:>3}", record.performance().score)
    } else {
        format!("{:>9}", record.phase().as_str())
    };
    format!(
        "{}  {}  {}  {} exchanges  {}",
        record.session_id(),
        record.participant_id(),
        status,
        record.exchange_count(),
        record.scenario()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rehearse_core::session::NewSession;

    fn record() -> SessionRecord {
        let now = Utc::now();
        SessionRecord::new(
            NewSession {
                participant_id: "learner-4".to_string(),
                grade_band: "6-8".to_string(),
                scenario: "asking for directions".to_string(),
                ..NewSession::default()
            },
            now,
        )
        .unwrap()
        .start(now)
    }

    #[test]
    fn session_line_shows_phase_for_open_sessions() {
        let record = record();
        let line = session_line(&record);

        assert!(line.starts_with(record.session_id()));
        assert!(line.contains("learner-4"));
        assert!(line.contains("intro"));
        assert!(line.contains("0 exchanges"));
        assert!(line.ends_with("asking for directions"));
    }
}
