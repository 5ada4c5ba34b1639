//! Difficulty advice from a participant's stored history

use anyhow::Result;
use clap::Args;
use rehearse_core::{DifficultyAdvisor, SessionStore};

use super::{format_summary, open_store};
use crate::config::ConfigLoader;

#[derive(Args, Debug)]
pub struct AdviseArgs {
    /// Participant to advise on
    #[arg(long)]
    pub participant: String,

    /// Difficulty the participant currently practices at (1-5)
    #[arg(long, default_value_t = 1.0)]
    pub level: f64,

    /// Topic mastery percentage (0-100)
    #[arg(long, default_value_t = 0.0)]
    pub mastery: f64,

    /// Print the recommendation as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: AdviseArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let store = open_store(&config).await?;
    let advisor = DifficultyAdvisor::new(config.engine.advisor.clone());

    let summaries = store
        .list_by_participant(&args.participant, advisor.config().window_size)
        .await?;
    let recommendation = advisor.recommend(&summaries, args.level, args.mastery);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&recommendation)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No completed sessions for {}", args.participant);
    } else {
        println!("Recent sessions for {}:", args.participant);
        for summary in &summaries {
            println!("  {}", format_summary(summary));
        }
    }
    println!();
    println!(
        "Recommended level: {} ({})",
        recommendation.recommended_level, recommendation.reason
    );
    println!("Confidence:        {:.2}", recommendation.confidence);
    if let (Some(average), Some(consistency)) =
        (recommendation.average_score, recommendation.consistency)
    {
        println!("Average score:     {:.1}", average);
        println!("Consistency:       {:.2}", consistency);
    }

    Ok(())
}
