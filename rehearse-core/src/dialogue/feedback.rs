//! Best-effort extraction of structured feedback from partner text
//!
//! Generators are asked to phrase feedback as `Strength: ...` and `Tip: ...`
//! lines with an optional `n/10` rating, but nothing guarantees it. Parsing
//! therefore never fails: text without recognizable structure yields a
//! [`FeedbackParse::Fallback`] that still carries usable content.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static LABELED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(?:[-*•]\s*)?(strengths?|tips?|try)\s*:\s*(.+?)\s*$")
        .expect("feedback line pattern is valid")
});

static RATING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(10|[0-9])\s*/\s*10\b").expect("rating pattern is valid")
});

const DEFAULT_TIP: &str = "Keep practicing and try asking a follow-up question.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredFeedback {
    pub strengths: Vec<String>,
    pub tips: Vec<String>,
    /// Rating out of 10, when the text gave one.
    pub rating: Option<u8>,
    /// The full partner text.
    pub text: String,
}

/// Outcome of parsing feedback text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "feedback", rename_all = "snake_case")]
pub enum FeedbackParse {
    Parsed(StructuredFeedback),
    Fallback(StructuredFeedback),
}

impl FeedbackParse {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }

    pub fn feedback(&self) -> &StructuredFeedback {
        match self {
            Self::Parsed(f) | Self::Fallback(f) => f,
        }
    }

    pub fn into_feedback(self) -> StructuredFeedback {
        match self {
            Self::Parsed(f) | Self::Fallback(f) => f,
        }
    }
}

pub fn parse_feedback(text: &str) -> FeedbackParse {
    let text = text.trim();
    let mut feedback = StructuredFeedback {
        text: text.to_string(),
        ..StructuredFeedback::default()
    };

    for caps in LABELED_LINE.captures_iter(text) {
        let value = caps[2].to_string();
        if caps[1].to_ascii_lowercase().starts_with("strength") {
            feedback.strengths.push(value);
        } else {
            feedback.tips.push(value);
        }
    }
    feedback.rating = RATING
        .captures(text)
        .and_then(|caps| caps[1].parse::<u8>().ok());

    if feedback.strengths.is_empty() && feedback.tips.is_empty() && feedback.rating.is_none() {
        feedback.tips.push(DEFAULT_TIP.to_string());
        return FeedbackParse::Fallback(feedback);
    }
    FeedbackParse::Parsed(feedback)
}
