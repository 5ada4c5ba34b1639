//! Scripted partner lines used when generation is unavailable

use std::sync::LazyLock;

use regex::Regex;

use crate::session::phase::Phase;

use super::traits::UtterancePurpose;

static LEADING_GRADE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:grades?\s*)?(k|\d{1,2})\b").expect("grade pattern is valid")
});

/// Coarse age group used to pick scripted wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GradeBand {
    Elementary,
    Middle,
    High,
    General,
}

impl GradeBand {
    /// Classify a free-form grade band such as `"K-2"`, `"3-5"` or `"grade 7"`
    /// by its lowest grade.
    pub fn classify(grade_band: &str) -> Self {
        let Some(caps) = LEADING_GRADE.captures(grade_band) else {
            return Self::General;
        };
        let first = &caps[1];
        let grade = if first.eq_ignore_ascii_case("k") {
            0
        } else {
            first.parse::<u8>().unwrap_or(u8::MAX)
        };
        match grade {
            0..=5 => Self::Elementary,
            6..=8 => Self::Middle,
            9..=12 => Self::High,
            _ => Self::General,
        }
    }
}

/// Scripted line for a phase, age group, and purpose. Never empty.
pub fn fallback_line(phase: Phase, band: GradeBand, purpose: UtterancePurpose) -> &'static str {
    use GradeBand::*;

    match (purpose, phase) {
        (UtterancePurpose::Greeting, _) => match band {
            Elementary => "Hi there! I'm so glad you're here. Let's practice talking together. How are you today?",
            Middle => "Hey! Thanks for joining. Let's practice a conversation. How's your day going?",
            High => "Hi, good to see you. Let's run through a conversation together. How has your day been?",
            General => "Hello! Let's practice a conversation together. How are you doing today?",
        },
        (UtterancePurpose::WrapUp, _) | (_, Phase::Complete) => match band {
            Elementary => "You did a great job today! Thanks for practicing with me. See you next time!",
            Middle => "Nice work today. Thanks for practicing, see you next time!",
            High => "Good session. Thanks for putting in the practice, talk to you next time.",
            General => "Thanks for practicing today. Great work, see you next time!",
        },
        (_, Phase::Intro) => match band {
            Elementary => "That's great! Can you tell me a little more about that?",
            Middle => "Cool. Tell me a bit more about that.",
            High => "Interesting. Could you say more about that?",
            General => "Thanks for sharing. Can you tell me more?",
        },
        (_, Phase::Practice) => match band {
            Elementary => "I like that! What would you say next?",
            Middle => "Okay, that makes sense. What would you say next?",
            High => "Got it. How would you keep the conversation going from here?",
            General => "I see. What would you say next?",
        },
        (_, Phase::Feedback) => match band {
            Elementary => "Strength: You kept talking and shared your ideas.\nTip: Try asking me a question back!",
            Middle => "Strength: You stayed on topic.\nTip: Try asking a follow-up question to keep things going.",
            High => "Strength: Your answers were clear.\nTip: Try building on what the other person said before changing topics.",
            General => "Strength: You stayed engaged.\nTip: Try asking a follow-up question next time.",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::feedback::parse_feedback;

    #[test]
    fn classify_recognizes_common_bands() {
        assert_eq!(GradeBand::classify("K-2"), GradeBand::Elementary);
        assert_eq!(GradeBand::classify("3-5"), GradeBand::Elementary);
        assert_eq!(GradeBand::classify("6-8"), GradeBand::Middle);
        assert_eq!(GradeBand::classify("grade 7"), GradeBand::Middle);
        assert_eq!(GradeBand::classify("9-12"), GradeBand::High);
    }

    #[test]
    fn classify_unknown_is_general() {
        assert_eq!(GradeBand::classify("adult"), GradeBand::General);
        assert_eq!(GradeBand::classify(""), GradeBand::General);
        assert_eq!(GradeBand::classify("42"), GradeBand::General);
    }

    #[test]
    fn every_combination_has_a_line() {
        let phases = [Phase::Intro, Phase::Practice, Phase::Feedback, Phase::Complete];
        let bands = [
            GradeBand::Elementary,
            GradeBand::Middle,
            GradeBand::High,
            GradeBand::General,
        ];
        let purposes = [
            UtterancePurpose::Greeting,
            UtterancePurpose::Reply,
            UtterancePurpose::WrapUp,
        ];
        for phase in phases {
            for band in bands {
                for purpose in purposes {
                    assert!(!fallback_line(phase, band, purpose).trim().is_empty());
                }
            }
        }
    }

    #[test]
    fn scripted_feedback_parses_into_strength_and_tip() {
        let bands = [
            GradeBand::Elementary,
            GradeBand::Middle,
            GradeBand::High,
            GradeBand::General,
        ];
        for band in bands {
            let line = fallback_line(Phase::Feedback, band, UtterancePurpose::Reply);
            let parsed = parse_feedback(line);
            assert!(parsed.is_parsed(), "{:?} feedback did not parse", band);

            let feedback = parsed.feedback();
            assert_eq!(feedback.strengths.len(), 1, "{:?}", band);
            assert_eq!(feedback.tips.len(), 1, "{:?}", band);
            assert!(!feedback.strengths[0].contains("Tip:"), "{:?}", band);
            assert!(feedback.tips[0].starts_with("Try"), "{:?}", band);
        }
    }

    #[test]
    fn wrap_up_differs_from_greeting() {
        let greeting = fallback_line(Phase::Intro, GradeBand::Middle, UtterancePurpose::Greeting);
        let wrap_up = fallback_line(Phase::Complete, GradeBand::Middle, UtterancePurpose::WrapUp);
        assert_ne!(greeting, wrap_up);
    }
}
