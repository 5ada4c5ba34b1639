//! Ollama-backed dialogue partner.
//!
//! Sends the session context to a local Ollama instance through its
//! non-streaming `/api/chat` endpoint and returns the assistant message.

use async_trait::async_trait;
use rehearse_core::{
    DialogueContext, DialogueGenerator, GenerationError, Phase, Role, UtterancePurpose,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Message in an Ollama chat request/response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaChatMessage {
    pub role: String,
    pub content: String,
}

impl OllamaChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// Request body for Ollama's `/api/chat` endpoint.
#[derive(Debug, Serialize)]
pub struct OllamaChatRequest {
    pub model: String,
    pub messages: Vec<OllamaChatMessage>,
    pub stream: bool,
}

/// Response from Ollama's `/api/chat` endpoint.
#[derive(Debug, Deserialize)]
pub struct OllamaChatResponse {
    pub message: OllamaChatMessage,
}

pub struct OllamaGenerator {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the chat transcript for a generation request.
    ///
    /// Partner turns become `assistant` messages and learner turns `user`
    /// messages, preceded by a system prompt describing the role play.
    pub fn messages(context: &DialogueContext) -> Vec<OllamaChatMessage> {
        let mut messages = vec![OllamaChatMessage::new("system", system_prompt(context))];

        messages.extend(context.history.iter().map(|turn| {
            let role = match turn.role {
                Role::Partner => "assistant",
                Role::Learner => "user",
            };
            OllamaChatMessage::new(role, turn.content.clone())
        }));

        // Ollama expects the last message to come from the user
        let needs_cue = messages.last().is_none_or(|m| m.role != "user");
        if needs_cue {
            let cue = match context.purpose {
                UtterancePurpose::Greeting => "(The conversation is starting. Greet me.)",
                UtterancePurpose::WrapUp => "(The practice is over. Say goodbye.)",
                UtterancePurpose::Reply => "(Continue the conversation.)",
            };
            messages.push(OllamaChatMessage::new("user", cue));
        }

        messages
    }
}

fn system_prompt(context: &DialogueContext) -> String {
    let mut prompt = format!(
        "You are a friendly conversation partner helping a student in grade band {} \
         practice social skills. Scenario: {}.",
        context.grade_band, context.scenario
    );
    if let Some(details) = &context.scenario_details {
        prompt.push_str(&format!(" Details: {}.", details));
    }
    prompt.push_str(&format!(
        " Difficulty {:.1} on a 1-5 scale; use simpler words and shorter sentences at lower levels.",
        context.difficulty_level
    ));

    let instruction = match (context.purpose, context.phase) {
        (UtterancePurpose::Greeting, _) => "Open the conversation with a short, warm greeting.",
        (UtterancePurpose::WrapUp, _) | (_, Phase::Complete) => {
            "Close the conversation warmly in one or two sentences."
        }
        (_, Phase::Intro) => "Get to know the student. Keep replies to one or two sentences.",
        (_, Phase::Practice) => {
            "Stay in character for the scenario and keep the conversation going with a question."
        }
        (_, Phase::Feedback) => {
            "Step out of character and give feedback as lines starting with \
             'Strength:' and 'Tip:', then a rating like '7/10'."
        }
    };
    prompt.push(' ');
    prompt.push_str(instruction);
    prompt
}

#[async_trait]
impl DialogueGenerator for OllamaGenerator {
    async fn generate(&self, context: &DialogueContext) -> Result<String, GenerationError> {
        let url = format!("{}/api/chat", self.base_url);
        let request = OllamaChatRequest {
            model: self.model.clone(),
            messages: Self::messages(context),
            stream: false,
        };

        debug!(
            session_id = %context.session_id,
            model = %self.model,
            messages = request.messages.len(),
            "Requesting partner turn from Ollama"
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Failed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Failed(format!(
                "Ollama API returned {}: {}",
                status, body
            )));
        }

        let chat: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Failed(e.to_string()))?;

        Ok(chat.message.content.trim().to_string())
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
