pub mod groq;
#[cfg(test)]
pub(crate) mod scripted;

use crate::config::prompt::PromptConfig;
use crate::models::chat::ChatMessage;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{ Deserialize, Serialize };
use thiserror::Error;

pub use groq::GroqClient;

/// Selects which system prompt leads the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    Answer,
    Graph,
}

impl PromptMode {
    pub fn system_prompt<'a>(&self, prompts: &'a PromptConfig) -> &'a str {
        match self {
            PromptMode::Answer => &prompts.system,
            PromptMode::Graph => &prompts.graph,
        }
    }
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Completion endpoint returned {status}: {body}")]
    Upstream {
        status: StatusCode,
        body: String,
    },
    #[error("Request error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Failed to decode completion response: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("Completion response contained no choices")]
    EmptyChoices,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub choices: Vec<Choice>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionResponse {
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                message: ChoiceMessage { content: Some(content.into()) },
            }],
        }
    }

    /// Text of the first choice. A missing `content` reads as empty text.
    pub fn first_content(&self) -> Result<&str, CompletionError> {
        self.choices
            .first()
            .map(|c| c.message.content.as_deref().unwrap_or(""))
            .ok_or(CompletionError::EmptyChoices)
    }
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Sends `messages` behind the system prompt for `mode`.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        mode: PromptMode
    ) -> Result<CompletionResponse, CompletionError>;

    fn model(&self) -> &str;
}
