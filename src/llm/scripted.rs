//! Canned completion client for tests.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Mutex;

use super::{ CompletionClient, CompletionError, CompletionResponse, PromptMode };
use crate::models::chat::ChatMessage;

pub enum Reply {
    Content(String),
    Status(StatusCode, String),
}

pub struct ScriptedClient {
    reply: Reply,
    pub calls: Mutex<Vec<(Vec<ChatMessage>, PromptMode)>>,
}

impl ScriptedClient {
    pub fn content(content: impl Into<String>) -> Self {
        Self { reply: Reply::Content(content.into()), calls: Mutex::new(Vec::new()) }
    }

    pub fn status(status: StatusCode, body: impl Into<String>) -> Self {
        Self { reply: Reply::Status(status, body.into()), calls: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        mode: PromptMode
    ) -> Result<CompletionResponse, CompletionError> {
        self.calls.lock().unwrap().push((messages, mode));
        match &self.reply {
            Reply::Content(content) => Ok(CompletionResponse::from_content(content.clone())),
            Reply::Status(status, body) =>
                Err(CompletionError::Upstream { status: *status, body: body.clone() }),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
