use async_trait::async_trait;
use log::{ debug, error };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::Serialize;
use std::error::Error as StdError;

use super::{ CompletionClient, CompletionError, CompletionResponse, PromptMode };
use crate::config::{ CompletionSettings, MAX_TOKENS, TEMPERATURE };
use crate::config::prompt::PromptConfig;
use crate::models::chat::ChatMessage;

/// OpenAI-compatible chat completion client (Groq by default).
pub struct GroqClient {
    http: HttpClient,
    model: String,
    url: String,
    prompts: PromptConfig,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct GroqRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

impl GroqClient {
    pub fn new(settings: &CompletionSettings) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", settings.api_key)).map_err(|e|
                format!("Invalid API key format: {}", e)
            )?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| Box::new(e) as Box<dyn StdError + Send + Sync>)?;

        Ok(Self {
            http,
            model: settings.model.clone(),
            url: settings.url.clone(),
            prompts: settings.prompts.clone(),
        })
    }

    fn build_messages(&self, messages: Vec<ChatMessage>, mode: PromptMode) -> Vec<ChatMessage> {
        let mut full = Vec::with_capacity(messages.len() + 1);
        full.push(ChatMessage::system(mode.system_prompt(&self.prompts)));
        full.extend(messages);
        full
    }
}

#[async_trait]
impl CompletionClient for GroqClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        mode: PromptMode
    ) -> Result<CompletionResponse, CompletionError> {
        let req = GroqRequest {
            model: &self.model,
            messages: self.build_messages(messages, mode),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            response_format: ResponseFormat { kind: "json_object" },
        };
        debug!("Sending {} messages to {} ({:?} mode)", req.messages.len(), self.url, mode);

        let resp = self.http
            .post(&self.url)
            .json(&req)
            .send().await
            .map_err(CompletionError::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!("Completion endpoint returned {}: {}", status, body);
            return Err(CompletionError::Upstream { status, body });
        }

        resp.json::<CompletionResponse>().await.map_err(CompletionError::Decode)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
