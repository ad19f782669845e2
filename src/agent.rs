use crate::config::Settings;
use crate::graph::{ GraphRenderer, RenderError };
use crate::llm::{ CompletionClient, CompletionError, GroqClient, PromptMode };
use crate::models::answer::StructuredAnswer;
use crate::models::chat::{ summarize_conversation, ChatMessage };
use crate::models::graph::GraphConfig;
use crate::recovery::{ self, RecoveryError };

use log::{ debug, info };
use serde_json::Value as JsonValue;
use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Conversation has no messages")]
    EmptyConversation,
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error(transparent)]
    Recovery(#[from] RecoveryError),
    #[error("Model answer has an unexpected shape: {0}")]
    MalformedAnswer(#[source] serde_json::Error),
    #[error("Model graph config has an unexpected shape: {0}")]
    MalformedGraphConfig(#[source] serde_json::Error),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("Render task failed: {0}")]
    RenderTask(String),
}

#[derive(Debug)]
pub struct AskOutcome {
    pub answer: StructuredAnswer,
    /// The conversation as sent, plus the whiteboard note when there is one.
    pub conversation: Vec<ChatMessage>,
}

#[derive(Debug)]
pub struct GraphOutcome {
    pub image: String,
    pub config: JsonValue,
}

#[derive(Clone)]
pub struct TutorAgent {
    client: Arc<dyn CompletionClient>,
    renderer: GraphRenderer,
    domain_reminder: String,
}

impl TutorAgent {
    pub fn new(settings: &Settings) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let client = GroqClient::new(&settings.completion)?;
        info!(
            "Completion client configured: Model={}, URL={}",
            settings.completion.model,
            settings.completion.url
        );
        Ok(Self::with_client(Arc::new(client), settings))
    }

    pub fn with_client(client: Arc<dyn CompletionClient>, settings: &Settings) -> Self {
        Self {
            client,
            renderer: GraphRenderer::new(settings.font_path.clone()),
            domain_reminder: settings.domain_reminder.clone(),
        }
    }

    pub async fn ask(&self, messages: Vec<ChatMessage>) -> Result<AskOutcome, AgentError> {
        let mut conversation = summarize_conversation(messages);
        let last = conversation.last_mut().ok_or(AgentError::EmptyConversation)?;
        last.content.push_str(&self.domain_reminder);

        let response = self.client.complete(conversation.clone(), PromptMode::Answer).await?;
        let value = recovery::recover(response.first_content()?)?;
        let answer = StructuredAnswer::from_value(value).map_err(AgentError::MalformedAnswer)?;
        debug!("{} answered with {} widget(s)", self.client.model(), answer.widgets.len());

        if let Some(content) = answer.whiteboard_content() {
            conversation.push(ChatMessage::assistant(format!("Whiteboard content:\n{}", content)));
        }

        Ok(AskOutcome { answer, conversation })
    }

    pub async fn render_graph(&self, functions: Vec<String>) -> Result<GraphOutcome, AgentError> {
        let request = ChatMessage::user(
            format!("Generate visualization parameters for these functions: {}", list_repr(&functions))
        );
        let response = self.client.complete(vec![request], PromptMode::Graph).await?;
        let config = recovery::recover(response.first_content()?)?;
        let graph: GraphConfig = serde_json
            ::from_value(config.clone())
            .map_err(AgentError::MalformedGraphConfig)?;

        let renderer = self.renderer.clone();
        let image = tokio::task
            ::spawn_blocking(move || renderer.render(&functions, &graph)).await
            .map_err(|e| AgentError::RenderTask(e.to_string()))??;

        Ok(GraphOutcome { image, config })
    }
}

/// `['x', 'x**2']`, the list notation the graph prompt is written against.
fn list_repr(items: &[String]) -> String {
    let quoted = items
        .iter()
        .map(|s| format!("'{}'", s))
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", quoted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use crate::llm::scripted::ScriptedClient;
    use crate::models::chat::Role;
    use clap::Parser;
    use reqwest::StatusCode;

    fn settings() -> Settings {
        let args = Args::parse_from(["math-tutor", "--domain-reminder", " [math only]"]);
        Settings::from_args(&args).unwrap()
    }

    fn agent(client: Arc<ScriptedClient>) -> TutorAgent {
        TutorAgent::with_client(client, &settings())
    }

    #[tokio::test]
    async fn ask_appends_reminder_and_whiteboard_note() {
        let client = Arc::new(
            ScriptedClient::content(
                r#"<think>hmm</think>{"widgets":[{"type":"other"},{"type":"defineWhiteboard","parameters":{"content":"x = 2"}}],"answer":"two"}"#
            )
        );
        let outcome = agent(client.clone())
            .ask(vec![ChatMessage::user("solve x + 2 = 4")]).await
            .unwrap();

        assert_eq!(outcome.answer.answer, "two");
        assert_eq!(outcome.answer.widgets.len(), 2);
        assert_eq!(outcome.conversation.len(), 2);
        assert_eq!(outcome.conversation[0].content, "solve x + 2 = 4 [math only]");
        assert_eq!(outcome.conversation[1].role, Role::Assistant);
        assert_eq!(outcome.conversation[1].content, "Whiteboard content:\nx = 2");

        let calls = client.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, PromptMode::Answer);
        assert_eq!(calls[0].0.len(), 1);
    }

    #[tokio::test]
    async fn ask_without_whiteboard_leaves_conversation_alone() {
        let client = Arc::new(ScriptedClient::content(r#"{"widgets":[{"type":"defineGraph"}],"answer":"ok"}"#));
        let outcome = agent(client).ask(vec![ChatMessage::user("q")]).await.unwrap();
        assert_eq!(outcome.conversation.len(), 1);
    }

    #[tokio::test]
    async fn ask_summarizes_long_conversations() {
        let client = Arc::new(ScriptedClient::content(r#"{"answer":"ok"}"#));
        let messages: Vec<ChatMessage> = (0..7).map(|i| ChatMessage::user(format!("m{}", i))).collect();
        agent(client.clone()).ask(messages).await.unwrap();

        let calls = client.calls.lock().unwrap();
        let sent = &calls[0].0;
        assert_eq!(sent.len(), 6);
        assert_eq!(sent[0].content, "m1");
        assert_eq!(sent[5].content, "m6 [math only]");
    }

    #[tokio::test]
    async fn ask_rejects_empty_conversation() {
        let client = Arc::new(ScriptedClient::content("{}"));
        let err = agent(client.clone()).ask(vec![]).await.unwrap_err();
        assert!(matches!(err, AgentError::EmptyConversation));
        assert!(client.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ask_surfaces_unrecoverable_output() {
        let client = Arc::new(ScriptedClient::content("not json at all"));
        let err = agent(client).ask(vec![ChatMessage::user("q")]).await.unwrap_err();
        assert!(matches!(err, AgentError::Recovery(_)));
    }

    #[tokio::test]
    async fn ask_surfaces_upstream_errors() {
        let client = Arc::new(ScriptedClient::status(StatusCode::UNAUTHORIZED, "bad key"));
        let err = agent(client).ask(vec![ChatMessage::user("q")]).await.unwrap_err();
        assert!(
            matches!(err, AgentError::Completion(CompletionError::Upstream { status, .. }) if status == StatusCode::UNAUTHORIZED)
        );
    }

    #[tokio::test]
    async fn render_graph_uses_graph_prompt_and_returns_config() {
        let client = Arc::new(
            ScriptedClient::content(
                r##"{"graph_config":{"x_range":[-5,5],"y_range":[-5,25],"grid_spacing":2},"styling":{"colors":["#ff0000"],"line_styles":["solid"]}}"##
            )
        );
        let outcome = agent(client.clone())
            .render_graph(vec!["x".into(), "x**2".into()]).await
            .unwrap();

        assert!(outcome.image.starts_with("data:image/png;base64,"));
        assert_eq!(outcome.config["graph_config"]["grid_spacing"], 2);

        let calls = client.calls.lock().unwrap();
        assert_eq!(calls[0].1, PromptMode::Graph);
        assert_eq!(
            calls[0].0[0].content,
            "Generate visualization parameters for these functions: ['x', 'x**2']"
        );
    }

    #[tokio::test]
    async fn render_graph_fails_on_bad_function() {
        let client = Arc::new(ScriptedClient::content("{}"));
        let err = agent(client).render_graph(vec!["x".into(), "sin(".into()]).await.unwrap_err();
        assert!(
            matches!(err, AgentError::Render(RenderError::Function { ref function, .. }) if function == "sin(")
        );
    }

    #[tokio::test]
    async fn render_graph_rejects_misshapen_config() {
        let client = Arc::new(ScriptedClient::content(r#"{"graph_config":{"x_range":"wide"}}"#));
        let err = agent(client).render_graph(vec!["x".into()]).await.unwrap_err();
        assert!(matches!(err, AgentError::MalformedGraphConfig(_)));
    }
}
