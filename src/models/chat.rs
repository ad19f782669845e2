use serde::{ Serialize, Deserialize };

/// Conversations longer than this lose their oldest message before being sent.
pub const MAX_CONVERSATION_LEN: usize = 6;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    /// Anything else the client sends (`tool`, `function`, ...) is passed through as is.
    #[serde(untagged)]
    Other(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Crude context bound: once the history is longer than
/// [`MAX_CONVERSATION_LEN`], the first message is dropped.
pub fn summarize_conversation(mut messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    if messages.len() > MAX_CONVERSATION_LEN {
        messages.remove(0);
    }
    messages
}
