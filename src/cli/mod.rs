use clap::Parser;

pub const DEFAULT_DOMAIN_REMINDER: &str =
    "\n . Но не забывай, что ты помощник по математике и только математике";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Completion Provider Args ---
    /// API key sent as a bearer token to the completion endpoint
    #[arg(long, env = "KEY", default_value = "")]
    pub api_key: String,

    /// Model identifier for chat completion (e.g., gemma2-9b-it, llama-3.1-8b-instant)
    #[arg(long, env = "ID", default_value = "gemma2-9b-it")]
    pub model: String,

    /// Full URL of the chat completion endpoint
    #[arg(long, env = "URL", default_value = "https://api.groq.com/openai/v1/chat/completions")]
    pub completion_url: String,

    // --- Prompt Args ---
    /// System prompt used for question answering
    #[arg(long, env = "SYSTEM")]
    pub system_prompt: Option<String>,

    /// System prompt used when asking the model for graph parameters
    #[arg(long, env = "GRAPH")]
    pub graph_prompt: Option<String>,

    /// Optional JSON file ({"system": "...", "graph": "..."}) supplying prompts not set directly.
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    /// Suffix appended to the latest user message to keep the model on math topics.
    #[arg(long, env = "DOMAIN_REMINDER", default_value = DEFAULT_DOMAIN_REMINDER)]
    pub domain_reminder: String,

    // --- Rendering Args ---
    /// TrueType font used for graph legends. Common system locations are tried when unset.
    #[arg(long, env = "GRAPH_FONT_PATH")]
    pub font_path: Option<String>,

    // --- General App Args ---
    /// Host address and port for the HTTP server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "0.0.0.0:8000")]
    pub server_addr: String,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}
