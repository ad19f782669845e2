pub mod prompt;

use crate::cli::Args;
use prompt::{ PromptConfig, PromptError };
use std::time::Duration;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const TEMPERATURE: f32 = 0.5;
pub const MAX_TOKENS: u32 = 1500;

/// Completion endpoint settings, fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub api_key: String,
    pub model: String,
    pub url: String,
    pub prompts: PromptConfig,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub completion: CompletionSettings,
    pub domain_reminder: String,
    pub font_path: Option<String>,
}

impl Settings {
    pub fn from_args(args: &Args) -> Result<Self, PromptError> {
        let prompts = PromptConfig::resolve(
            args.system_prompt.as_deref(),
            args.graph_prompt.as_deref(),
            args.prompts_path.as_deref()
        )?;

        Ok(Self {
            completion: CompletionSettings {
                api_key: args.api_key.clone(),
                model: args.model.clone(),
                url: args.completion_url.clone(),
                prompts,
                timeout: REQUEST_TIMEOUT,
            },
            domain_reminder: args.domain_reminder.clone(),
            font_path: args.font_path.clone().filter(|p| !p.trim().is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn settings_follow_args() {
        let args = Args::parse_from([
            "math-tutor",
            "--api-key",
            "secret",
            "--model",
            "llama3",
            "--completion-url",
            "http://localhost:9999/v1/chat/completions",
            "--system-prompt",
            "be a tutor",
            "--graph-prompt",
            "emit graph config",
            "--font-path",
            " ",
        ]);
        let settings = Settings::from_args(&args).unwrap();

        assert_eq!(settings.completion.api_key, "secret");
        assert_eq!(settings.completion.model, "llama3");
        assert_eq!(settings.completion.prompts.system, "be a tutor");
        assert_eq!(settings.completion.prompts.graph, "emit graph config");
        assert_eq!(settings.completion.timeout, Duration::from_secs(10));
        assert!(settings.font_path.is_none());
    }
}
