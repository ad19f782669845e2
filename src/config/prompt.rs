use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use log::{ info, warn };

#[derive(Debug)]
pub enum PromptError {
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::IoError(e) => write!(f, "Prompt file IO error: {}", e),
            PromptError::JsonError(e) => write!(f, "Prompt JSON parsing error: {}", e),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(e) => Some(e),
            PromptError::JsonError(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        PromptError::IoError(err)
    }
}

impl From<serde_json::Error> for PromptError {
    fn from(err: serde_json::Error) -> Self {
        PromptError::JsonError(err)
    }
}

/// The two system prompts, one per completion mode.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptConfig {
    #[serde(default)]
    pub system: String,
    #[serde(default)]
    pub graph: String,
}

impl PromptConfig {
    pub fn from_json(content: &str) -> Result<Self, PromptError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Prompts given directly win over the ones read from `path`.
    pub fn resolve(
        system: Option<&str>,
        graph: Option<&str>,
        path: Option<&str>
    ) -> Result<Self, PromptError> {
        let mut config = match path {
            Some(path) => {
                info!("Loading prompts from '{}'", path);
                Self::from_json(&fs::read_to_string(path)?)?
            }
            None => Self::default(),
        };

        if let Some(system) = system {
            config.system = system.to_string();
        }
        if let Some(graph) = graph {
            config.graph = graph.to_string();
        }

        if config.system.is_empty() {
            warn!("No question-answering system prompt configured (SYSTEM).");
        }
        if config.graph.is_empty() {
            warn!("No graph system prompt configured (GRAPH).");
        }
        Ok(config)
    }
}
