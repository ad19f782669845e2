pub mod literal;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use thiserror::Error;

static REASONING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());
static OBJECT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[\s\S]*\}").unwrap());

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("No valid JSON could be extracted from the response ({})", format_attempts(.attempts))]
    NoValidJson {
        attempts: Vec<(&'static str, String)>,
    },
}

fn format_attempts(attempts: &[(&'static str, String)]) -> String {
    attempts
        .iter()
        .map(|(name, reason)| format!("{}: {}", name, reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// One way of turning completion text into JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The whole text is strict JSON.
    Strict,
    /// Strict JSON between the first `{` and the last `}`.
    EmbeddedObject,
    /// Python-style literal syntax (single quotes, `True`, `None`, ...).
    Literal,
}

/// Tried in order; the first success wins.
pub const STRATEGIES: &[Strategy] = &[Strategy::Strict, Strategy::EmbeddedObject, Strategy::Literal];

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Strict => "strict",
            Strategy::EmbeddedObject => "embedded object",
            Strategy::Literal => "literal",
        }
    }

    pub fn parse(&self, text: &str) -> Result<JsonValue, String> {
        match self {
            Strategy::Strict => serde_json::from_str(text).map_err(|e| e.to_string()),
            Strategy::EmbeddedObject => {
                let found = OBJECT_RE.find(text).ok_or_else(|| "no braces found".to_string())?;
                serde_json::from_str(found.as_str()).map_err(|e| e.to_string())
            }
            Strategy::Literal => literal::parse(text).map_err(|e| e.to_string()),
        }
    }
}

/// Removes `<think>...</think>` spans and surrounding whitespace.
pub fn strip_reasoning(text: &str) -> String {
    REASONING_RE.replace_all(text, "").trim().to_string()
}

pub fn recover(text: &str) -> Result<JsonValue, RecoveryError> {
    recover_with(text, STRATEGIES)
}

pub fn recover_with(text: &str, strategies: &[Strategy]) -> Result<JsonValue, RecoveryError> {
    let cleaned = strip_reasoning(text);
    let mut attempts = Vec::with_capacity(strategies.len());

    for strategy in strategies {
        match strategy.parse(&cleaned) {
            Ok(value) => {
                if !attempts.is_empty() {
                    debug!("Recovered completion JSON with the {} strategy", strategy.name());
                }
                return Ok(value);
            }
            Err(reason) => attempts.push((strategy.name(), reason)),
        }
    }

    Err(RecoveryError::NoValidJson { attempts })
}
