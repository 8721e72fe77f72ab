//! Selector inference: reduced markup + description -> selector candidate.

pub mod client;
mod llm;
mod scripted;

pub use client::{ChatMessage, ChatResponse, LlmClient, LlmClientError, Role};
pub use llm::LlmSelectorInference;
pub use scripted::{InferenceCall, ScriptedInference};

use async_trait::async_trait;
use std::borrow::Cow;
use std::fmt::Debug;

/// Literal the model answers with when nothing matches
pub const NOT_FOUND_SENTINEL: &str = "NOT_FOUND";

const FENCE: &str = "```";

/// Why an inference call produced no answer at all
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InferenceError {
    /// Transport, authentication or server failure
    #[error("backend request failed: {0}")]
    Backend(String),
    /// The call did not finish in time
    #[error("backend did not answer within {ms}ms")]
    Timeout {
        /// Configured timeout in milliseconds
        ms: u64,
    },
    /// The backend answered without any completion choice
    #[error("backend returned no completion")]
    EmptyResponse,
}

impl From<LlmClientError> for InferenceError {
    fn from(err: LlmClientError) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Turns a reduced page snapshot and a description into a selector
#[async_trait]
pub trait SelectorInference: Send + Sync + Debug {
    /// `Ok(Some(selector))` for a candidate, `Ok(None)` when the model reports
    /// that no element matches, `Err` when the backend itself failed.
    async fn find_selector(
        &self,
        markup: &str,
        description: &str,
    ) -> Result<Option<String>, InferenceError>;
}

/// Build the fixed instruction prompt
#[must_use]
pub fn build_prompt(markup: &str, description: &str) -> String {
    format!(
        "You are an expert in web test automation.\n\
         Find the element described as: \"{description}\"\n\
         in the HTML below and return one CSS selector that uniquely identifies it.\n\
         \n\
         Rules:\n\
         - Reply with the selector only, on a single line.\n\
         - No explanations, no quotes, no markdown code fences.\n\
         - Prefer id, data-testid, name, aria-label or other stable attributes over position.\n\
         - If no element matches the description, reply exactly {NOT_FOUND_SENTINEL}.\n\
         \n\
         HTML:\n\
         {markup}\n"
    )
}

/// Normalize a raw model answer.
///
/// Strips code fences (and a `css` language tag inside them), wrapping
/// backticks and surrounding whitespace. Empty answers and the
/// [`NOT_FOUND_SENTINEL`] become `None`.
#[must_use]
pub fn clean_response(raw: &str) -> Option<String> {
    let unfenced: Cow<'_, str> = if raw.contains(FENCE) {
        let stripped = raw.replace(FENCE, "");
        let body = stripped.trim_start();
        let body = body
            .strip_prefix("css")
            .filter(|rest| rest.starts_with(char::is_whitespace))
            .unwrap_or(body);
        Cow::Owned(body.to_string())
    } else {
        Cow::Borrowed(raw)
    };

    let text = unfenced.trim();
    let text = text
        .strip_prefix('`')
        .and_then(|t| t.strip_suffix('`'))
        .map_or(text, str::trim);

    if text.is_empty() || text == NOT_FOUND_SENTINEL {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_plain_selector() {
        assert_eq!(clean_response("  #go \n"), Some("#go".to_string()));
    }

    #[test]
    fn test_clean_strips_fences_and_language_tag() {
        assert_eq!(clean_response("```css\n#go\n```"), Some("#go".to_string()));
        assert_eq!(clean_response("```\nbutton[type=\"submit\"]\n```"), Some("button[type=\"submit\"]".to_string()));
        assert_eq!(clean_response("```css #go```"), Some("#go".to_string()));
    }

    #[test]
    fn test_clean_keeps_selectors_that_start_with_css() {
        assert_eq!(clean_response("```.css-button```"), Some(".css-button".to_string()));
        assert_eq!(clean_response("```css-grid```"), Some("css-grid".to_string()));
    }

    #[test]
    fn test_clean_strips_inline_backticks() {
        assert_eq!(clean_response("`#go`"), Some("#go".to_string()));
    }

    #[test]
    fn test_clean_sentinel_and_empty() {
        assert_eq!(clean_response("NOT_FOUND"), None);
        assert_eq!(clean_response("```\nNOT_FOUND\n```"), None);
        assert_eq!(clean_response("   "), None);
        assert_eq!(clean_response("```css\n```"), None);
    }

    #[test]
    fn test_prompt_contains_inputs_and_rules() {
        let prompt = build_prompt("<button id=\"go\">Go</button>", "Go button");
        assert!(prompt.contains("\"Go button\""));
        assert!(prompt.contains("<button id=\"go\">Go</button>"));
        assert!(prompt.contains("NOT_FOUND"));
        assert!(prompt.contains("code fences"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        assert_eq!(build_prompt("<a></a>", "link"), build_prompt("<a></a>", "link"));
    }
}
