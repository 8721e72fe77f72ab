use super::client::{ChatMessage, LlmClient};
use super::{build_prompt, clean_response, InferenceError, SelectorInference};
use crate::config::{InferenceConfig, ENV_API_KEY, ENV_OPENAI_API_KEY};
use crate::result::{LocusError, LocusResult};
use async_trait::async_trait;
use std::time::Duration;

/// Selector inference backed by an OpenAI-compatible chat endpoint
#[derive(Debug, Clone)]
pub struct LlmSelectorInference {
    client: LlmClient,
    temperature: f64,
    max_tokens: u32,
    timeout: Duration,
}

impl LlmSelectorInference {
    /// Build from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LocusError::MissingCredential`] when no API key is set.
    pub fn new(config: &InferenceConfig) -> LocusResult<Self> {
        let key = config
            .credential()
            .ok_or_else(|| LocusError::MissingCredential {
                variables: format!("{ENV_API_KEY} or {ENV_OPENAI_API_KEY}"),
            })?;
        let client = LlmClient::new(config.base_url.as_str(), config.model.as_str()).with_api_key(key);
        Ok(Self {
            client,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.timeout(),
        })
    }

    /// Underlying HTTP client
    #[must_use]
    pub const fn client(&self) -> &LlmClient {
        &self.client
    }
}

#[async_trait]
impl SelectorInference for LlmSelectorInference {
    async fn find_selector(
        &self,
        markup: &str,
        description: &str,
    ) -> Result<Option<String>, InferenceError> {
        let messages = vec![ChatMessage::user(build_prompt(markup, description))];
        let call = self
            .client
            .chat_completion(messages, Some(self.temperature), Some(self.max_tokens));
        let response = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| InferenceError::Timeout {
                ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })??;
        let content = response
            .first_content()
            .ok_or(InferenceError::EmptyResponse)?;
        Ok(clean_response(content))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_rejected() {
        let err = LlmSelectorInference::new(&InferenceConfig::default()).unwrap_err();
        assert!(matches!(err, LocusError::MissingCredential { .. }));
        assert!(err.to_string().contains("LOCUS_API_KEY"));
    }

    #[test]
    fn test_blank_key_is_rejected() {
        let config = InferenceConfig::default().with_api_key("   ");
        assert!(LlmSelectorInference::new(&config).is_err());
    }

    #[test]
    fn test_builds_client_from_config() {
        let config = InferenceConfig::default()
            .with_api_key("sk-test")
            .with_base_url("http://127.0.0.1:9999/")
            .with_model("local-model")
            .with_timeout(1_500);
        let inference = LlmSelectorInference::new(&config).unwrap();
        assert_eq!(inference.client().base_url(), "http://127.0.0.1:9999");
        assert_eq!(inference.client().model(), "local-model");
        assert_eq!(inference.timeout, Duration::from_millis(1_500));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_an_error() {
        let config = InferenceConfig::default()
            .with_api_key("sk-test")
            .with_base_url("http://127.0.0.1:1")
            .with_timeout(5_000);
        let inference = LlmSelectorInference::new(&config).unwrap();
        let result = inference.find_selector("<body></body>", "anything").await;
        assert!(matches!(
            result,
            Err(InferenceError::Backend(_) | InferenceError::Timeout { .. })
        ));
    }
}
