use super::{clean_response, InferenceError, SelectorInference, NOT_FOUND_SENTINEL};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

type Inspector = Box<dyn Fn(&InferenceCall) + Send + Sync>;

#[derive(Debug, Clone)]
enum Answer {
    Raw(String),
    Fail(String),
}

/// One call received by a [`ScriptedInference`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceCall {
    /// Reduced markup passed in
    pub markup: String,
    /// Element description passed in
    pub description: String,
}

/// Inference that replays queued answers in order.
///
/// Raw answers go through [`clean_response`] like a real model reply.
/// An exhausted script fails the call.
#[derive(Default)]
pub struct ScriptedInference {
    answers: Mutex<VecDeque<Answer>>,
    calls: Mutex<Vec<InferenceCall>>,
    inspector: Option<Inspector>,
}

impl fmt::Debug for ScriptedInference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedInference")
            .field("remaining", &self.remaining())
            .field("calls", &self.call_count())
            .field("inspector", &self.inspector.is_some())
            .finish()
    }
}

impl ScriptedInference {
    /// Empty script
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw model reply
    #[must_use]
    pub fn then_reply(self, raw: impl Into<String>) -> Self {
        self.push(Answer::Raw(raw.into()));
        self
    }

    /// Queue a selector answer
    #[must_use]
    pub fn then_selector(self, selector: impl Into<String>) -> Self {
        self.then_reply(selector)
    }

    /// Queue a "no matching element" answer
    #[must_use]
    pub fn then_not_found(self) -> Self {
        self.then_reply(NOT_FOUND_SENTINEL)
    }

    /// Queue a backend failure
    #[must_use]
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.push(Answer::Fail(message.into()));
        self
    }

    /// Run `inspect` on every call before answering it.
    ///
    /// Panics raised inside the hook fail the calling test.
    #[must_use]
    pub fn with_inspector(mut self, inspect: impl Fn(&InferenceCall) + Send + Sync + 'static) -> Self {
        self.inspector = Some(Box::new(inspect));
        self
    }

    /// Calls received so far
    #[must_use]
    pub fn calls(&self) -> Vec<InferenceCall> {
        match self.calls.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of calls received so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls().len()
    }

    /// Answers not yet consumed
    #[must_use]
    pub fn remaining(&self) -> usize {
        match self.answers.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    fn push(&self, answer: Answer) {
        match self.answers.lock() {
            Ok(mut guard) => guard.push_back(answer),
            Err(poisoned) => poisoned.into_inner().push_back(answer),
        }
    }

    fn next_answer(&self) -> Option<Answer> {
        match self.answers.lock() {
            Ok(mut guard) => guard.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        }
    }
}

#[async_trait]
impl SelectorInference for ScriptedInference {
    async fn find_selector(
        &self,
        markup: &str,
        description: &str,
    ) -> Result<Option<String>, InferenceError> {
        let call = InferenceCall {
            markup: markup.to_string(),
            description: description.to_string(),
        };
        if let Some(inspect) = &self.inspector {
            inspect(&call);
        }
        match self.calls.lock() {
            Ok(mut guard) => guard.push(call),
            Err(poisoned) => poisoned.into_inner().push(call),
        }
        match self.next_answer() {
            Some(Answer::Raw(raw)) => Ok(clean_response(&raw)),
            Some(Answer::Fail(message)) => Err(InferenceError::Backend(message)),
            None => Err(InferenceError::Backend("no scripted answer left".into())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_answers_in_order() {
        let script = ScriptedInference::new()
            .then_reply("```css\n#go\n```")
            .then_not_found()
            .then_fail("503");

        assert_eq!(script.find_selector("<a/>", "first").await.unwrap(), Some("#go".into()));
        assert_eq!(script.find_selector("<a/>", "second").await.unwrap(), None);
        assert_eq!(
            script.find_selector("<a/>", "third").await,
            Err(InferenceError::Backend("503".into()))
        );
        assert!(script.find_selector("<a/>", "fourth").await.is_err());
        assert_eq!(script.remaining(), 0);
    }

    #[tokio::test]
    async fn test_records_calls() {
        let script = ScriptedInference::new().then_selector("#a");
        script.find_selector("<p id=\"a\"></p>", "the paragraph").await.unwrap();
        let calls = script.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].description, "the paragraph");
        assert!(calls[0].markup.contains("id=\"a\""));
        assert_eq!(script.call_count(), 1);
    }

    #[tokio::test]
    async fn test_inspector_sees_every_call() {
        let script = ScriptedInference::new()
            .then_selector("#go")
            .with_inspector(|call| assert!(!call.markup.contains("<script")));
        let answer = script.find_selector("<button id=\"go\">Go</button>", "go").await;
        assert_eq!(answer.unwrap(), Some("#go".into()));
    }

    #[tokio::test]
    #[should_panic(expected = "markup leaked")]
    async fn test_inspector_panics_propagate() {
        let script = ScriptedInference::new()
            .then_selector("#go")
            .with_inspector(|call| assert!(!call.markup.contains("<script"), "markup leaked"));
        let _ = script.find_selector("<script>1</script>", "go").await;
    }
}
