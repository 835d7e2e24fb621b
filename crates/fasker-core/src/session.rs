//! The chat session: one conversation plus the backend that answers it.

use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::ai::TextGenerator;
use crate::error::ChatError;
use crate::state::{ConversationState, Submission};

pub struct ChatSession {
    state: ConversationState,
    generator: Arc<dyn TextGenerator>,
}

impl ChatSession {
    pub fn new(generator: Arc<dyn TextGenerator>, credential: Option<String>) -> Self {
        Self {
            state: ConversationState::new(credential),
            generator,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ConversationState {
        &mut self.state
    }

    /// Shared handle to the backend, for running a request off the UI loop.
    pub fn generator(&self) -> Arc<dyn TextGenerator> {
        Arc::clone(&self.generator)
    }

    /// Send `text` and record the reply (or the failure) in the conversation.
    ///
    /// Never fails: blank input and overlapping submissions are no-ops, and
    /// every error becomes a bot message.
    pub async fn submit(&mut self, text: &str) {
        let Some(submission) = self.begin_submit(text) else {
            return;
        };
        let outcome = self
            .generator
            .generate(&submission.credential, &submission.prompt)
            .await;
        self.finish(outcome);
    }

    /// First half of [`submit`](Self::submit), for callers that run the
    /// request themselves.
    pub fn begin_submit(&mut self, text: &str) -> Option<Submission> {
        let submission = self.state.begin_submit(text)?;
        info!(
            model = self.generator.model(),
            prompt_chars = submission.prompt.chars().count(),
            "dispatching prompt"
        );
        Some(submission)
    }

    /// Second half of [`submit`](Self::submit).
    pub fn finish(&mut self, outcome: Result<String, ChatError>) {
        if let Err(err) = &outcome {
            info!(error = %err, "submission failed");
        }
        self.state.finish(outcome);
    }

    pub fn reset_conversation(&mut self) {
        info!(discarded = self.state.messages().len(), "starting new chat");
        self.state.reset();
    }
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSession")
            .field("state", &self.state)
            .field("model", &self.generator.model())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::state::{Sender, SEEDED_GREETING};

    /// Canned backend that records every prompt it receives.
    struct MockGenerator {
        reply: Result<String, ChatError>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl MockGenerator {
        fn replying(reply: Result<String, ChatError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for MockGenerator {
        async fn generate(&self, _credential: &str, prompt: &str) -> Result<String, ChatError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone()
        }

        fn model(&self) -> &str {
            "mock"
        }
    }

    fn texts(session: &ChatSession) -> Vec<(Sender, String)> {
        session
            .state()
            .messages()
            .iter()
            .map(|m| (m.sender, m.text.clone()))
            .collect()
    }

    #[tokio::test]
    async fn submit_appends_user_then_bot() {
        let mock = MockGenerator::replying(Ok("4".to_string()));
        let mut session = ChatSession::new(mock.clone(), Some("key".to_string()));

        session.submit("2+2?").await;

        assert_eq!(
            texts(&session),
            vec![
                (Sender::Bot, SEEDED_GREETING.to_string()),
                (Sender::User, "2+2?".to_string()),
                (Sender::Bot, "4".to_string()),
            ]
        );
        assert!(!session.state().is_awaiting_response());
        assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn each_request_carries_only_current_text() {
        let mock = MockGenerator::replying(Ok("ok".to_string()));
        let mut session = ChatSession::new(mock.clone(), Some("key".to_string()));

        session.submit("first").await;
        session.submit("second").await;

        assert_eq!(*mock.prompts.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn missing_credential_never_calls_backend() {
        let mock = MockGenerator::replying(Ok("unreachable".to_string()));
        let mut session = ChatSession::new(mock.clone(), None);

        session.submit("hello").await;

        assert_eq!(mock.calls.load(Ordering::SeqCst), 0);
        let messages = session.state().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].sender, Sender::Bot);
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let mock = MockGenerator::replying(Ok("unreachable".to_string()));
        let mut session = ChatSession::new(mock.clone(), Some("key".to_string()));

        session.submit("   ").await;

        assert_eq!(mock.calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.state().messages().len(), 1);
    }

    #[tokio::test]
    async fn submit_while_awaiting_is_ignored() {
        let mock = MockGenerator::replying(Ok("late".to_string()));
        let mut session = ChatSession::new(mock.clone(), Some("key".to_string()));

        session.begin_submit("in flight").unwrap();
        session.submit("impatient").await;

        assert_eq!(mock.calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.state().messages().len(), 2);
        assert!(session.state().is_awaiting_response());
    }

    #[tokio::test]
    async fn api_failure_becomes_bot_message() {
        let mock = MockGenerator::replying(Err(ChatError::Api {
            status: 500,
            message: Some("quota exceeded".to_string()),
        }));
        let mut session = ChatSession::new(mock, Some("key".to_string()));

        session.submit("hello").await;

        let last = session.state().messages().last().unwrap();
        assert_eq!(last.sender, Sender::Bot);
        assert!(last.text.contains("quota exceeded"));
        assert!(!session.state().is_awaiting_response());
    }

    #[tokio::test]
    async fn reset_discards_history() {
        let mock = MockGenerator::replying(Ok("reply".to_string()));
        let mut session = ChatSession::new(mock, Some("key".to_string()));
        for prompt in ["a", "b", "c"] {
            session.submit(prompt).await;
        }
        session.state_mut().toggle_sidebar();

        session.reset_conversation();

        assert_eq!(texts(&session), vec![(Sender::Bot, SEEDED_GREETING.to_string())]);
        assert!(!session.state().sidebar_open());
    }
}
