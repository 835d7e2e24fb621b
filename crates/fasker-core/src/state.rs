//! UI-agnostic conversation state
//!
//! This module contains the message model and the state transitions shared by
//! every front end. Nothing here touches the network or the terminal: the
//! dispatcher in [`crate::session`] drives these transitions around the one
//! outbound request.

use tracing::{debug, info};

use crate::error::ChatError;

/// First message of every conversation, shown at startup and after reset.
pub const SEEDED_GREETING: &str =
    "Hello! I'm FaskerAI, your AI assistant. How can I help you today?";

/// Monotonic message identifier, unique for the life of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub u64);

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
}

/// A validated submission ready to go over the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub prompt: String,
    pub credential: String,
}

#[derive(Debug, Clone)]
pub struct ConversationState {
    messages: Vec<Message>,
    input: String,
    awaiting_response: bool,
    sidebar_open: bool,
    credential: Option<String>,
    next_id: u64,
}

impl ConversationState {
    pub fn new(credential: Option<String>) -> Self {
        let mut state = Self {
            messages: Vec::new(),
            input: String::new(),
            awaiting_response: false,
            sidebar_open: false,
            credential: credential.filter(|c| !c.trim().is_empty()),
            next_id: 0,
        };
        state.push(Sender::Bot, SEEDED_GREETING.to_string());
        state
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.awaiting_response
    }

    pub fn sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_open = !self.sidebar_open;
    }

    /// Validate `text` and, if it may be sent, record the user message and
    /// mark the conversation as awaiting a response.
    ///
    /// Returns `None` when nothing should be sent: blank input and a request
    /// already in flight are silent no-ops, while a missing credential appends
    /// one bot error message.
    pub fn begin_submit(&mut self, text: &str) -> Option<Submission> {
        if text.trim().is_empty() {
            return None;
        }
        if self.awaiting_response {
            debug!("submission ignored, request already in flight");
            return None;
        }
        let Some(credential) = self.credential.clone() else {
            info!("submission rejected, no credential configured");
            self.push(Sender::Bot, ChatError::MissingCredential.to_bot_text());
            return None;
        };

        self.push(Sender::User, text.to_string());
        self.input.clear();
        self.awaiting_response = true;

        Some(Submission {
            prompt: text.to_string(),
            credential,
        })
    }

    /// Record the outcome of the in-flight request. Always clears the
    /// awaiting flag.
    pub fn finish(&mut self, outcome: Result<String, ChatError>) {
        let text = match outcome {
            Ok(reply) => reply,
            Err(err) => err.to_bot_text(),
        };
        self.push(Sender::Bot, text);
        self.awaiting_response = false;
    }

    /// Back to the seeded greeting with the sidebar closed.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.push(Sender::Bot, SEEDED_GREETING.to_string());
        self.sidebar_open = false;
    }

    fn push(&mut self, sender: Sender, text: String) {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.messages.push(Message { id, text, sender });
    }
}
