use thiserror::Error;

/// Failure of a single submission. Every variant ends up as a visible bot
/// message; none of them ends the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("API key not configured. Set GEMINI_API_KEY or add api_key to the config file.")]
    MissingCredential,

    #[error("network error: {0}")]
    Transport(String),

    #[error("{}", api_error_text(.status, .message))]
    Api { status: u16, message: Option<String> },

    #[error("invalid response format from API")]
    MalformedResponse,
}

impl ChatError {
    /// Text shown in the conversation when a submission fails.
    pub fn to_bot_text(&self) -> String {
        format!("Sorry, I encountered an error: {}", self)
    }
}

impl From<reqwest::Error> for ChatError {
    /// The request URL carries the API key as a query parameter, so it is
    /// stripped before the error text reaches the conversation or the logs.
    fn from(err: reqwest::Error) -> Self {
        ChatError::Transport(err.without_url().to_string())
    }
}

fn api_error_text(status: &u16, message: &Option<String>) -> String {
    match message {
        Some(message) if !message.is_empty() => message.to_string(),
        _ => format!("API request failed with status {}", status),
    }
}
