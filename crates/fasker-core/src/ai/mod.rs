pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;

use crate::error::ChatError;

/// A backend that turns one prompt into one reply.
///
/// The session only ever holds one of these behind an `Arc`, so the TUI can
/// hand a clone to a spawned task while the session keeps its own.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, credential: &str, prompt: &str) -> Result<String, ChatError>;

    /// Model name shown in the status readout
    fn model(&self) -> &str;
}
