pub mod ai;
pub mod config;
pub mod error;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use ai::{GeminiClient, TextGenerator};
pub use config::{Config, CredentialSource, Overrides, Settings};
pub use error::ChatError;
pub use session::ChatSession;
pub use state::{ConversationState, Message, MessageId, Sender, Submission, SEEDED_GREETING};
