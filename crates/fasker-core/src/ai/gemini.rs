use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::TextGenerator;
use crate::error::ChatError;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Serialize, Debug, PartialEq)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize, Debug, PartialEq)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Debug, PartialEq)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

impl GeminiRequest {
    fn single_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
        }
    }
}

// Response side: every field optional so absence is caught in one place,
// `parse_reply`, instead of as a serde error.

#[derive(Deserialize, Debug)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    error: Option<GeminiApiError>,
}

#[derive(Deserialize, Debug)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Deserialize, Debug)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize, Debug)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GeminiApiError {
    message: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GeminiErrorEnvelope {
    error: GeminiApiError,
}

/// Turn a raw HTTP status and body into the reply text, or the error kind
/// the conversation should show.
pub fn parse_reply(status: u16, body: &str) -> Result<String, ChatError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<GeminiErrorEnvelope>(body)
            .ok()
            .and_then(|envelope| envelope.error.message);
        return Err(ChatError::Api { status, message });
    }

    let response: GeminiResponse =
        serde_json::from_str(body).map_err(|_| ChatError::MalformedResponse)?;

    if let Some(error) = response.error {
        return Err(ChatError::Api {
            status,
            message: error.message,
        });
    }

    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or(ChatError::MalformedResponse)
}

#[derive(Clone, Debug)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
}

impl GeminiClient {
    pub fn new(endpoint: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    pub async fn query(&self, credential: &str, prompt: &str) -> Result<String, ChatError> {
        let request = GeminiRequest::single_prompt(prompt);

        debug!(model = %self.model, prompt_chars = prompt.chars().count(), "sending generateContent request");

        let response = self
            .client
            .post(self.url())
            .query(&[("key", credential)])
            .json(&request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        let reply = parse_reply(status, &body);
        match &reply {
            Ok(text) => debug!(status, reply_chars = text.chars().count(), "received reply"),
            Err(err) => warn!(status, error = %err, "generateContent request failed"),
        }
        reply
    }
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT, DEFAULT_MODEL)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, credential: &str, prompt: &str) -> Result<String, ChatError> {
        self.query(credential, prompt).await
    }

    fn model(&self) -> &str {
        &self.model
    }
}
