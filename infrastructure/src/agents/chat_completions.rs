//! OpenAI-compatible chat-completions agent.
//!
//! Works against any endpoint speaking the `/chat/completions` protocol
//! (vLLM, Ollama, hosted APIs). The agent's specialty prompt becomes the
//! system message; the rendered [`InvocationContext`] is the user message.

use crate::config::FileProviderConfig;
use async_trait::async_trait;
use mdt_application::{AgentCapability, CapabilityError, InvocationContext};
use mdt_domain::AgentProfile;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Build the HTTP client shared by every chat-completions agent.
pub fn build_client(provider: &FileProviderConfig) -> Result<Client, CapabilityError> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    if let Some(key) = provider.resolve_api_key() {
        let auth = header::HeaderValue::from_str(&format!("Bearer {}", key))
            .map_err(|e| CapabilityError::Other(format!("Invalid API key format: {}", e)))?;
        headers.insert(header::AUTHORIZATION, auth);
    }

    Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| CapabilityError::Other(format!("Failed to create HTTP client: {}", e)))
}

pub struct ChatCompletionsAgent {
    profile: AgentProfile,
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatCompletionsAgent {
    pub fn new(profile: AgentProfile, client: Client, provider: &FileProviderConfig) -> Self {
        Self {
            profile,
            client,
            endpoint: format!("{}/chat/completions", provider.api_base.trim_end_matches('/')),
            model: provider.model.clone(),
            temperature: provider.temperature,
            max_tokens: provider.max_tokens,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn transport_error(e: reqwest::Error) -> CapabilityError {
    if e.is_timeout() {
        CapabilityError::Timeout
    } else if e.is_connect() {
        CapabilityError::ConnectionError(e.to_string())
    } else {
        CapabilityError::RequestFailed(e.to_string())
    }
}

#[async_trait]
impl AgentCapability for ChatCompletionsAgent {
    fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    async fn speak(&self, context: &InvocationContext) -> Result<String, CapabilityError> {
        let system = self.profile.effective_prompt();
        let user = context.render();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(
            "POST {} for {} (round {})",
            self.endpoint, self.profile.id, context.round
        );
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(CapabilityError::RequestFailed(format!(
                "HTTP {}: {}",
                status, message
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(transport_error)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(CapabilityError::EmptyResponse)
    }
}
