//! Remote OpenRouter chat-completions backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ticketline_core::Prompt;
use tracing::debug;

use crate::backend::LlmBackend;
use crate::config::OpenRouterSettings;
use crate::parse::strip_code_fences;
use crate::LlmError;

const BACKEND: &str = "OpenRouter";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Serialize)]
struct ContentPart<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    /// Text of the first choice with code fences removed.
    fn into_content(self) -> Option<String> {
        let content = self.choices.into_iter().next()?.message.content?;
        let stripped = strip_code_fences(&content);
        (!stripped.is_empty()).then_some(stripped)
    }
}

pub struct OpenRouterBackend {
    client: reqwest::Client,
    settings: OpenRouterSettings,
    timeout: Duration,
}

impl OpenRouterBackend {
    pub fn new(client: reqwest::Client, settings: OpenRouterSettings, timeout: Duration) -> Self {
        Self {
            client,
            settings,
            timeout,
        }
    }

    fn request<'a>(&'a self, prompt: &'a Prompt) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![ContentPart {
                    kind: "text",
                    text: &prompt.text,
                }],
            }],
        }
    }
}

#[async_trait]
impl LlmBackend for OpenRouterBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let api_key = match self.settings.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => key,
            _ => {
                return Err(LlmError::Config {
                    backend: BACKEND,
                    reason: "OPENROUTER_API_KEY is not set".into(),
                });
            }
        };
        debug!(url = %self.settings.endpoint, model = %self.settings.model, "requesting OpenRouter completion");

        let resp = self
            .client
            .post(&self.settings.endpoint)
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|source| LlmError::Transport {
                backend: BACKEND,
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Rejected {
                backend: BACKEND,
                status: status.as_u16(),
                body,
            });
        }

        let result: ChatResponse = resp.json().await.map_err(|source| LlmError::Transport {
            backend: BACKEND,
            source,
        })?;
        result
            .into_content()
            .ok_or(LlmError::EmptyResponse { backend: BACKEND })
    }
}
