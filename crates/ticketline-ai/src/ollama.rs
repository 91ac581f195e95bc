//! Local Ollama backend (`POST /api/generate`) and model listing
//! (`GET /api/tags`).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ticketline_core::Prompt;
use tracing::{debug, info};

use crate::backend::LlmBackend;
use crate::config::OllamaSettings;
use crate::LlmError;

const BACKEND: &str = "Ollama";

pub const SYSTEM_PROMPT: &str =
    "You are a technical support analyst. Always respond with valid JSON.";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    format: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    num_ctx: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

pub struct OllamaBackend {
    client: reqwest::Client,
    settings: OllamaSettings,
    timeout: Duration,
}

impl OllamaBackend {
    pub fn new(client: reqwest::Client, settings: OllamaSettings, timeout: Duration) -> Self {
        Self {
            client,
            settings,
            timeout,
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.settings.base_url.trim_end_matches('/'))
    }

    fn request<'a>(&'a self, prompt: &'a Prompt) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.settings.model,
            prompt: &prompt.text,
            system: SYSTEM_PROMPT,
            format: "json",
            stream: false,
            options: GenerateOptions {
                num_ctx: self.settings.num_ctx,
                temperature: self.settings.temperature,
            },
        }
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let url = self.generate_url();
        debug!(url = %url, model = %self.settings.model, "requesting Ollama completion");

        let resp = self
            .client
            .post(&url)
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
            return Err(LlmError::Status {
                backend: BACKEND,
                status: status.as_u16(),
            });
        }

        let result: GenerateResponse = resp.json().await.map_err(|source| LlmError::Transport {
            backend: BACKEND,
            source,
        })?;
        if result.response.trim().is_empty() {
            return Err(LlmError::EmptyResponse { backend: BACKEND });
        }
        Ok(result.response)
    }
}

/// Names of the models installed on an Ollama server.
pub async fn list_models(client: &reqwest::Client, base_url: &str) -> Result<Vec<String>, LlmError> {
    let url = format!("{}/api/tags", base_url.trim_end_matches('/'));
    info!(url = %url, "listing Ollama models");

    let resp = client.get(&url).send().await.map_err(|source| LlmError::Transport {
        backend: BACKEND,
        source,
    })?;
    let status = resp.status();
    if !status.is_success() {
        return Err(LlmError::Status {
            backend: BACKEND,
            status: status.as_u16(),
        });
    }

    let tags: TagsResponse = resp.json().await.map_err(|source| LlmError::Transport {
        backend: BACKEND,
        source,
    })?;
    let names: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
    info!(count = names.len(), "listed Ollama models");
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> Prompt {
        Prompt {
            payload: "[]".into(),
            text: "Summarize these tickets".into(),
        }
    }

    fn backend(base_url: &str) -> OllamaBackend {
        OllamaBackend::new(
            reqwest::Client::new(),
            OllamaSettings {
                base_url: base_url.into(),
                ..Default::default()
            },
            Duration::from_secs(5),
        )
    }

    #[test]
    fn generate_url_trims_trailing_slash() {
        assert_eq!(
            backend("http://localhost:11434/").generate_url(),
            "http://localhost:11434/api/generate"
        );
    }

    #[test]
    fn request_body_shape() {
        let backend = backend("http://localhost:11434");
        let p = prompt();
        let body = serde_json::to_value(backend.request(&p)).unwrap();
        assert_eq!(body["model"], "qwen2.5:7b");
        assert_eq!(body["prompt"], "Summarize these tickets");
        assert_eq!(body["system"], SYSTEM_PROMPT);
        assert_eq!(body["format"], "json");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_ctx"], 4096);
        assert!((body["options"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn generate_response_parse() {
        let json = r#"{"model":"qwen2.5:7b","created_at":"2024-01-01T00:00:00Z","response":"{\"a\":1}","done":true}"#;
        let parsed: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.response, "{\"a\":1}");
    }

    #[test]
    fn tags_response_parse() {
        let json = r#"{"models":[{"name":"qwen2.5:7b","size":1},{"name":"llama3:8b"}]}"#;
        let parsed: TagsResponse = serde_json::from_str(json).unwrap();
        let names: Vec<_> = parsed.models.into_iter().map(|m| m.name).collect();
        assert_eq!(names, ["qwen2.5:7b", "llama3:8b"]);

        let empty: TagsResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.models.is_empty());
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let backend = backend("http://127.0.0.1:1");
        let err = backend.complete(&prompt()).await.unwrap_err();
        assert!(matches!(err, LlmError::Transport { backend: "Ollama", .. }));
        assert!(err.to_string().starts_with("Ollama Error: "));
    }
}
