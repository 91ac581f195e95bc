//! Backend selection and per-backend settings.
//!
//! Settings are plain values handed to the dispatcher on every call; nothing
//! here reads the process environment.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_OLLAMA_URL: &str = "http://ollama:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5:7b";
pub const DEFAULT_OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_OPENROUTER_MODEL: &str = "qwen/qwen2.5-vl-72b-instruct:free";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    /// Local Ollama server.
    #[default]
    Ollama,
    /// Remote OpenRouter chat-completions API.
    OpenRouter,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenRouter => "openrouter",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown LLM provider {0:?} (expected \"ollama\" or \"openrouter\")")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openrouter" => Ok(Self::OpenRouter),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OllamaSettings {
    /// Server root, e.g. `http://localhost:11434` (no trailing slash needed).
    pub base_url: String,
    pub model: String,
    pub num_ctx: u32,
    pub temperature: f32,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            num_ctx: 4096,
            temperature: 0.1,
        }
    }
}

#[derive(Clone)]
pub struct OpenRouterSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for OpenRouterSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OPENROUTER_ENDPOINT.to_string(),
            model: DEFAULT_OPENROUTER_MODEL.to_string(),
            api_key: None,
        }
    }
}

impl fmt::Debug for OpenRouterSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterSettings")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Everything the dispatcher needs to pick and call a backend.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: Provider,
    pub ollama: OllamaSettings,
    pub openrouter: OpenRouterSettings,
    /// Per-attempt request timeout.
    pub timeout: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            ollama: OllamaSettings::default(),
            openrouter: OpenRouterSettings::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl LlmSettings {
    /// Model name of the selected backend.
    pub fn model(&self) -> &str {
        match self.provider {
            Provider::Ollama => &self.ollama.model,
            Provider::OpenRouter => &self.openrouter.model,
        }
    }
}
