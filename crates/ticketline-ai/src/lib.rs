//! LLM layer: two interchangeable summary backends (local Ollama, remote
//! OpenRouter), a fixed retry policy, and parsing of model output into the
//! five-section summary shape.

mod error;
pub use error::LlmError;

pub mod backend;
pub mod config;
pub mod dispatcher;
pub mod ollama;
pub mod openrouter;
pub mod parse;
pub mod retry;

pub use backend::LlmBackend;
pub use config::{LlmSettings, OllamaSettings, OpenRouterSettings, Provider};
pub use dispatcher::{Dispatcher, SummaryOutcome};
pub use ollama::{OllamaBackend, list_models};
pub use openrouter::OpenRouterBackend;
pub use parse::{ParseError, parse_summary};
pub use retry::{RetryExhausted, RetryPolicy};
