//! Backend selection, retry, and error fallback for one summary request.

use std::time::Instant;

use ticketline_core::{Prompt, StructuredSummary};
use tracing::info;

use crate::backend::LlmBackend;
use crate::config::{LlmSettings, Provider};
use crate::ollama::OllamaBackend;
use crate::openrouter::OpenRouterBackend;
use crate::parse::parse_summary;
use crate::retry::{RetryExhausted, RetryPolicy};
use crate::LlmError;

/// Result of one summary request. Never an `Err`: exhausted retries produce
/// an error summary with `is_error` set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOutcome {
    pub summary: StructuredSummary,
    pub is_error: bool,
    /// Attempts made, including the successful one.
    pub attempts: u32,
    /// Name of the backend that served the request.
    pub backend: &'static str,
}

pub struct Dispatcher {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::with_retry(RetryPolicy::default())
    }

    pub fn with_retry(retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            retry,
        }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Backend for the provider selected in `settings`.
    ///
    /// Resolved on every call so a changed selection applies to the next
    /// request without rebuilding the dispatcher.
    pub fn backend_for(&self, settings: &LlmSettings) -> Box<dyn LlmBackend> {
        match settings.provider {
            Provider::Ollama => Box::new(OllamaBackend::new(
                self.client.clone(),
                settings.ollama.clone(),
                settings.timeout,
            )),
            Provider::OpenRouter => Box::new(OpenRouterBackend::new(
                self.client.clone(),
                settings.openrouter.clone(),
                settings.timeout,
            )),
        }
    }

    pub async fn summarize(&self, settings: &LlmSettings, prompt: &Prompt) -> SummaryOutcome {
        let backend = self.backend_for(settings);
        self.summarize_with(backend.as_ref(), prompt).await
    }

    /// Request a summary from `backend`, retrying transport, status, empty,
    /// and unparseable responses alike.
    pub async fn summarize_with(&self, backend: &dyn LlmBackend, prompt: &Prompt) -> SummaryOutcome {
        let name = backend.name();
        let start = Instant::now();

        let result = self
            .retry
            .run(|_attempt| async move {
                let text = backend.complete(prompt).await?;
                parse_summary(&text).map_err(|source| LlmError::Parse {
                    backend: name,
                    source,
                })
            })
            .await;

        match result {
            Ok((summary, attempts)) => {
                info!(
                    backend = name,
                    model = backend.model(),
                    attempts,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "summary generated"
                );
                SummaryOutcome {
                    summary,
                    is_error: false,
                    attempts,
                    backend: name,
                }
            }
            Err(RetryExhausted {
                attempts,
                last_error,
            }) => SummaryOutcome {
                summary: StructuredSummary::error_fallback(format!(
                    "After {attempts} retries: {last_error}"
                )),
                is_error: true,
                attempts,
                backend: name,
            },
        }
    }
}
