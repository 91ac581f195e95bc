use async_trait::async_trait;
use ticketline_core::Prompt;

use crate::LlmError;

/// One model endpoint that turns a prompt into raw response text.
///
/// Implementations perform a single attempt; retrying and parsing belong to
/// the [`Dispatcher`](crate::Dispatcher).
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Name used in error messages and logs, e.g. `"Ollama"`.
    fn name(&self) -> &'static str;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    async fn complete(&self, prompt: &Prompt) -> Result<String, LlmError>;
}
