use thiserror::Error;

use crate::parse::ParseError;

/// Failure of a single backend attempt. Every variant is retried.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{backend} Error: {source}")]
    Transport {
        backend: &'static str,
        source: reqwest::Error,
    },

    /// Non-success reply from a backend that reports only the code.
    #[error("{backend} Error: Status code {status}")]
    Status { backend: &'static str, status: u16 },

    /// Non-success reply from a backend that reports the response body.
    #[error("{backend} Error: {status} - {body}")]
    Rejected {
        backend: &'static str,
        status: u16,
        body: String,
    },

    #[error("No valid content in {backend} response")]
    EmptyResponse { backend: &'static str },

    #[error("Invalid JSON response from {backend}: {source}")]
    Parse {
        backend: &'static str,
        source: ParseError,
    },

    #[error("{backend} is not configured: {reason}")]
    Config {
        backend: &'static str,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ollama_status_omits_body() {
        let err = LlmError::Status {
            backend: "Ollama",
            status: 503,
        };
        assert_eq!(err.to_string(), "Ollama Error: Status code 503");
    }

    #[test]
    fn openrouter_rejection_carries_body() {
        let err = LlmError::Rejected {
            backend: "OpenRouter",
            status: 429,
            body: "rate limited".into(),
        };
        assert_eq!(err.to_string(), "OpenRouter Error: 429 - rate limited");
    }
}
