//! AI orchestration
//!
//! This module talks to the generative model: it classifies thoughts,
//! decides how a watered thought grows, and paints plants. Every remote call
//! goes through the same timeout + retry wrapper.

mod backend;
mod client;
mod gemini;
mod prompts;
mod retry;

use std::time::Duration;

pub use backend::{InlineImage, ModelBackend};
pub use client::{placeholder_image_url, AiClient};
pub use gemini::{GeminiBackend, GeminiConfig};
pub use retry::{call_with_retry, RetryPolicy};

/// Errors from the model layer
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("model overloaded: {0}")]
    Overloaded(String),

    #[error("model API error {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("could not decode model response: {0}")]
    Decode(String),

    #[error("API key is missing, set GEMINI_API_KEY or gemini.api_key in the settings file")]
    MissingApiKey,
}

impl AiError {
    /// Whether this failure is transient overload and worth retrying
    pub fn is_overloaded(&self) -> bool {
        match self {
            AiError::Overloaded(_) => true,
            AiError::Remote { status, message } => {
                *status == 503
                    || message.contains("503")
                    || message.to_ascii_lowercase().contains("overloaded")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overload_detection() {
        assert!(AiError::Overloaded("busy".to_string()).is_overloaded());
        assert!(AiError::Remote {
            status: 503,
            message: "unavailable".to_string()
        }
        .is_overloaded());
        assert!(AiError::Remote {
            status: 500,
            message: "The model is overloaded. Please try again later.".to_string()
        }
        .is_overloaded());
        assert!(AiError::Remote {
            status: 500,
            message: "upstream returned 503 Service Unavailable".to_string()
        }
        .is_overloaded());
        assert!(!AiError::Remote {
            status: 400,
            message: "bad request".to_string()
        }
        .is_overloaded());
        assert!(!AiError::Timeout(Duration::from_secs(1)).is_overloaded());
        assert!(!AiError::EmptyResponse.is_overloaded());
    }
}
