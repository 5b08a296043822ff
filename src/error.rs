//! Error types for the garden service layer
//!
//! Each layer owns its own error enum (`AiError` in `ai`, `StorageError` in
//! `storage`); `GardenError` is what callers of the garden see.

use std::time::Duration;

use crate::ai::AiError;
use crate::storage::StorageError;

/// Errors surfaced by [`crate::Garden`] operations
#[derive(Debug, thiserror::Error)]
pub enum GardenError {
    #[error("request timed out after {0:?} - the garden is slow today")]
    Timeout(Duration),

    #[error("the garden is very busy right now, please try again in a moment ({0})")]
    Overloaded(String),

    #[error("could not analyze thought: {0}")]
    Analysis(String),

    #[error("could not water thought: {0}")]
    Watering(String),

    #[error("image generation failed: {0}")]
    ImageGeneration(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("thought '{0}' not found")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl GardenError {
    /// Maps an AI failure during classification
    pub(crate) fn from_analysis(error: AiError) -> Self {
        match error {
            AiError::Timeout(after) => GardenError::Timeout(after),
            AiError::Overloaded(msg) => GardenError::Overloaded(msg),
            AiError::MissingApiKey => GardenError::Config(error.to_string()),
            other => GardenError::Analysis(other.to_string()),
        }
    }

    /// Maps an AI failure during watering
    pub(crate) fn from_watering(error: AiError) -> Self {
        match error {
            AiError::Timeout(after) => GardenError::Timeout(after),
            AiError::Overloaded(msg) => GardenError::Overloaded(msg),
            AiError::MissingApiKey => GardenError::Config(error.to_string()),
            other => GardenError::Watering(other.to_string()),
        }
    }

    /// Maps an AI failure while repainting an existing thought
    pub(crate) fn from_render(error: AiError) -> Self {
        match error {
            AiError::Timeout(after) => GardenError::Timeout(after),
            AiError::Overloaded(msg) => GardenError::Overloaded(msg),
            AiError::MissingApiKey => GardenError::Config(error.to_string()),
            other => GardenError::ImageGeneration(other.to_string()),
        }
    }
}

/// Shorthand used across the crate
pub type Result<T, E = GardenError> = std::result::Result<T, E>;
