//! Backend trait definition
//!
//! `ModelBackend` hides the wire protocol of the hosted model. The
//! orchestration in [`super::AiClient`] only ever sees prompts in and
//! text or images out.

use super::AiError;

/// Image bytes returned inline by the model, still base64 encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// A hosted generative model
#[async_trait::async_trait]
pub trait ModelBackend: Send + Sync {
    /// Generates text constrained to the given JSON response schema and
    /// returns the raw response text
    async fn generate_json(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<String, AiError>;

    /// Generates a single image for the prompt
    async fn generate_image(&self, prompt: &str) -> Result<InlineImage, AiError>;
}
