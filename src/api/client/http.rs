//! HTTP client
//!
//! This module provides a client for a garden served by `mindgarden serve`.

use std::sync::Arc;

use reqwest::{Client as ReqwestClient, Error as ReqwestError, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::GardenClient;
use crate::error::GardenError;
use crate::models::{ThoughtCard, ThoughtFilter};

/// API client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Generic API response structure
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] ReqwestError),

    #[error("API error: {0}")]
    Api(String),

    #[error("thought '{0}' not found")]
    NotFound(String),

    #[error("Missing data in response")]
    MissingData,

    #[error(transparent)]
    Garden(GardenError),
}

#[derive(Serialize)]
struct TextRequest<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct PositionRequest {
    x: f32,
    y: f32,
}

/// API client for a garden server
#[derive(Debug, Clone)]
pub struct HttpClient {
    http_client: Arc<ReqwestClient>,
    config: ClientConfig,
}

impl HttpClient {
    /// Create a new client with default configuration
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            http_client: Arc::new(ReqwestClient::new()),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn thought_url(&self, id: &str, action: Option<&str>) -> String {
        match action {
            Some(action) => self.url(&format!("/api/thoughts/{}/{}", id, action)),
            None => self.url(&format!("/api/thoughts/{}", id)),
        }
    }

    /// Sends the request and unwraps the response envelope
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        id: Option<&str>,
    ) -> Result<Option<T>, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        let api_response: Option<ApiResponse<T>> = serde_json::from_str(&body).ok();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(id.unwrap_or_default().to_string()));
        }

        match api_response {
            Some(api_response) if api_response.success && status.is_success() => {
                Ok(api_response.data)
            }
            Some(api_response) => Err(ClientError::Api(
                api_response
                    .error
                    .unwrap_or_else(|| format!("HTTP error: {}", status)),
            )),
            None => Err(ClientError::Api(format!("HTTP error: {} {}", status, body))),
        }
    }

    async fn send_thought(
        &self,
        request: RequestBuilder,
        id: Option<&str>,
    ) -> Result<ThoughtCard, ClientError> {
        self.send(request, id).await?.ok_or(ClientError::MissingData)
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl GardenClient for HttpClient {
    async fn plant(&self, text: String) -> Result<ThoughtCard, ClientError> {
        let request = self
            .http_client
            .post(self.url("/api/thoughts"))
            .json(&TextRequest { text: &text });
        self.send_thought(request, None).await
    }

    async fn water(&self, id: &str, text: String) -> Result<ThoughtCard, ClientError> {
        let request = self
            .http_client
            .post(self.thought_url(id, Some("water")))
            .json(&TextRequest { text: &text });
        self.send_thought(request, Some(id)).await
    }

    async fn list(&self, filter: ThoughtFilter) -> Result<Vec<ThoughtCard>, ClientError> {
        let mut query = Vec::new();
        if let Some(category) = filter.category {
            query.push(("category", category.to_string()));
        }
        if let Some(stage) = filter.stage {
            query.push(("stage", stage.to_string()));
        }
        let request = self.http_client.get(self.url("/api/thoughts")).query(&query);
        self.send(request, None)
            .await?
            .ok_or(ClientError::MissingData)
    }

    async fn get(&self, id: &str) -> Result<ThoughtCard, ClientError> {
        let request = self.http_client.get(self.thought_url(id, None));
        self.send_thought(request, Some(id)).await
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        let request = self.http_client.delete(self.thought_url(id, None));
        self.send::<()>(request, Some(id)).await?;
        Ok(())
    }

    async fn relocate(&self, id: &str, x: f32, y: f32) -> Result<ThoughtCard, ClientError> {
        let request = self
            .http_client
            .post(self.thought_url(id, Some("position")))
            .json(&PositionRequest { x, y });
        self.send_thought(request, Some(id)).await
    }

    async fn mark_viewed(&self, id: &str) -> Result<ThoughtCard, ClientError> {
        let request = self.http_client.post(self.thought_url(id, Some("viewed")));
        self.send_thought(request, Some(id)).await
    }

    async fn repaint(&self, id: &str) -> Result<ThoughtCard, ClientError> {
        let request = self.http_client.post(self.thought_url(id, Some("repaint")));
        self.send_thought(request, Some(id)).await
    }
}
