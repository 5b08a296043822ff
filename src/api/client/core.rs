//! In-process client
//!
//! This module provides a client implementation that wraps a `Garden`
//! directly, providing the same interface as `HttpClient` without HTTP.

use super::{ClientError, GardenClient};
use crate::error::GardenError;
use crate::models::{ThoughtCard, ThoughtFilter};
use crate::Garden;

/// A client implementation that wraps a Garden directly
#[derive(Clone)]
pub struct LocalClient {
    garden: Garden,
}

impl LocalClient {
    pub fn new(garden: Garden) -> Self {
        Self { garden }
    }
}

impl From<GardenError> for ClientError {
    fn from(error: GardenError) -> Self {
        match error {
            GardenError::NotFound(id) => ClientError::NotFound(id),
            other => ClientError::Garden(other),
        }
    }
}

#[async_trait::async_trait]
impl GardenClient for LocalClient {
    async fn plant(&self, text: String) -> Result<ThoughtCard, ClientError> {
        Ok(self.garden.plant(&text).await?)
    }

    async fn water(&self, id: &str, text: String) -> Result<ThoughtCard, ClientError> {
        Ok(self.garden.water(id, &text).await?)
    }

    async fn list(&self, filter: ThoughtFilter) -> Result<Vec<ThoughtCard>, ClientError> {
        Ok(self.garden.list(filter).await?)
    }

    async fn get(&self, id: &str) -> Result<ThoughtCard, ClientError> {
        Ok(self.garden.get(id).await?)
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        Ok(self.garden.delete(id).await?)
    }

    async fn relocate(&self, id: &str, x: f32, y: f32) -> Result<ThoughtCard, ClientError> {
        Ok(self.garden.relocate(id, x, y).await?)
    }

    async fn mark_viewed(&self, id: &str) -> Result<ThoughtCard, ClientError> {
        Ok(self.garden.mark_viewed(id).await?)
    }

    async fn repaint(&self, id: &str) -> Result<ThoughtCard, ClientError> {
        Ok(self.garden.repaint(id).await?)
    }
}
