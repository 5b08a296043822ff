//! Client trait definition
//!
//! This module defines the `GardenClient` trait that abstracts over the
//! in-process and HTTP clients.

use super::ClientError;
use crate::models::{ThoughtCard, ThoughtFilter};

/// Trait defining the client interface for a garden
#[async_trait::async_trait]
pub trait GardenClient: Send + Sync {
    /// Plant a new thought
    async fn plant(&self, text: String) -> Result<ThoughtCard, ClientError>;

    /// Water a thought with a follow-up note
    async fn water(&self, id: &str, text: String) -> Result<ThoughtCard, ClientError>;

    /// List thoughts, newest first
    async fn list(&self, filter: ThoughtFilter) -> Result<Vec<ThoughtCard>, ClientError>;

    /// Get a single thought
    async fn get(&self, id: &str) -> Result<ThoughtCard, ClientError>;

    /// Remove a thought
    async fn delete(&self, id: &str) -> Result<(), ClientError>;

    /// Move a thought to a new position
    async fn relocate(&self, id: &str, x: f32, y: f32) -> Result<ThoughtCard, ClientError>;

    /// Mark a thought as seen
    async fn mark_viewed(&self, id: &str) -> Result<ThoughtCard, ClientError>;

    /// Paint a thought again
    async fn repaint(&self, id: &str) -> Result<ThoughtCard, ClientError>;
}
