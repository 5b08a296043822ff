//! API module
//!
//! This module provides the HTTP API for the garden along with the clients
//! that talk to it.

pub mod client;
pub mod server;

// Re-export commonly used types
pub use client::{ClientConfig, ClientError, GardenClient, HttpClient, LocalClient};
pub use server::{router, serve, ServerConfig};
