//! Client module
//!
//! This module provides the clients the CLI uses to talk to a garden, either
//! in-process or through a running `mindgarden serve`.

mod core;
mod http;
mod trait_def;

// Re-export the trait and types
pub use core::LocalClient;
pub use http::{ClientConfig, ClientError, HttpClient};
pub use trait_def::GardenClient;
