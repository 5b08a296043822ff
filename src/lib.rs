//! MindGarden library crate
//!
//! Thoughts are planted as seeds: a generative model classifies each one,
//! writes a short reflection and paints a plant for it. Watering a thought
//! with follow-up notes lets it grow from seed to sprout, bloom and fruit.
//!
//! The [`Garden`] service combines an [`ai::AiClient`] with a
//! [`storage::ThoughtStore`]; the `api` module serves it over HTTP and the
//! `cli` module drives it from the terminal.

pub mod ai;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod garden;
pub mod models;
pub mod seed;
pub mod stages;
pub mod storage;

pub use api::{serve, ServerConfig};
pub use config::Settings;
pub use error::{GardenError, Result};
pub use garden::{Garden, GardenEvent};
pub use models::{Category, GrowthStage, ThoughtCard, ThoughtFilter};
pub use storage::{StorageError, ThoughtStore};
