//! Persistence of planted thoughts
//!
//! Every backend stores the same versioned JSON record (see [`schema`]), so a
//! garden can move between the local file and a Supabase table without
//! conversion.

mod local;
mod memory;
pub mod schema;
mod supabase;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::ThoughtCard;

pub use local::{LocalStore, GARDEN_FILE};
pub use memory::MemoryStore;
pub use schema::CURRENT_SCHEMA_VERSION;
pub use supabase::{SupabaseConfig, SupabaseStore, DEFAULT_TABLE};

/// Errors raised by a [`ThoughtStore`]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote store returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("record has schema version {found}, newest supported is {supported}")]
    UnsupportedVersion { found: u64, supported: u64 },

    #[error("storage backend not configured: {0}")]
    NotConfigured(String),
}

/// Where thoughts are kept
#[async_trait::async_trait]
pub trait ThoughtStore: Send + Sync {
    /// Inserts the thought or replaces the one with the same id
    async fn save(&self, thought: &ThoughtCard) -> Result<(), StorageError>;

    /// All thoughts, newest first
    async fn list(&self) -> Result<Vec<ThoughtCard>, StorageError>;

    async fn get(&self, id: &str) -> Result<Option<ThoughtCard>, StorageError>;

    /// Removes a thought. Removing an id that is not stored succeeds.
    async fn delete(&self, id: &str) -> Result<(), StorageError>;

    /// Short name for logs and `config show`
    fn backend_name(&self) -> &'static str;
}

/// Which backend to build from the settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Supabase when it is configured, the local file otherwise
    #[default]
    Auto,
    Local,
    Supabase,
    Memory,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StorageBackend::Auto => "auto",
            StorageBackend::Local => "local",
            StorageBackend::Supabase => "supabase",
            StorageBackend::Memory => "memory",
        };
        f.write_str(s)
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(StorageBackend::Auto),
            "local" => Ok(StorageBackend::Local),
            "supabase" => Ok(StorageBackend::Supabase),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

pub(crate) fn sort_newest_first(thoughts: &mut [ThoughtCard]) {
    thoughts.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
}
