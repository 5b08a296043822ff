//! Single-file JSON store

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::sync::Mutex;

use super::{schema, sort_newest_first, StorageError, ThoughtStore};
use crate::models::ThoughtCard;

pub const GARDEN_FILE: &str = "garden.json";

/// Keeps the whole garden in one JSON array on disk.
///
/// Writes go to a sibling temp file that is renamed over the garden, so a
/// reader never sees half a file. Writers inside this process take turns.
pub struct LocalStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalStore {
    /// Store backed by `garden.json` inside `data_dir`
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self::with_file(data_dir.as_ref().join(GARDEN_FILE))
    }

    pub fn with_file(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<ThoughtCard>, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let records: Vec<Value> = serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::Corrupt(format!("{}: {}", self.path.display(), e)))?;
        records.into_iter().map(schema::decode).collect()
    }

    async fn write(&self, thoughts: &[ThoughtCard]) -> Result<(), StorageError> {
        let records = thoughts
            .iter()
            .map(schema::encode)
            .collect::<Result<Vec<_>, _>>()?;
        let body = serde_json::to_vec_pretty(&records)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::debug!(path = %self.path.display(), count = thoughts.len(), "garden written");
        Ok(())
    }
}

#[async_trait::async_trait]
impl ThoughtStore for LocalStore {
    async fn save(&self, thought: &ThoughtCard) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut thoughts = self.load().await?;
        match thoughts.iter_mut().find(|t| t.id() == thought.id()) {
            Some(existing) => *existing = thought.clone(),
            None => thoughts.push(thought.clone()),
        }
        self.write(&thoughts).await
    }

    async fn list(&self) -> Result<Vec<ThoughtCard>, StorageError> {
        let mut thoughts = self.load().await?;
        sort_newest_first(&mut thoughts);
        Ok(thoughts)
    }

    async fn get(&self, id: &str) -> Result<Option<ThoughtCard>, StorageError> {
        Ok(self.load().await?.into_iter().find(|t| t.id() == id))
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut thoughts = self.load().await?;
        let before = thoughts.len();
        thoughts.retain(|t| t.id() != id);
        if thoughts.len() == before {
            return Ok(());
        }
        self.write(&thoughts).await
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
