use std::collections::HashMap;

use tokio::sync::RwLock;

use super::{sort_newest_first, StorageError, ThoughtStore};
use crate::models::ThoughtCard;

/// Process-local store for tests and `--ephemeral` runs
#[derive(Default)]
pub struct MemoryStore {
    thoughts: RwLock<HashMap<String, ThoughtCard>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ThoughtStore for MemoryStore {
    async fn save(&self, thought: &ThoughtCard) -> Result<(), StorageError> {
        self.thoughts
            .write()
            .await
            .insert(thought.id().to_string(), thought.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ThoughtCard>, StorageError> {
        let mut thoughts: Vec<_> = self.thoughts.read().await.values().cloned().collect();
        sort_newest_first(&mut thoughts);
        Ok(thoughts)
    }

    async fn get(&self, id: &str) -> Result<Option<ThoughtCard>, StorageError> {
        Ok(self.thoughts.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.thoughts.write().await.remove(id);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
