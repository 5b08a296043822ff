//! Supabase (PostgREST) store
//!
//! Expects a table shaped like
//!
//! ```sql
//! create table thoughts (
//!     id text primary key,
//!     created_at bigint not null,
//!     data jsonb not null
//! );
//! ```

use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{schema, StorageError, ThoughtStore};
use crate::models::ThoughtCard;

pub const DEFAULT_TABLE: &str = "thoughts";

/// Project URL, anon key and table name
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub key: String,
    pub table: String,
}

impl SupabaseConfig {
    /// Builds a config, refusing blank credentials
    pub fn new(
        url: impl Into<String>,
        key: impl Into<String>,
        table: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let url = url.into();
        let key = key.into();
        if url.trim().is_empty() || key.trim().is_empty() {
            return Err(StorageError::NotConfigured(
                "supabase needs both a URL and a key".to_string(),
            ));
        }
        Ok(Self {
            url: url.trim().trim_end_matches('/').to_string(),
            key: key.trim().to_string(),
            table: table.into(),
        })
    }
}

#[derive(Serialize)]
struct RowOut<'a> {
    id: &'a str,
    created_at: i64,
    data: Value,
}

#[derive(Deserialize)]
struct RowIn {
    data: Value,
}

pub struct SupabaseStore {
    http_client: ReqwestClient,
    config: SupabaseConfig,
}

impl SupabaseStore {
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            http_client: ReqwestClient::new(),
            config,
        }
    }

    fn request(&self, method: Method) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.config.url, self.config.table);
        self.http_client
            .request(method, url)
            .header("apikey", &self.config.key)
            .bearer_auth(&self.config.key)
    }

    async fn fetch_rows(&self, query: &[(&str, &str)]) -> Result<Vec<ThoughtCard>, StorageError> {
        let response = self.request(Method::GET).query(query).send().await?;
        let rows: Vec<RowIn> = check(response).await?.json().await?;
        rows.into_iter().map(|row| schema::decode(row.data)).collect()
    }
}

async fn check(response: Response) -> Result<Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(StorageError::Remote {
        status: status.as_u16(),
        message,
    })
}

#[async_trait::async_trait]
impl ThoughtStore for SupabaseStore {
    async fn save(&self, thought: &ThoughtCard) -> Result<(), StorageError> {
        let row = RowOut {
            id: thought.id(),
            created_at: thought.created_at().timestamp_millis(),
            data: schema::encode(thought)?,
        };
        let response = self
            .request(Method::POST)
            .header("Prefer", "resolution=merge-duplicates")
            .json(&[row])
            .send()
            .await?;
        check(response).await?;
        tracing::debug!(id = thought.id(), "thought upserted to supabase");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ThoughtCard>, StorageError> {
        self.fetch_rows(&[("select", "data"), ("order", "created_at.desc")])
            .await
    }

    async fn get(&self, id: &str) -> Result<Option<ThoughtCard>, StorageError> {
        let filter = format!("eq.{}", id);
        let mut rows = self
            .fetch_rows(&[("select", "data"), ("id", filter.as_str())])
            .await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let filter = format!("eq.{}", id);
        let response = self
            .request(Method::DELETE)
            .query(&[("id", filter.as_str())])
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "supabase"
    }
}
