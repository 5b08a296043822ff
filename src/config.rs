//! Settings
//!
//! Layered with figment, later layers win:
//!
//! 1. built-in defaults
//! 2. `GEMINI_API_KEY`, `SUPABASE_URL` and `SUPABASE_KEY` from the environment
//! 3. the settings file (`config.toml`)
//! 4. `MINDGARDEN_` variables, `__` separating section and key
//!    (`MINDGARDEN_RETRY__RETRIES=4`)

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::ai::{AiClient, GeminiBackend, GeminiConfig, RetryPolicy};
use crate::error::{GardenError, Result};
use crate::stages::TransitionPolicy;
use crate::storage::{
    LocalStore, MemoryStore, StorageBackend, SupabaseConfig, SupabaseStore, ThoughtStore,
    DEFAULT_TABLE,
};

pub const CONFIG_FILE: &str = "config.toml";
pub const ENV_PREFIX: &str = "MINDGARDEN_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        let defaults = GeminiConfig::default();
        Self {
            api_key: None,
            base_url: defaults.base_url,
            text_model: defaults.text_model,
            image_model: defaults.image_model,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Directory of the local garden file; the platform data dir when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supabase_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supabase_key: Option<String>,
    pub table: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Auto,
            data_dir: None,
            supabase_url: None,
            supabase_key: None,
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

impl StorageSettings {
    /// URL and key, when both are present and non-blank
    pub fn supabase_credentials(&self) -> Option<(&str, &str)> {
        let url = self.supabase_url.as_deref().filter(|s| !s.trim().is_empty())?;
        let key = self.supabase_key.as_deref().filter(|s| !s.trim().is_empty())?;
        Some((url, key))
    }

    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub timeout_secs: u64,
    pub retries: u32,
    pub initial_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            timeout_secs: policy.timeout.as_secs(),
            retries: policy.retries,
            initial_delay_ms: policy.initial_delay.as_millis() as u64,
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(s: &RetrySettings) -> Self {
        RetryPolicy {
            timeout: Duration::from_secs(s.timeout_secs),
            retries: s.retries,
            initial_delay: Duration::from_millis(s.initial_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GardenSettings {
    pub transition_policy: TransitionPolicy,
}

/// Everything the garden can be configured with
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub gemini: GeminiSettings,
    pub storage: StorageSettings,
    pub retry: RetrySettings,
    pub garden: GardenSettings,
}

/// `config.toml` in the platform config directory
pub fn default_config_path() -> PathBuf {
    ProjectDirs::from("", "", "mindgarden")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "mindgarden")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".mindgarden"))
}

impl Settings {
    /// The layered figment behind [`Settings::load`]
    pub fn figment(path: &Path) -> Figment {
        let plain_env = Env::raw()
            .only(&["GEMINI_API_KEY", "SUPABASE_URL", "SUPABASE_KEY"])
            .map(|key| {
                let mapped = match key.as_str().to_ascii_uppercase().as_str() {
                    "GEMINI_API_KEY" => "gemini.api_key",
                    "SUPABASE_URL" => "storage.supabase_url",
                    _ => "storage.supabase_key",
                };
                mapped.into()
            });

        Figment::from(Serialized::defaults(Settings::default()))
            .merge(plain_env)
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads settings, reading `path` or the default settings file
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        let settings: Settings = Self::figment(&path)
            .extract()
            .map_err(|e| GardenError::Config(e.to_string()))?;
        tracing::debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        (&self.retry).into()
    }

    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.gemini.api_key.clone(),
            base_url: self.gemini.base_url.clone(),
            text_model: self.gemini.text_model.clone(),
            image_model: self.gemini.image_model.clone(),
        }
    }

    pub fn build_ai_client(&self) -> AiClient {
        AiClient::new(
            Arc::new(GeminiBackend::new(self.gemini_config())),
            self.retry_policy(),
        )
    }

    /// Builds the configured store. `auto` picks Supabase when both URL and
    /// key are set and the local file otherwise.
    pub fn build_store(&self) -> Result<Arc<dyn ThoughtStore>> {
        let storage = &self.storage;
        let backend = match storage.backend {
            StorageBackend::Auto if storage.supabase_credentials().is_some() => {
                StorageBackend::Supabase
            }
            StorageBackend::Auto => StorageBackend::Local,
            other => other,
        };

        let store: Arc<dyn ThoughtStore> = match backend {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::Supabase => {
                let (url, key) = storage.supabase_credentials().unwrap_or_default();
                let config = SupabaseConfig::new(url, key, storage.table.clone())?;
                Arc::new(SupabaseStore::new(config))
            }
            _ => Arc::new(LocalStore::new(storage.resolved_data_dir())),
        };
        tracing::info!(backend = store.backend_name(), "storage ready");
        Ok(store)
    }
}

fn read_table(path: &Path) -> Result<toml::Table> {
    match std::fs::read_to_string(path) {
        Ok(contents) => contents
            .parse::<toml::Table>()
            .map_err(|e| GardenError::Config(format!("{}: {}", path.display(), e))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(toml::Table::new()),
        Err(e) => Err(GardenError::Config(format!("{}: {}", path.display(), e))),
    }
}

fn write_table(path: &Path, table: &toml::Table) -> Result<()> {
    let contents =
        toml::to_string_pretty(table).map_err(|e| GardenError::Config(e.to_string()))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| GardenError::Config(format!("{}: {}", parent.display(), e)))?;
    }
    std::fs::write(path, contents)
        .map_err(|e| GardenError::Config(format!("{}: {}", path.display(), e)))
}

/// Stores Supabase credentials in the settings file, leaving every other
/// entry of the file alone.
///
/// A blank URL or key removes both, which sends `auto` back to the local
/// file. Returns whether credentials are now stored.
pub fn set_storage_remote(path: &Path, url: &str, key: &str) -> Result<bool> {
    let mut table = read_table(path)?;
    let storage = table
        .entry("storage")
        .or_insert_with(|| toml::Value::Table(toml::Table::new()));
    let storage = storage.as_table_mut().ok_or_else(|| {
        GardenError::Config(format!("{}: [storage] is not a table", path.display()))
    })?;

    let configured = !url.trim().is_empty() && !key.trim().is_empty();
    if configured {
        storage.insert("supabase_url".to_string(), url.trim().into());
        storage.insert("supabase_key".to_string(), key.trim().into());
    } else {
        storage.remove("supabase_url");
        storage.remove("supabase_key");
    }
    write_table(path, &table)?;
    tracing::info!(path = %path.display(), configured, "storage settings saved");
    Ok(configured)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let settings: Settings = Settings::figment(Path::new("missing.toml")).extract()?;
            assert_eq!(settings, Settings::default());
            assert_eq!(settings.retry_policy(), RetryPolicy::default());
            assert_eq!(settings.storage.backend, StorageBackend::Auto);
            assert_eq!(settings.garden.transition_policy, TransitionPolicy::Forward);
            Ok(())
        });
    }

    #[test]
    fn test_layering_order() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("GEMINI_API_KEY", "from-plain-env");
            jail.set_env("SUPABASE_URL", "https://plain.supabase.co");
            jail.create_file(
                CONFIG_FILE,
                r#"
                [storage]
                supabase_url = "https://file.supabase.co"
                backend = "local"

                [retry]
                retries = 5

                [garden]
                transition_policy = "permissive"
                "#,
            )?;
            jail.set_env("MINDGARDEN_RETRY__RETRIES", "7");

            let settings: Settings = Settings::figment(Path::new(CONFIG_FILE)).extract()?;
            assert_eq!(settings.gemini.api_key.as_deref(), Some("from-plain-env"));
            assert_eq!(
                settings.storage.supabase_url.as_deref(),
                Some("https://file.supabase.co")
            );
            assert_eq!(settings.storage.backend, StorageBackend::Local);
            assert_eq!(settings.retry.retries, 7);
            assert_eq!(settings.retry.timeout_secs, 20);
            assert_eq!(settings.garden.transition_policy, TransitionPolicy::Permissive);
            Ok(())
        });
    }

    #[test]
    fn test_auto_backend_needs_both_credentials() {
        let mut storage = StorageSettings {
            supabase_url: Some("https://xyz.supabase.co".to_string()),
            ..Default::default()
        };
        assert_eq!(storage.supabase_credentials(), None);
        storage.supabase_key = Some("  ".to_string());
        assert_eq!(storage.supabase_credentials(), None);
        storage.supabase_key = Some("anon".to_string());
        assert_eq!(
            storage.supabase_credentials(),
            Some(("https://xyz.supabase.co", "anon"))
        );
    }

    #[tokio::test]
    async fn test_build_store_picks_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.storage.data_dir = Some(dir.path().to_path_buf());
        assert_eq!(settings.build_store().unwrap().backend_name(), "local");

        settings.storage.supabase_url = Some("https://xyz.supabase.co".to_string());
        settings.storage.supabase_key = Some("anon".to_string());
        assert_eq!(settings.build_store().unwrap().backend_name(), "supabase");

        settings.storage.backend = StorageBackend::Memory;
        assert_eq!(settings.build_store().unwrap().backend_name(), "memory");

        settings.storage.backend = StorageBackend::Supabase;
        settings.storage.supabase_key = None;
        assert!(matches!(
            settings.build_store(),
            Err(GardenError::Storage(_))
        ));
    }

    #[test]
    fn test_set_storage_remote_keeps_other_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join(CONFIG_FILE);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[retry]\nretries = 4\n").unwrap();

        assert!(set_storage_remote(&path, "https://xyz.supabase.co", "anon").unwrap());
        let table = read_table(&path).unwrap();
        assert_eq!(table["retry"]["retries"].as_integer(), Some(4));
        assert_eq!(
            table["storage"]["supabase_url"].as_str(),
            Some("https://xyz.supabase.co")
        );

        // a blank key clears both values
        assert!(!set_storage_remote(&path, "https://xyz.supabase.co", "").unwrap());
        let table = read_table(&path).unwrap();
        assert!(table["storage"].get("supabase_url").is_none());
        assert!(table["storage"].get("supabase_key").is_none());
    }
}
