//! End-to-end garden flows with a scripted model and real stores

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mindgarden::ai::{AiClient, AiError, InlineImage, ModelBackend, RetryPolicy};
use mindgarden::api::{GardenClient, LocalClient};
use mindgarden::models::{ThoughtCard, ThoughtFilter};
use mindgarden::stages::TransitionPolicy;
use mindgarden::storage::{LocalStore, MemoryStore, StorageError, ThoughtStore};
use mindgarden::{Category, Garden, GardenError, GrowthStage};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

/// Classifies anything mentioning a report as a todo, waters to `stage`
struct ScriptedModel {
    stage: &'static str,
    images_work: bool,
    overloaded: bool,
}

impl ScriptedModel {
    fn new(stage: &'static str) -> Self {
        Self {
            stage,
            images_work: true,
            overloaded: false,
        }
    }
}

#[async_trait::async_trait]
impl ModelBackend for ScriptedModel {
    async fn generate_json(&self, prompt: &str, _schema: &Value) -> Result<String, AiError> {
        if self.overloaded {
            return Err(AiError::Overloaded("The model is overloaded.".to_string()));
        }
        let body = if prompt.contains("User Update:") {
            json!({
                "acknowledgment": "Look how far it has come.",
                "newStage": self.stage,
                "hasNextStep": true,
                "nextStep": { "text": "Perhaps share it with a friend", "type": "do", "confidence": 0.6 }
            })
        } else if prompt.contains("report") {
            json!({
                "category": "todo",
                "topic": "Finish the report",
                "emotion": "pressured",
                "intensity": "medium",
                "reflection": "Every finished page began as a blank one.",
                "plantSpecies": "Sunflower",
                "hasNextStep": false
            })
        } else {
            json!({
                "category": "idea",
                "topic": "",
                "emotion": "curious",
                "intensity": "low",
                "reflection": "Curiosity is a seed that knows where the light is.",
                "plantSpecies": "",
                "hasNextStep": false
            })
        };
        Ok(body.to_string())
    }

    async fn generate_image(&self, _prompt: &str) -> Result<InlineImage, AiError> {
        if self.images_work {
            Ok(InlineImage {
                mime_type: "image/png".to_string(),
                data: "iVBORw0KGgo".to_string(),
            })
        } else {
            Err(AiError::Decode("no image data returned".to_string()))
        }
    }
}

/// A store whose writes can be switched off
struct FlakyStore {
    inner: MemoryStore,
    broken: AtomicBool,
}

#[async_trait::async_trait]
impl ThoughtStore for FlakyStore {
    async fn save(&self, thought: &ThoughtCard) -> Result<(), StorageError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(StorageError::Remote {
                status: 500,
                message: "database unavailable".to_string(),
            });
        }
        self.inner.save(thought).await
    }

    async fn list(&self) -> Result<Vec<ThoughtCard>, StorageError> {
        self.inner.list().await
    }

    async fn get(&self, id: &str) -> Result<Option<ThoughtCard>, StorageError> {
        self.inner.get(id).await
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.inner.delete(id).await
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}

fn ai(model: ScriptedModel) -> AiClient {
    AiClient::new(
        Arc::new(model),
        RetryPolicy {
            timeout: Duration::from_secs(2),
            retries: 2,
            initial_delay: Duration::from_millis(1),
        },
    )
}

fn memory_garden(model: ScriptedModel) -> Garden {
    Garden::new(ai(model), Arc::new(MemoryStore::new())).with_seed(7)
}

#[tokio::test]
async fn test_planting_a_report_todo() {
    let garden = memory_garden(ScriptedModel::new("sprout"));
    let thought = garden.plant("I need to finish the report").await.unwrap();

    assert_eq!(thought.category(), Category::Todo);
    assert!(!thought.meta().topic.is_empty());
    assert_eq!(thought.growth_stage(), GrowthStage::Seed);
    assert!(!thought.image_url().is_empty());
    assert!(!thought.has_viewed());
}

#[tokio::test]
async fn test_watering_a_seed_adds_one_update() {
    let garden = memory_garden(ScriptedModel::new("sprout"));
    let thought = garden.plant("I need to finish the report").await.unwrap();

    let watered = garden.water(thought.id(), "Outline is done").await.unwrap();
    assert_eq!(watered.updates().len(), 1);
    let update = &watered.updates()[0];
    assert_eq!(update.previous_stage, GrowthStage::Seed);
    assert_eq!(update.new_stage, GrowthStage::Sprout);
    assert_eq!(update.text, "Outline is done");
    assert_eq!(update.ai_response, "Look how far it has come.");
    assert_eq!(
        watered.meta().next_step.as_ref().map(|s| s.text.as_str()),
        Some("Perhaps share it with a friend")
    );
    assert_ne!(watered.image_url(), "");
}

#[tokio::test]
async fn test_forward_policy_keeps_stage_but_records_update() {
    let store: Arc<dyn ThoughtStore> = Arc::new(MemoryStore::new());
    let growing = Garden::new(ai(ScriptedModel::new("bloom")), store.clone());
    let thought = growing.plant("I need to finish the report").await.unwrap();
    let bloomed = growing.water(thought.id(), "Wrote most of it").await.unwrap();
    assert_eq!(bloomed.growth_stage(), GrowthStage::Bloom);

    // the model now asks to go back to seed
    let forward = Garden::new(ai(ScriptedModel::new("seed")), store.clone());
    let kept = forward.water(thought.id(), "Starting over").await.unwrap();
    assert_eq!(kept.growth_stage(), GrowthStage::Bloom);
    assert_eq!(kept.updates().len(), 2);
    assert_eq!(kept.updates()[0].new_stage, GrowthStage::Bloom);

    let permissive = Garden::new(ai(ScriptedModel::new("seed")), store)
        .with_policy(TransitionPolicy::Permissive);
    let regressed = permissive.water(thought.id(), "Really starting over").await.unwrap();
    assert_eq!(regressed.growth_stage(), GrowthStage::Seed);
}

#[tokio::test]
async fn test_image_failure_uses_placeholder() {
    let garden = memory_garden(ScriptedModel {
        images_work: false,
        ..ScriptedModel::new("sprout")
    });
    let thought = garden.plant("colors that follow the sun").await.unwrap();
    assert!(thought.image_url().starts_with("https://picsum.photos/seed/"));
    assert!(thought.image_url().ends_with("/800/800?blur=4"));
    assert_eq!(thought.meta().plant_species, "Tulip");
    assert_eq!(thought.meta().topic, "colors that follow the sun");

    // render failure while watering keeps the placeholder
    let watered = garden.water(thought.id(), "thought about it more").await.unwrap();
    assert_eq!(watered.growth_stage(), GrowthStage::Sprout);
    assert_eq!(watered.image_url(), thought.image_url());
}

#[tokio::test]
async fn test_overload_surfaces_as_busy_garden() {
    let garden = memory_garden(ScriptedModel {
        overloaded: true,
        ..ScriptedModel::new("sprout")
    });
    let err = garden.plant("I need to finish the report").await.unwrap_err();
    assert!(matches!(err, GardenError::Overloaded(_)));
    assert!(err.to_string().contains("very busy"));
    assert!(garden.list(ThoughtFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_storage_failure_after_analysis() {
    let store = Arc::new(FlakyStore {
        inner: MemoryStore::new(),
        broken: AtomicBool::new(true),
    });
    let garden = Garden::new(ai(ScriptedModel::new("sprout")), store.clone());

    let err = garden.plant("I need to finish the report").await.unwrap_err();
    assert!(matches!(err, GardenError::Storage(_)));
    assert!(store.inner.list().await.unwrap().is_empty());

    store.broken.store(false, Ordering::SeqCst);
    garden.plant("I need to finish the report").await.unwrap();
    assert_eq!(store.inner.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_is_idempotent_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let garden = Garden::new(
        ai(ScriptedModel::new("sprout")),
        Arc::new(LocalStore::new(dir.path())),
    );
    let client = LocalClient::new(garden);

    let thought = client.plant("I need to finish the report".to_string()).await.unwrap();
    client.delete(thought.id()).await.unwrap();
    client.delete(thought.id()).await.unwrap();

    let remaining = client.list(ThoughtFilter::default()).await.unwrap();
    assert!(remaining.iter().all(|t| t.id() != thought.id()));

    // a fresh store on the same directory sees the same garden
    let reopened = LocalStore::new(dir.path());
    assert!(reopened.list().await.unwrap().is_empty());
}
