//! The garden service
//!
//! `Garden` ties the model client to a store: it plants, waters, moves and
//! removes thoughts, and tells subscribers whenever something changed.

use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::ai::AiClient;
use crate::error::{GardenError, Result};
use crate::models::{position_for_category, Category, Position, ThoughtCard, ThoughtFilter, ThoughtId};
use crate::seed;
use crate::stages::TransitionPolicy;
use crate::storage::ThoughtStore;

const EVENT_CAPACITY: usize = 100;

/// A change to the garden
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum GardenEvent {
    Planted(ThoughtId),
    Watered(ThoughtId),
    Moved(ThoughtId),
    Viewed(ThoughtId),
    Repainted(ThoughtId),
    Removed(ThoughtId),
}

impl GardenEvent {
    pub fn id(&self) -> &str {
        match self {
            GardenEvent::Planted(id)
            | GardenEvent::Watered(id)
            | GardenEvent::Moved(id)
            | GardenEvent::Viewed(id)
            | GardenEvent::Repainted(id)
            | GardenEvent::Removed(id) => id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GardenEvent::Planted(_) => "planted",
            GardenEvent::Watered(_) => "watered",
            GardenEvent::Moved(_) => "moved",
            GardenEvent::Viewed(_) => "viewed",
            GardenEvent::Repainted(_) => "repainted",
            GardenEvent::Removed(_) => "removed",
        }
    }
}

#[derive(Clone)]
pub struct Garden {
    ai: AiClient,
    store: Arc<dyn ThoughtStore>,
    policy: TransitionPolicy,
    rng: Arc<Mutex<StdRng>>,
    update_tx: broadcast::Sender<GardenEvent>,
}

impl Garden {
    pub fn new(ai: AiClient, store: Arc<dyn ThoughtStore>) -> Self {
        let (update_tx, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self {
            ai,
            store,
            policy: TransitionPolicy::default(),
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
            update_tx,
        }
    }

    pub fn with_policy(mut self, policy: TransitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Makes placement deterministic
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Arc::new(Mutex::new(StdRng::seed_from_u64(seed)));
        self
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    pub fn store_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GardenEvent> {
        self.update_tx.subscribe()
    }

    fn notify(&self, event: GardenEvent) {
        // no subscribers is fine
        let _ = self.update_tx.send(event);
    }

    fn place(&self, category: Category) -> Position {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        position_for_category(category, &mut *rng)
    }

    /// Classifies `text`, paints its seed and stores the new thought
    pub async fn plant(&self, text: &str) -> Result<ThoughtCard> {
        let text = text.trim();
        if text.is_empty() {
            return Err(GardenError::InvalidInput("thought text is empty".to_string()));
        }

        let content = self
            .ai
            .plant_content(text)
            .await
            .map_err(GardenError::from_analysis)?;
        let position = self.place(content.classification.category);
        let thought = ThoughtCard::plant(text.to_string(), content, position);

        self.store.save(&thought).await?;
        tracing::info!(
            id = thought.id(),
            category = %thought.category(),
            topic = %thought.meta().topic,
            "thought planted"
        );
        self.notify(GardenEvent::Planted(thought.id().to_string()));
        Ok(thought)
    }

    /// Records a follow-up note and lets the thought grow. The new update is
    /// the first entry of the returned thought's update log.
    pub async fn water(&self, id: &str, text: &str) -> Result<ThoughtCard> {
        let text = text.trim();
        if text.is_empty() {
            return Err(GardenError::InvalidInput("update text is empty".to_string()));
        }

        let mut thought = self.get(id).await?;
        let outcome = self
            .ai
            .water(&thought, text, self.policy)
            .await
            .map_err(GardenError::from_watering)?;

        let update = thought.apply_watering(text.to_string(), outcome);
        tracing::info!(
            id,
            from = %update.previous_stage,
            to = %update.new_stage,
            "thought watered"
        );
        self.store.save(&thought).await?;
        self.notify(GardenEvent::Watered(thought.id().to_string()));
        Ok(thought)
    }

    /// Thoughts matching `filter`, newest first
    pub async fn list(&self, filter: ThoughtFilter) -> Result<Vec<ThoughtCard>> {
        let mut thoughts = self.store.list().await?;
        if !filter.is_empty() {
            thoughts.retain(|t| filter.matches(t));
        }
        Ok(thoughts)
    }

    pub async fn get(&self, id: &str) -> Result<ThoughtCard> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| GardenError::NotFound(id.to_string()))
    }

    /// Removes a thought; unknown ids are not an error
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(id).await?;
        tracing::info!(id, "thought removed");
        self.notify(GardenEvent::Removed(id.to_string()));
        Ok(())
    }

    /// Moves a thought, clamping the position into the garden
    pub async fn relocate(&self, id: &str, x: f32, y: f32) -> Result<ThoughtCard> {
        let mut thought = self.get(id).await?;
        thought.relocate(Position::clamped(x, y));
        self.store.save(&thought).await?;
        self.notify(GardenEvent::Moved(thought.id().to_string()));
        Ok(thought)
    }

    pub async fn mark_viewed(&self, id: &str) -> Result<ThoughtCard> {
        let mut thought = self.get(id).await?;
        if thought.has_viewed() {
            return Ok(thought);
        }
        thought.mark_viewed();
        self.store.save(&thought).await?;
        self.notify(GardenEvent::Viewed(thought.id().to_string()));
        Ok(thought)
    }

    /// Paints the thought again at its current stage. On failure the old
    /// image is kept and the error returned.
    pub async fn repaint(&self, id: &str) -> Result<ThoughtCard> {
        let mut thought = self.get(id).await?;
        let meta = thought.meta();
        let image_url = self
            .ai
            .render(&meta.plant_species, thought.growth_stage(), &meta.emotion)
            .await
            .map_err(GardenError::from_render)?;

        thought.image_url = image_url;
        self.store.save(&thought).await?;
        tracing::info!(id, "thought repainted");
        self.notify(GardenEvent::Repainted(thought.id().to_string()));
        Ok(thought)
    }

    /// Stores the sample thoughts
    pub async fn seed_examples(&self) -> Result<Vec<ThoughtCard>> {
        let thoughts = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            seed::example_thoughts(&mut *rng)
        };
        for thought in &thoughts {
            self.store.save(thought).await?;
            self.notify(GardenEvent::Planted(thought.id().to_string()));
        }
        tracing::info!(count = thoughts.len(), "example thoughts planted");
        Ok(thoughts)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ai::{AiError, InlineImage, ModelBackend, RetryPolicy};
    use crate::models::GrowthStage;
    use crate::storage::{LocalStore, MemoryStore};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::time::Duration;

    /// Answers every analysis with a todo and every watering with `stage`
    struct FixedBackend {
        stage: &'static str,
        paint: bool,
    }

    #[async_trait::async_trait]
    impl ModelBackend for FixedBackend {
        async fn generate_json(&self, prompt: &str, _schema: &Value) -> Result<String, AiError> {
            let body = if prompt.contains("User Update:") {
                json!({
                    "acknowledgment": "Growing nicely.",
                    "newStage": self.stage,
                    "hasNextStep": false
                })
            } else {
                json!({
                    "category": "todo",
                    "topic": "Finish report",
                    "emotion": "focused",
                    "intensity": "medium",
                    "reflection": "Each line is a step.",
                    "plantSpecies": "Sunflower",
                    "hasNextStep": true,
                    "nextStep": { "text": "Perhaps start with the summary", "type": "do", "confidence": 0.7 }
                })
            };
            Ok(body.to_string())
        }

        async fn generate_image(&self, _prompt: &str) -> Result<InlineImage, AiError> {
            if self.paint {
                Ok(InlineImage {
                    mime_type: "image/png".to_string(),
                    data: "UE5H".to_string(),
                })
            } else {
                Err(AiError::Remote {
                    status: 500,
                    message: "no paint".to_string(),
                })
            }
        }
    }

    fn test_ai(stage: &'static str, paint: bool) -> AiClient {
        AiClient::new(
            Arc::new(FixedBackend { stage, paint }),
            RetryPolicy {
                timeout: Duration::from_secs(1),
                retries: 0,
                initial_delay: Duration::from_millis(1),
            },
        )
    }

    /// In-memory garden whose model plants todos and waters them to `stage`
    pub(crate) fn test_garden(stage: &'static str, paint: bool) -> Garden {
        Garden::new(test_ai(stage, paint), Arc::new(MemoryStore::new())).with_seed(42)
    }

    #[tokio::test]
    async fn test_plant_places_thought_in_zone() {
        let garden = test_garden("sprout", true);
        let thought = garden.plant("  I need to finish the report ").await.unwrap();

        assert_eq!(thought.original_text(), "I need to finish the report");
        assert_eq!(thought.category(), Category::Todo);
        assert_eq!(thought.image_url(), "data:image/png;base64,UE5H");
        let ((x_lo, x_hi), _) = Category::Todo.zone();
        assert!(thought.position().x >= x_lo as f32 && thought.position().x < x_hi as f32);
        assert_eq!(garden.get(thought.id()).await.unwrap(), thought);
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected() {
        let garden = test_garden("sprout", true);
        assert!(matches!(
            garden.plant("   ").await,
            Err(GardenError::InvalidInput(_))
        ));
        let thought = garden.plant("call mom").await.unwrap();
        assert!(matches!(
            garden.water(thought.id(), "").await,
            Err(GardenError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_water_records_update() {
        let garden = test_garden("sprout", true);
        let planted = garden.plant("I need to finish the report").await.unwrap();
        let watered = garden.water(planted.id(), "wrote the intro").await.unwrap();

        assert_eq!(watered.growth_stage(), GrowthStage::Sprout);
        assert_eq!(watered.updates().len(), 1);
        assert_eq!(watered.updates()[0].previous_stage, GrowthStage::Seed);
        assert!(!watered.meta().has_next_step());
        assert_eq!(garden.get(planted.id()).await.unwrap(), watered);
    }

    #[tokio::test]
    async fn test_missing_thought_is_not_found() {
        let garden = test_garden("sprout", true);
        assert!(matches!(garden.get("nope").await, Err(GardenError::NotFound(_))));
        assert!(matches!(
            garden.water("nope", "hello").await,
            Err(GardenError::NotFound(_))
        ));
        assert!(matches!(
            garden.relocate("nope", 1.0, 1.0).await,
            Err(GardenError::NotFound(_))
        ));
        garden.delete("nope").await.unwrap();
    }

    #[tokio::test]
    async fn test_relocate_clamps_and_mark_viewed() {
        let garden = test_garden("sprout", true);
        let thought = garden.plant("buy milk").await.unwrap();

        let moved = garden.relocate(thought.id(), 120.0, -3.0).await.unwrap();
        assert_eq!(moved.position(), Position { x: 100.0, y: 0.0 });

        let viewed = garden.mark_viewed(thought.id()).await.unwrap();
        assert!(viewed.has_viewed());
    }

    #[tokio::test]
    async fn test_repaint_failure_keeps_image() {
        let garden = test_garden("sprout", false);
        let thought = garden.plant("buy milk").await.unwrap();
        assert!(thought.image_url().starts_with("https://picsum.photos/seed/"));

        let err = garden.repaint(thought.id()).await.unwrap_err();
        assert!(matches!(err, GardenError::ImageGeneration(_)));
        assert_eq!(
            garden.get(thought.id()).await.unwrap().image_url(),
            thought.image_url()
        );
    }

    #[tokio::test]
    async fn test_mutations_are_broadcast() {
        let garden = test_garden("bloom", true);
        let mut events = garden.subscribe();

        let thought = garden.plant("learn the cello").await.unwrap();
        garden.water(thought.id(), "first lesson booked").await.unwrap();
        garden.delete(thought.id()).await.unwrap();

        let id = thought.id().to_string();
        assert_eq!(events.recv().await.unwrap(), GardenEvent::Planted(id.clone()));
        assert_eq!(events.recv().await.unwrap(), GardenEvent::Watered(id.clone()));
        assert_eq!(events.recv().await.unwrap(), GardenEvent::Removed(id));
    }

    #[tokio::test]
    async fn test_seed_examples_and_filter() {
        let garden = test_garden("sprout", true);
        garden.seed_examples().await.unwrap();
        garden.seed_examples().await.unwrap();

        assert_eq!(garden.list(ThoughtFilter::default()).await.unwrap().len(), 4);
        let blooming = garden
            .list(ThoughtFilter {
                category: None,
                stage: Some(GrowthStage::Bloom),
            })
            .await
            .unwrap();
        assert_eq!(blooming.len(), 1);
        assert_eq!(blooming[0].category(), Category::Goal);
    }

    #[tokio::test]
    async fn test_stored_thought_reads_back_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let garden = Garden::new(test_ai("sprout", true), Arc::new(LocalStore::new(dir.path())));

        let planted = garden.plant("I need to finish the report").await.unwrap();
        assert_eq!(garden.get(planted.id()).await.unwrap(), planted);

        let watered = garden.water(planted.id(), "wrote the intro").await.unwrap();
        assert_eq!(watered.created_at(), planted.created_at());
        assert_eq!(garden.get(planted.id()).await.unwrap(), watered);
        assert_eq!(garden.list(ThoughtFilter::default()).await.unwrap(), vec![watered]);
    }
}
