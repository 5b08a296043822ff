//! Orchestration of the analyze -> draw pipeline

use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::prompts::{self, ANALYSIS_SCHEMA, WATERING_SCHEMA};
use super::{call_with_retry, AiError, ModelBackend, RetryPolicy};
use crate::models::{
    Category, Classification, GeneratedContent, Intensity, NextStep, ThoughtCard,
    WateringOutcome,
};
use crate::stages::{GrowthStage, TransitionPolicy};

const TOPIC_FALLBACK_WORDS: usize = 6;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisResponse {
    category: String,
    #[serde(default)]
    topic: String,
    emotion: String,
    intensity: Intensity,
    reflection: String,
    #[serde(default)]
    plant_species: String,
    #[serde(default)]
    has_next_step: bool,
    #[serde(default)]
    next_step: Option<NextStep>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WateringResponse {
    acknowledgment: String,
    new_stage: GrowthStage,
    #[serde(default)]
    has_next_step: bool,
    #[serde(default)]
    next_step: Option<NextStep>,
}

/// Image used when the model could not paint one
pub fn placeholder_image_url() -> String {
    format!(
        "https://picsum.photos/seed/{}/800/800?blur=4",
        Utc::now().timestamp_millis()
    )
}

/// Parses the first JSON object in a model response, tolerating prose or
/// code fences around it
fn parse_model_json<T: DeserializeOwned>(raw: &str) -> Result<T, AiError> {
    if raw.trim().is_empty() {
        return Err(AiError::EmptyResponse);
    }
    let start = raw
        .find('{')
        .ok_or_else(|| AiError::Decode(format!("no JSON object in response: {}", raw)))?;
    serde_json::Deserializer::from_str(&raw[start..])
        .into_iter::<T>()
        .next()
        .ok_or(AiError::EmptyResponse)?
        .map_err(|e| AiError::Decode(e.to_string()))
}

fn fallback_topic(text: &str) -> String {
    text.split_whitespace()
        .take(TOPIC_FALLBACK_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Client for the model-backed parts of the garden.
///
/// Cheap to clone; all clones share one backend.
#[derive(Clone)]
pub struct AiClient {
    backend: Arc<dyn ModelBackend>,
    retry: RetryPolicy,
}

impl AiClient {
    pub fn new(backend: Arc<dyn ModelBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    /// Classifies a thought and writes its reflection
    pub async fn classify(&self, text: &str) -> Result<Classification, AiError> {
        let prompt = prompts::analysis_prompt(text);
        let raw = call_with_retry(&self.retry, "classify", || {
            self.backend.generate_json(&prompt, &ANALYSIS_SCHEMA)
        })
        .await?;

        let response: AnalysisResponse = parse_model_json(&raw)?;
        let category = Category::from_label(&response.category);
        let topic = match response.topic.trim() {
            "" => fallback_topic(text),
            topic => topic.to_string(),
        };
        let plant_species = match response.plant_species.trim() {
            "" => category.default_species().to_string(),
            species => species.to_string(),
        };
        // "high intensity means no next step" is the model's rule; whatever
        // it sends is passed through
        let next_step = if response.has_next_step {
            response.next_step
        } else {
            None
        };

        Ok(Classification {
            category,
            topic,
            emotion: response.emotion,
            intensity: response.intensity,
            reflection: response.reflection,
            plant_species,
            next_step,
        })
    }

    /// Paints a plant and returns it as a `data:` URL
    pub async fn render(
        &self,
        species: &str,
        stage: GrowthStage,
        emotion: &str,
    ) -> Result<String, AiError> {
        let prompt = prompts::image_prompt(species, stage, emotion);
        let image = call_with_retry(&self.retry, "render", || {
            self.backend.generate_image(&prompt)
        })
        .await?;
        Ok(image.to_data_url())
    }

    /// Like [`AiClient::render`], but falls back to a placeholder image
    pub async fn render_or_placeholder(
        &self,
        species: &str,
        stage: GrowthStage,
        emotion: &str,
    ) -> String {
        match self.render(species, stage, emotion).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, species, "image generation failed, using placeholder");
                placeholder_image_url()
            }
        }
    }

    /// Classify, then paint. Only the classification is critical.
    pub async fn plant_content(&self, text: &str) -> Result<GeneratedContent, AiError> {
        let classification = self.classify(text).await?;
        let image_url = self
            .render_or_placeholder(
                &classification.plant_species,
                GrowthStage::Seed,
                &classification.emotion,
            )
            .await;
        Ok(GeneratedContent {
            classification,
            image_url,
        })
    }

    /// Asks the model how a thought grows after a follow-up note.
    ///
    /// The requested stage is checked against `policy`; a refused transition
    /// keeps the current stage. When the stage changes the plant is
    /// repainted, and a failed repaint leaves `new_image_url` empty.
    pub async fn water(
        &self,
        thought: &ThoughtCard,
        update_text: &str,
        policy: TransitionPolicy,
    ) -> Result<WateringOutcome, AiError> {
        let prompt = prompts::watering_prompt(thought, update_text);
        let raw = call_with_retry(&self.retry, "water", || {
            self.backend.generate_json(&prompt, &WATERING_SCHEMA)
        })
        .await?;

        let response: WateringResponse = parse_model_json(&raw)?;
        let current = thought.growth_stage();
        let new_stage = match policy.resolve(current, response.new_stage) {
            Ok(stage) => stage,
            Err(rejected) => {
                tracing::warn!(thought = thought.id(), %rejected, "ignoring stage change");
                current
            }
        };

        let new_image_url = if new_stage != current {
            let meta = thought.meta();
            match self.render(&meta.plant_species, new_stage, &meta.emotion).await {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!(error = %e, thought = thought.id(), "repaint failed, keeping previous image");
                    None
                }
            }
        } else {
            None
        };

        Ok(WateringOutcome {
            acknowledgment: response.acknowledgment,
            requested_stage: response.new_stage,
            new_stage,
            next_step: if response.has_next_step {
                response.next_step
            } else {
                None
            },
            new_image_url,
        })
    }
}
