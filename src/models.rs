//! Core models for the mindgarden library
//!
//! This module contains the thought record, its metadata, the update log and
//! the placement rules used when a thought is planted.

use chrono::{DateTime, SubsecRound, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use crate::stages::{GrowthStage, RejectedTransition, TransitionPolicy};

/// Opaque identifier of a thought
pub type ThoughtId = String;

/// What kind of thought this is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Idea,
    Todo,
    Worry,
    Feeling,
    Goal,
    Memory,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Idea,
        Category::Todo,
        Category::Worry,
        Category::Feeling,
        Category::Goal,
        Category::Memory,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Idea => "idea",
            Category::Todo => "todo",
            Category::Worry => "worry",
            Category::Feeling => "feeling",
            Category::Goal => "goal",
            Category::Memory => "memory",
            Category::Other => "other",
        }
    }

    /// Maps a free-form label from the model onto the enumeration.
    /// Anything unrecognised lands in `Other`.
    pub fn from_label(label: &str) -> Category {
        label.parse().unwrap_or(Category::Other)
    }

    /// Plant drawn for this category when the model does not name one
    pub fn default_species(&self) -> &'static str {
        match self {
            Category::Idea => "Tulip",
            Category::Todo => "Sunflower",
            Category::Worry => "Fern",
            Category::Feeling => "Cherry Blossom",
            Category::Goal => "Oak Sapling",
            Category::Memory => "Bluebell",
            Category::Other => "Wildflower",
        }
    }

    /// Region of the garden this category is planted in, as
    /// `(x_range, y_range)` in percentage coordinates
    pub fn zone(&self) -> ((u32, u32), (u32, u32)) {
        match self {
            Category::Todo => ((10, 30), (20, 40)),
            Category::Idea => ((70, 90), (15, 35)),
            Category::Feeling => ((15, 40), (50, 80)),
            Category::Goal => ((40, 60), (75, 90)),
            _ => ((10, 90), (10, 90)),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Category::ALL
            .iter()
            .find(|c| c.as_str() == wanted)
            .copied()
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Intensity::Low => "low",
            Intensity::Medium => "medium",
            Intensity::High => "high",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextStepType {
    Do,
    Clarify,
    Reflect,
}

impl fmt::Display for NextStepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NextStepType::Do => "do",
            NextStepType::Clarify => "clarify",
            NextStepType::Reflect => "reflect",
        };
        f.write_str(s)
    }
}

/// A gentle follow-up suggested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextStep {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: NextStepType,
    #[serde(default)]
    pub confidence: f32,
}

/// Location in the garden, in 0-100 percentage coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    /// Creates a position, clamping both axes into 0-100
    pub fn clamped(x: f32, y: f32) -> Self {
        let clamp = |v: f32| if v.is_nan() { 50.0 } else { v.clamp(0.0, 100.0) };
        Self {
            x: clamp(x),
            y: clamp(y),
        }
    }
}

/// Picks a spot inside the zone of the given category
pub fn position_for_category<R: Rng + ?Sized>(category: Category, rng: &mut R) -> Position {
    let ((x_lo, x_hi), (y_lo, y_hi)) = category.zone();
    let x = rng.gen_range(x_lo..x_hi);
    let y = rng.gen_range(y_lo..y_hi);
    Position {
        x: x as f32,
        y: y as f32,
    }
}

/// Decorative track suggestion attached to a thought
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicRecommendation {
    pub name: String,
    pub artist: String,
    #[serde(default, alias = "spotifyUrl", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Result of classifying a piece of text
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: Category,
    pub topic: String,
    pub emotion: String,
    pub intensity: Intensity,
    pub reflection: String,
    pub plant_species: String,
    pub next_step: Option<NextStep>,
}

impl Classification {
    pub fn has_next_step(&self) -> bool {
        self.next_step.is_some()
    }
}

/// Everything the planting pipeline produces for a new thought
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedContent {
    pub classification: Classification,
    pub image_url: String,
}

/// What a watering call decided
#[derive(Debug, Clone, PartialEq)]
pub struct WateringOutcome {
    pub acknowledgment: String,
    /// Stage the model asked for
    pub requested_stage: GrowthStage,
    /// Stage after the transition policy was applied
    pub new_stage: GrowthStage,
    pub next_step: Option<NextStep>,
    /// Replacement artwork, only present when the stage changed and the
    /// render call succeeded
    pub new_image_url: Option<String>,
}

impl WateringOutcome {
    pub fn has_next_step(&self) -> bool {
        self.next_step.is_some()
    }
}

/// Classification metadata stored on a thought
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ThoughtMetaRecord", into = "ThoughtMetaRecord")]
pub struct ThoughtMeta {
    pub category: Category,
    pub topic: String,
    pub emotion: String,
    pub intensity: Intensity,
    pub plant_species: String,
    pub next_step: Option<NextStep>,
}

impl ThoughtMeta {
    pub fn has_next_step(&self) -> bool {
        self.next_step.is_some()
    }
}

impl From<Classification> for ThoughtMeta {
    fn from(c: Classification) -> Self {
        Self {
            category: c.category,
            topic: c.topic,
            emotion: c.emotion,
            intensity: c.intensity,
            plant_species: c.plant_species,
            next_step: c.next_step,
        }
    }
}

// Wire shape of ThoughtMeta. `hasNextStep` is written for front ends and
// reconciled with `nextStep` on the way in.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThoughtMetaRecord {
    category: Category,
    topic: String,
    emotion: String,
    intensity: Intensity,
    #[serde(default)]
    plant_species: String,
    #[serde(default)]
    has_next_step: bool,
    #[serde(default)]
    next_step: Option<NextStep>,
}

impl From<ThoughtMetaRecord> for ThoughtMeta {
    fn from(r: ThoughtMetaRecord) -> Self {
        let plant_species = if r.plant_species.trim().is_empty() {
            r.category.default_species().to_string()
        } else {
            r.plant_species
        };
        Self {
            category: r.category,
            topic: r.topic,
            emotion: r.emotion,
            intensity: r.intensity,
            plant_species,
            next_step: if r.has_next_step { r.next_step } else { None },
        }
    }
}

impl From<ThoughtMeta> for ThoughtMetaRecord {
    fn from(m: ThoughtMeta) -> Self {
        Self {
            category: m.category,
            topic: m.topic,
            emotion: m.emotion,
            intensity: m.intensity,
            plant_species: m.plant_species,
            has_next_step: m.next_step.is_some(),
            next_step: m.next_step,
        }
    }
}

/// One watering of a thought
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThoughtUpdate {
    pub id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub ai_response: String,
    pub previous_stage: GrowthStage,
    pub new_stage: GrowthStage,
    #[serde(default)]
    pub next_step: Option<NextStep>,
}

/// The current time at the millisecond precision records are stored with
pub(crate) fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// A thought planted in the garden
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThoughtCard {
    pub(crate) id: ThoughtId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) original_text: String,
    pub(crate) reflection: String,
    pub(crate) image_url: String,
    pub(crate) meta: ThoughtMeta,
    pub(crate) position: Position,
    pub(crate) growth_stage: GrowthStage,
    #[serde(default)]
    pub(crate) has_viewed: bool,
    #[serde(default)]
    pub(crate) updates: Vec<ThoughtUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) music: Option<MusicRecommendation>,
}

impl ThoughtCard {
    /// Creates a fresh seed from the text the user wrote and what the
    /// model made of it
    pub fn plant(original_text: String, content: GeneratedContent, position: Position) -> Self {
        let GeneratedContent {
            classification,
            image_url,
        } = content;
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now_millis(),
            original_text,
            reflection: classification.reflection.clone(),
            image_url,
            meta: classification.into(),
            position,
            growth_stage: GrowthStage::Seed,
            has_viewed: false,
            updates: Vec::new(),
            music: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    pub fn reflection(&self) -> &str {
        &self.reflection
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    pub fn meta(&self) -> &ThoughtMeta {
        &self.meta
    }

    pub fn category(&self) -> Category {
        self.meta.category
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn growth_stage(&self) -> GrowthStage {
        self.growth_stage
    }

    pub fn has_viewed(&self) -> bool {
        self.has_viewed
    }

    /// Update log, newest first
    pub fn updates(&self) -> &[ThoughtUpdate] {
        &self.updates
    }

    pub fn music(&self) -> Option<&MusicRecommendation> {
        self.music.as_ref()
    }

    /// Records a watering. The stage in `outcome` is taken as-is; the
    /// transition policy has already been applied by the caller.
    pub(crate) fn apply_watering(&mut self, text: String, outcome: WateringOutcome) -> &ThoughtUpdate {
        let WateringOutcome {
            acknowledgment,
            new_stage,
            next_step,
            new_image_url,
            ..
        } = outcome;

        let update = ThoughtUpdate {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: now_millis(),
            text,
            ai_response: acknowledgment,
            previous_stage: self.growth_stage,
            new_stage,
            next_step: next_step.clone(),
        };

        self.growth_stage = new_stage;
        self.meta.next_step = next_step;
        if let Some(url) = new_image_url {
            self.image_url = url;
        }
        self.updates.insert(0, update);
        &self.updates[0]
    }

    pub(crate) fn relocate(&mut self, position: Position) {
        self.position = position;
    }

    pub(crate) fn mark_viewed(&mut self) {
        self.has_viewed = true;
    }
}

/// Narrows a listing down to a category and/or stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThoughtFilter {
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub stage: Option<GrowthStage>,
}

impl ThoughtFilter {
    pub fn matches(&self, thought: &ThoughtCard) -> bool {
        self.category.map_or(true, |c| thought.category() == c)
            && self.stage.map_or(true, |s| thought.growth_stage() == s)
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.stage.is_none()
    }
}
