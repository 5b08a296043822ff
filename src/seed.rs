//! Sample garden for `serve --example`

use chrono::Duration;
use rand::Rng;

use crate::models::{
    now_millis, position_for_category, Category, Intensity, MusicRecommendation, NextStep, NextStepType,
    ThoughtCard, ThoughtMeta, ThoughtUpdate,
};
use crate::stages::GrowthStage;

const HOUR_MS: i64 = 3_600_000;

struct Sample {
    id: &'static str,
    text: &'static str,
    image_url: &'static str,
    reflection: &'static str,
    stage: GrowthStage,
    category: Category,
    topic: &'static str,
    emotion: &'static str,
    intensity: Intensity,
    species: &'static str,
    next_step: Option<(NextStepType, &'static str, f32)>,
    music: Option<(&'static str, &'static str, &'static str)>,
    age_hours: i64,
}

const SAMPLES: [Sample; 4] = [
    Sample {
        id: "seed-goal-1",
        text: "I want to finish this hackathon project and make it beautiful.",
        image_url: "https://images.unsplash.com/photo-1470509037663-253afd7f0fdd?w=800&q=80",
        reflection: "Your dedication is clear. Remember that beauty often comes from the care you put into the details, not just the final polish.",
        stage: GrowthStage::Bloom,
        category: Category::Goal,
        topic: "Context",
        emotion: "determined",
        intensity: Intensity::Medium,
        species: "Sunflower",
        next_step: Some((NextStepType::Do, "Review the styling one last time.", 0.9)),
        music: Some((
            "Cornfield Chase",
            "Hans Zimmer",
            "Driving rhythm to keep you moving forward.",
        )),
        age_hours: 48,
    },
    Sample {
        id: "seed-feeling-1",
        text: "Feeling a bit overwhelmed by how much is left to do.",
        image_url: "https://images.unsplash.com/photo-1522383225653-ed111181a951?w=800&q=80",
        reflection: "It's natural to feel the weight of what's ahead. Take a breath. You are capable, and it's okay to take things one step at a time.",
        stage: GrowthStage::Sprout,
        category: Category::Feeling,
        topic: "Workload",
        emotion: "overwhelmed",
        intensity: Intensity::High,
        species: "Cherry Blossom",
        next_step: Some((NextStepType::Reflect, "Pause for 1 minute and breathe.", 0.95)),
        music: Some((
            "Weightless",
            "Marconi Union",
            "Soft textures to help steady your mind.",
        )),
        age_hours: 24,
    },
    Sample {
        id: "seed-idea-1",
        text: "What if the garden changed colors with the time of day?",
        image_url: "https://images.unsplash.com/photo-1613539246066-78db6ec4d61d?w=800&q=80",
        reflection: "A lovely thought! It would make the garden feel even more alive and connected to your own rhythm.",
        stage: GrowthStage::Seed,
        category: Category::Idea,
        topic: "App Feature",
        emotion: "curious",
        intensity: Intensity::Low,
        species: "Tulip",
        next_step: None,
        music: Some((
            "Daydreaming",
            "Radiohead",
            "Light and playful to match your curiosity.",
        )),
        age_hours: 12,
    },
    Sample {
        id: "seed-memory-1",
        text: "Walking in the rain yesterday was so refreshing.",
        image_url: "https://images.unsplash.com/photo-1596726915206-559d81d2746c?w=800&q=80",
        reflection: "The rain has a way of washing things clean. Hold onto that feeling of refreshment.",
        stage: GrowthStage::Fruit,
        category: Category::Memory,
        topic: "Nature",
        emotion: "peaceful",
        intensity: Intensity::Medium,
        species: "Bluebell",
        next_step: None,
        music: None,
        age_hours: 48,
    },
];

/// The four sample thoughts, placed in their category zones.
///
/// Ids are fixed, so seeding twice overwrites rather than duplicates.
pub fn example_thoughts<R: Rng + ?Sized>(rng: &mut R) -> Vec<ThoughtCard> {
    let now = now_millis();
    SAMPLES
        .iter()
        .map(|s| {
            let created_at = now - Duration::milliseconds(s.age_hours * HOUR_MS);
            let updates = if s.stage == GrowthStage::Fruit {
                vec![ThoughtUpdate {
                    id: "update-1".to_string(),
                    timestamp: now - Duration::milliseconds(24 * HOUR_MS),
                    text: "I want to do it again soon.".to_string(),
                    ai_response: "A wonderful intention. The rain will be waiting for you."
                        .to_string(),
                    previous_stage: GrowthStage::Bloom,
                    new_stage: GrowthStage::Fruit,
                    next_step: None,
                }]
            } else {
                Vec::new()
            };

            ThoughtCard {
                id: s.id.to_string(),
                created_at,
                original_text: s.text.to_string(),
                reflection: s.reflection.to_string(),
                image_url: s.image_url.to_string(),
                meta: ThoughtMeta {
                    category: s.category,
                    topic: s.topic.to_string(),
                    emotion: s.emotion.to_string(),
                    intensity: s.intensity,
                    plant_species: s.species.to_string(),
                    next_step: s.next_step.map(|(kind, text, confidence)| NextStep {
                        text: text.to_string(),
                        kind,
                        confidence,
                    }),
                },
                position: position_for_category(s.category, rng),
                growth_stage: s.stage,
                has_viewed: true,
                updates,
                music: s.music.map(|(name, artist, reasoning)| MusicRecommendation {
                    name: name.to_string(),
                    artist: artist.to_string(),
                    url: None,
                    reasoning: Some(reasoning.to_string()),
                }),
            }
        })
        .collect()
}
