//! Prompt templates and response schemas

use lazy_static::lazy_static;
use serde_json::{json, Value};

use crate::models::ThoughtCard;
use crate::stages::GrowthStage;

lazy_static! {
    static ref NEXT_STEP_SCHEMA: Value = json!({
        "type": "OBJECT",
        "nullable": true,
        "properties": {
            "text": { "type": "STRING" },
            "type": { "type": "STRING", "enum": ["do", "clarify", "reflect"] },
            "confidence": { "type": "NUMBER" }
        }
    });

    /// Response schema for classifying a new thought
    pub(crate) static ref ANALYSIS_SCHEMA: Value = json!({
        "type": "OBJECT",
        "properties": {
            "category": {
                "type": "STRING",
                "enum": ["idea", "todo", "worry", "feeling", "goal", "memory", "other"]
            },
            "topic": { "type": "STRING" },
            "emotion": { "type": "STRING" },
            "intensity": { "type": "STRING", "enum": ["low", "medium", "high"] },
            "reflection": { "type": "STRING" },
            "plantSpecies": { "type": "STRING" },
            "hasNextStep": { "type": "BOOLEAN" },
            "nextStep": NEXT_STEP_SCHEMA.clone()
        },
        "required": [
            "category", "topic", "emotion", "intensity",
            "reflection", "plantSpecies", "hasNextStep"
        ]
    });

    /// Response schema for watering an existing thought
    pub(crate) static ref WATERING_SCHEMA: Value = json!({
        "type": "OBJECT",
        "properties": {
            "acknowledgment": { "type": "STRING" },
            "newStage": { "type": "STRING", "enum": ["seed", "sprout", "bloom", "fruit"] },
            "hasNextStep": { "type": "BOOLEAN" },
            "nextStep": NEXT_STEP_SCHEMA.clone()
        },
        "required": ["acknowledgment", "newStage", "hasNextStep"]
    });
}

pub(crate) fn analysis_prompt(text: &str) -> String {
    format!(
        r#"You are the MindGarden AI, a gentle companion for a journaling garden.
Analyze the user's thought: "{text}"

Return STRICT JSON with:
1. category: one of [idea, todo, worry, feeling, goal, memory, other].
2. topic: a short 3-6 word title summarizing the thought.
3. emotion: 1-2 words for the underlying emotion.
4. intensity: one of [low, medium, high].
5. reflection: EXACTLY one supportive, poetic, reassuring sentence. No advice, no therapy jargon.
6. plantSpecies: a real flowering plant or tree that symbolizes the thought.
7. hasNextStep / nextStep: an optional small follow-up (type do, clarify or reflect, confidence 0-1).

RULES:
- No imperatives.
- If intensity is high, hasNextStep must be false and nextStep null.
"#
    )
}

pub(crate) fn watering_prompt(thought: &ThoughtCard, update_text: &str) -> String {
    let previous_step = thought
        .meta()
        .next_step
        .as_ref()
        .map(|s| s.text.as_str())
        .unwrap_or("None");
    format!(
        r#"You are the MindGarden AI.
Original Thought: "{original}"
Current Stage: {stage}
Previous Step: {previous_step}
User Update: "{update_text}"

Task:
1. Analyze the progress or reflection in the update.
2. Determine the new stage (seed -> sprout -> bloom -> fruit). Staying at the current stage is fine.
3. Write a short, warm acknowledgment.
4. Suggest a new next step only if it helps.

CRITICAL RULES: No imperatives. If the user sounds tired or the intensity is high, no next step.

Return JSON.
"#,
        original = thought.original_text(),
        stage = thought.growth_stage(),
    )
}

pub(crate) fn image_prompt(species: &str, stage: GrowthStage, emotion: &str) -> String {
    format!(
        r#"Watercolor illustration of a {species}: {stage_description}, carrying a feeling of {emotion}.
Style: soft, pastel, ethereal, minimalist, traditional watercolor on textured paper, white vignette edges.
Constraints: no text, no people, no photorealism, no harsh black lines."#,
        stage_description = stage.visual_description(),
    )
}
