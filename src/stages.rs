//! Growth stages of a thought and the rules for moving between them
//!
//! A thought starts as a seed and grows as the user waters it. The stage a
//! watering moves to is chosen by the model; [`TransitionPolicy`] decides
//! which of those requests the garden accepts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How "resolved" a thought is
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum GrowthStage {
    #[default]
    Seed,
    Sprout,
    Bloom,
    #[serde(alias = "mature")]
    Fruit,
}

impl GrowthStage {
    pub const ALL: [GrowthStage; 4] = [
        GrowthStage::Seed,
        GrowthStage::Sprout,
        GrowthStage::Bloom,
        GrowthStage::Fruit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GrowthStage::Seed => "seed",
            GrowthStage::Sprout => "sprout",
            GrowthStage::Bloom => "bloom",
            GrowthStage::Fruit => "fruit",
        }
    }

    /// Returns how a plant at this stage should be drawn
    pub fn visual_description(&self) -> &'static str {
        match self {
            GrowthStage::Seed => "a single seed resting in dark, soft soil, just beginning to crack open",
            GrowthStage::Sprout => "a young sprout with two tender leaves rising from the soil",
            GrowthStage::Bloom => "a plant in full bloom with open flowers",
            GrowthStage::Fruit => "a mature plant bearing ripe fruit, calm and complete",
        }
    }

    /// Returns the next stage, or `None` for the terminal stage
    pub fn next(&self) -> Option<GrowthStage> {
        match self {
            GrowthStage::Seed => Some(GrowthStage::Sprout),
            GrowthStage::Sprout => Some(GrowthStage::Bloom),
            GrowthStage::Bloom => Some(GrowthStage::Fruit),
            GrowthStage::Fruit => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }
}

impl fmt::Display for GrowthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrowthStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "seed" => Ok(GrowthStage::Seed),
            "sprout" => Ok(GrowthStage::Sprout),
            "bloom" => Ok(GrowthStage::Bloom),
            "fruit" | "mature" => Ok(GrowthStage::Fruit),
            other => Err(format!(
                "unknown growth stage '{}' (expected seed, sprout, bloom or fruit)",
                other
            )),
        }
    }
}

/// A stage change the policy refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectedTransition {
    pub from: GrowthStage,
    pub requested: GrowthStage,
}

impl fmt::Display for RejectedTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transition {} -> {} is not allowed", self.from, self.requested)
    }
}

/// Which stage changes requested by the model are accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    /// Stay or move to any later stage; regressions are refused
    #[default]
    Forward,
    /// Accept whatever the model asks for, including regressions
    Permissive,
}

impl TransitionPolicy {
    pub fn allows(&self, from: GrowthStage, to: GrowthStage) -> bool {
        match self {
            TransitionPolicy::Forward => to >= from,
            TransitionPolicy::Permissive => true,
        }
    }

    /// Returns the stage to move to, or the refused transition
    pub fn resolve(
        &self,
        from: GrowthStage,
        requested: GrowthStage,
    ) -> Result<GrowthStage, RejectedTransition> {
        if self.allows(from, requested) {
            Ok(requested)
        } else {
            Err(RejectedTransition { from, requested })
        }
    }
}

impl fmt::Display for TransitionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionPolicy::Forward => f.write_str("forward"),
            TransitionPolicy::Permissive => f.write_str("permissive"),
        }
    }
}

impl FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" => Ok(TransitionPolicy::Forward),
            "permissive" => Ok(TransitionPolicy::Permissive),
            other => Err(format!("unknown transition policy '{}'", other)),
        }
    }
}
