// ABOUTME: Exercise catalog types with muscle group, equipment, and difficulty attributes
// ABOUTME: Includes prerequisite and transition edges that link catalog items into a graph
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Stable identifier of a catalog item; ascending order is the catalog order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ItemId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Primary muscle group trained by an exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
    /// Pectorals
    Chest,
    /// Lats, traps, and rhomboids
    Back,
    /// Deltoids
    Shoulders,
    /// Biceps, triceps, and forearms
    Arms,
    /// Core and abdominals
    Abs,
    /// Quadriceps, hamstrings, and calves
    Legs,
    /// Gluteal muscles
    Glutes,
    /// Compound whole-body movements
    FullBody,
}

impl MuscleGroup {
    /// All groups in their canonical order
    pub const ALL: [Self; 8] = [
        Self::Chest,
        Self::Back,
        Self::Shoulders,
        Self::Arms,
        Self::Abs,
        Self::Legs,
        Self::Glutes,
        Self::FullBody,
    ];

    /// Convert to storage string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chest => "chest",
            Self::Back => "back",
            Self::Shoulders => "shoulders",
            Self::Arms => "arms",
            Self::Abs => "abs",
            Self::Legs => "legs",
            Self::Glutes => "glutes",
            Self::FullBody => "full_body",
        }
    }

    /// Parse from storage string representation
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "chest" => Some(Self::Chest),
            "back" => Some(Self::Back),
            "shoulders" | "shoulder" => Some(Self::Shoulders),
            "arms" | "arm" => Some(Self::Arms),
            "abs" | "core" => Some(Self::Abs),
            "legs" | "leg" => Some(Self::Legs),
            "glutes" | "glute" => Some(Self::Glutes),
            "full_body" | "fullbody" => Some(Self::FullBody),
            _ => None,
        }
    }

    /// Position in [`Self::ALL`], used for one-hot encodings
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Group usually trained after this one in a split routine
    #[must_use]
    pub const fn complement(self) -> Self {
        match self {
            Self::Chest => Self::Back,
            Self::Back => Self::Shoulders,
            Self::Legs => Self::Abs,
            Self::Shoulders => Self::Arms,
            Self::Arms | Self::Abs | Self::Glutes | Self::FullBody => Self::FullBody,
        }
    }

    /// Words that identify this group in free-text injury notes
    #[must_use]
    pub const fn injury_keywords(self) -> &'static [&'static str] {
        match self {
            Self::Chest => &["chest", "pec"],
            Self::Back => &["back", "spine", "lumbar"],
            Self::Shoulders => &["shoulder", "rotator", "deltoid"],
            Self::Arms => &["arm", "elbow", "wrist", "bicep", "tricep"],
            Self::Abs => &["abdominal", "abs", "core", "hernia"],
            Self::Legs => &["leg", "knee", "ankle", "hamstring", "quad", "calf", "calves"],
            Self::Glutes => &["glute", "hip"],
            Self::FullBody => &["full body"],
        }
    }
}

impl fmt::Display for MuscleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equipment required to perform an exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Equipment {
    /// Bodyweight only
    #[default]
    None,
    /// Dumbbells
    Dumbbell,
    /// Barbell and plates
    Barbell,
    /// Elastic resistance band
    ResistanceBand,
    /// Kettlebell
    Kettlebell,
    /// Gym machine
    Machine,
    /// Anything else
    Other,
}

impl Equipment {
    /// Convert to storage string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Dumbbell => "dumbbell",
            Self::Barbell => "barbell",
            Self::ResistanceBand => "resistance_band",
            Self::Kettlebell => "kettlebell",
            Self::Machine => "machine",
            Self::Other => "other",
        }
    }

    /// How much external load this equipment implies, 0..=1
    #[must_use]
    pub const fn load_factor(self) -> f64 {
        match self {
            Self::Barbell | Self::Machine => 1.0,
            Self::Dumbbell | Self::Kettlebell => 0.8,
            Self::ResistanceBand => 0.5,
            Self::None | Self::Other => 0.3,
        }
    }
}

/// Coarse difficulty tier of an exercise or of a user's declared fitness level
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTier {
    /// No prior experience required
    #[default]
    Beginner,
    /// Requires some practice
    Intermediate,
    /// For experienced athletes
    Advanced,
}

impl DifficultyTier {
    /// Convert to storage string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    /// Parse from storage string representation, defaulting to beginner
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "intermediate" => Self::Intermediate,
            "advanced" => Self::Advanced,
            _ => Self::Beginner,
        }
    }

    /// Ordinal 0..=2
    #[must_use]
    pub const fn ordinal(self) -> usize {
        self as usize
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tags marking an exercise as a stretch
pub const STRETCH_TAGS: [&str; 3] = ["stretch", "stretching", "mobility"];

fn default_active() -> bool {
    true
}

fn default_calorie_rate() -> f64 {
    5.0
}

/// A single exercise definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Unique identifier
    pub id: ItemId,
    /// Display name
    pub name: String,
    /// Primary muscle group
    pub muscle_group: MuscleGroup,
    /// Required equipment
    #[serde(default)]
    pub equipment: Equipment,
    /// Coarse difficulty
    #[serde(default)]
    pub difficulty_tier: DifficultyTier,
    /// Fine-grained skill level, 1 is easiest
    pub numeric_level: u32,
    /// Free-form tags (goal tags, "stretch", movement patterns)
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Average kcal burned per minute
    #[serde(default = "default_calorie_rate")]
    pub calorie_rate: f64,
    /// Short description used for semantic indexing
    #[serde(default)]
    pub description: String,
    /// Inactive items are hidden from every query
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl CatalogItem {
    /// Whether the item carries the given tag (case-insensitive)
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Whether the item is a stretch
    #[must_use]
    pub fn is_stretch(&self) -> bool {
        STRETCH_TAGS.iter().any(|tag| self.has_tag(tag))
    }

    /// Safe to serve to a heavily fatigued user
    #[must_use]
    pub fn is_low_intensity(&self) -> bool {
        self.difficulty_tier == DifficultyTier::Beginner || self.is_stretch()
    }

    /// Intensity on the same 1-10 scale as a user's target intensity
    #[must_use]
    pub fn intensity(&self) -> f64 {
        self.calorie_rate.clamp(1.0, 10.0)
    }

    /// Number of tags shared with another item
    #[must_use]
    pub fn tag_overlap(&self, other: &Self) -> usize {
        self.tags.intersection(&other.tags).count()
    }

    /// Encoding on the isolation / strength / burn preference axes, each 0..=1
    #[must_use]
    pub fn preference_axes(&self) -> [f64; 3] {
        let isolation = match self.muscle_group {
            MuscleGroup::Arms | MuscleGroup::Shoulders | MuscleGroup::Abs => 1.0,
            MuscleGroup::FullBody => 0.0,
            MuscleGroup::Chest | MuscleGroup::Back | MuscleGroup::Legs | MuscleGroup::Glutes => 0.5,
        };
        let strength = self.equipment.load_factor();
        let burn = (self.calorie_rate / 12.0).clamp(0.0, 1.0);
        [isolation, strength, burn]
    }

    /// Text indexed by the vector-similarity oracle
    #[must_use]
    pub fn semantic_document(&self) -> String {
        let tags = self.tags.iter().cloned().collect::<Vec<_>>().join(", ");
        format!(
            "Exercise: {}. Target: {}. Equipment: {}. Difficulty: {}. Tags: {}. {}",
            self.name,
            self.muscle_group.as_str().replace('_', " "),
            self.equipment.as_str().replace('_', " "),
            self.difficulty_tier,
            tags,
            self.description
        )
    }
}

/// `from_item` must be mastered before `to_item`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrerequisiteEdge {
    /// Foundational item
    pub from_item: ItemId,
    /// Item it unlocks
    pub to_item: ItemId,
}

/// Observed "did B after A" statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionEdge {
    /// Item trained first
    pub from_item: ItemId,
    /// Item trained next
    pub to_item: ItemId,
    /// Number of observed transitions
    pub weight: f64,
    /// Weight normalized across the outgoing edges of `from_item`
    pub probability: f64,
}
