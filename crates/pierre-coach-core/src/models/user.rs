// ABOUTME: User body profile and mutable recommendation state (fatigue, intensity, history)
// ABOUTME: Profile feeds feature-weighted scoring; state feeds the bandit and router overrides
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DifficultyTier, Equipment, MuscleGroup};
use crate::constants::user_state;

/// Self-reported gender used as a profile feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    /// Male
    #[default]
    Male,
    /// Female
    Female,
}

/// Stated training goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FitnessGoal {
    /// Reduce body fat
    WeightLoss,
    /// Build muscle mass
    MuscleGain,
    /// Increase maximal strength
    Strength,
    /// Improve stamina
    Endurance,
    /// Improve range of motion
    Flexibility,
    /// No particular focus
    #[default]
    GeneralFitness,
}

impl FitnessGoal {
    /// Catalog tag that marks items serving this goal
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::WeightLoss => "weight_loss",
            Self::MuscleGain => "muscle_gain",
            Self::Strength => "strength",
            Self::Endurance => "endurance",
            Self::Flexibility => "flexibility",
            Self::GeneralFitness => "general_fitness",
        }
    }
}

/// Body profile owned by the (external) user directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Owning user
    pub user_id: Uuid,
    /// Gender
    #[serde(default)]
    pub gender: Gender,
    /// Age in years
    pub age: u32,
    /// Height in centimeters
    pub height_cm: f64,
    /// Weight in kilograms
    pub weight_kg: f64,
    /// Declared fitness tier
    #[serde(default)]
    pub fitness_level: DifficultyTier,
    /// Numeric skill level compared against item levels
    pub skill_level: u32,
    /// Free-text injury notes
    #[serde(default)]
    pub injury_history: String,
    /// Training goal
    #[serde(default)]
    pub goal: FitnessGoal,
}

impl UserProfile {
    /// Default profile for a user the directory knows nothing about
    #[must_use]
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            gender: Gender::Male,
            age: 20,
            height_cm: 170.0,
            weight_kg: 65.0,
            fitness_level: DifficultyTier::Beginner,
            skill_level: 1,
            injury_history: String::new(),
            goal: FitnessGoal::GeneralFitness,
        }
    }

    /// Body mass index, or a neutral 20.0 when height is unknown
    #[must_use]
    pub fn bmi(&self) -> f64 {
        if self.height_cm <= 0.0 {
            return 20.0;
        }
        let meters = self.height_cm / 100.0;
        self.weight_kg / (meters * meters)
    }

    /// Normalized feature vector: BMI, fitness tier, gender indicator, age
    #[must_use]
    pub fn feature_vector(&self) -> [f64; 4] {
        let norm_bmi = ((self.bmi() - 15.0) / 20.0).clamp(0.0, 1.0);
        let norm_tier = self.fitness_level.ordinal() as f64 / 2.0;
        let gender = match self.gender {
            Gender::Male => 1.0,
            Gender::Female => 0.0,
        };
        let norm_age = ((f64::from(self.age) - 15.0) / 45.0).clamp(0.0, 1.0);
        [norm_bmi, norm_tier, gender, norm_age]
    }

    /// Whether the injury notes mention the given muscle group
    ///
    /// Keywords match whole words, singular or plural, so "feedback" does
    /// not mention the back but "bad knees" mentions the legs.
    #[must_use]
    pub fn mentions_injury(&self, group: MuscleGroup) -> bool {
        let notes = self.injury_history.to_lowercase();
        let words: Vec<&str> = notes
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect();
        group.injury_keywords().iter().any(|keyword| {
            let phrase: Vec<&str> = keyword.split_whitespace().collect();
            words.windows(phrase.len()).any(|window| {
                window
                    .iter()
                    .zip(&phrase)
                    .all(|(word, key)| word_matches(word, key))
            })
        })
    }
}

fn word_matches(word: &str, keyword: &str) -> bool {
    word.strip_prefix(keyword)
        .is_some_and(|rest| matches!(rest, "" | "s" | "es"))
}

/// A muscle group trained at a given time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainedGroup {
    /// Group trained
    pub group: MuscleGroup,
    /// When the session ended
    pub at: DateTime<Utc>,
}

fn default_target_intensity() -> f64 {
    user_state::DEFAULT_TARGET_INTENSITY
}

/// Mutable per-user recommendation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserState {
    /// Owning user (unique)
    pub user_id: Uuid,
    /// Fatigue in 0..=1
    #[serde(default)]
    pub fatigue_level: f64,
    /// Desired intensity on a 1-10 scale
    #[serde(default = "default_target_intensity")]
    pub target_intensity: f64,
    /// Last completed session
    #[serde(default)]
    pub last_trained_at: Option<DateTime<Utc>>,
    /// Equipment the user can access; empty means everything
    #[serde(default)]
    pub equipment_availability: Vec<Equipment>,
    /// Recently trained muscle groups, newest last
    #[serde(default)]
    pub recent_muscle_groups: Vec<TrainedGroup>,
}

impl UserState {
    /// Fresh state for a user
    #[must_use]
    pub const fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            fatigue_level: 0.0,
            target_intensity: user_state::DEFAULT_TARGET_INTENSITY,
            last_trained_at: None,
            equipment_availability: Vec::new(),
            recent_muscle_groups: Vec::new(),
        }
    }

    /// Adjust fatigue from a day's average form score (0-100)
    pub fn apply_form_score(&mut self, average_form_score: f64, day: DateTime<Utc>) {
        if average_form_score < user_state::FORM_SCORE_FATIGUE_THRESHOLD {
            self.fatigue_level = (self.fatigue_level + user_state::FATIGUE_INCREASE).min(1.0);
        } else {
            self.fatigue_level = (self.fatigue_level - user_state::FATIGUE_RECOVERY).max(0.0);
        }
        self.last_trained_at = Some(day);
    }

    /// Remember that a group was trained, pruning entries older than `retain`
    pub fn record_trained(&mut self, group: MuscleGroup, at: DateTime<Utc>, retain: Duration) {
        self.recent_muscle_groups
            .retain(|entry| at - entry.at <= retain && entry.group != group);
        self.recent_muscle_groups.push(TrainedGroup { group, at });
    }

    /// Whether the group was trained within `window` before `now`
    #[must_use]
    pub fn trained_within(&self, group: MuscleGroup, now: DateTime<Utc>, window: Duration) -> bool {
        self.recent_muscle_groups
            .iter()
            .any(|entry| entry.group == group && now - entry.at <= window)
    }

    /// Whether the user can perform an exercise needing this equipment
    #[must_use]
    pub fn has_equipment(&self, equipment: Equipment) -> bool {
        equipment == Equipment::None
            || self.equipment_availability.is_empty()
            || self.equipment_availability.contains(&equipment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn injured(notes: &str) -> Vec<MuscleGroup> {
        let mut profile = UserProfile::new(Uuid::new_v4());
        profile.injury_history = notes.to_owned();
        MuscleGroup::ALL
            .into_iter()
            .filter(|group| profile.mentions_injury(*group))
            .collect()
    }

    #[test]
    fn test_injury_keywords_match_whole_words() {
        for harmless in [
            "no harm done",
            "warm-up only",
            "left feedback",
            "absolutely fine",
            "relationship stress",
            "",
        ] {
            assert!(injured(harmless).is_empty(), "{harmless:?}");
        }

        assert_eq!(injured("Bad KNEES"), vec![MuscleGroup::Legs]);
        assert_eq!(injured("sore arms, lower-back pain"), vec![MuscleGroup::Back, MuscleGroup::Arms]);
        assert_eq!(injured("hips and abs"), vec![MuscleGroup::Abs, MuscleGroup::Glutes]);
        assert!(injured("strained full  body").contains(&MuscleGroup::FullBody));
    }

    #[test]
    fn test_form_score_moves_fatigue_within_bounds() {
        let mut state = UserState::new(Uuid::new_v4());
        let now = Utc::now();

        for _ in 0..10 {
            state.apply_form_score(40.0, now);
        }
        assert!((state.fatigue_level - 1.0).abs() < f64::EPSILON);

        state.apply_form_score(85.0, now);
        assert!((state.fatigue_level - 0.9).abs() < 1e-9);
        assert_eq!(state.last_trained_at, Some(now));

        for _ in 0..20 {
            state.apply_form_score(90.0, now);
        }
        assert!(state.fatigue_level.abs() < f64::EPSILON);
    }

    #[test]
    fn test_injury_matching_is_keyword_based() {
        let mut profile = UserProfile::new(Uuid::new_v4());
        assert!(!profile.mentions_injury(MuscleGroup::Legs));

        profile.injury_history = "Old left KNEE surgery".to_owned();
        assert!(profile.mentions_injury(MuscleGroup::Legs));
        assert!(!profile.mentions_injury(MuscleGroup::Chest));
    }

    #[test]
    fn test_trained_within_window() {
        let mut state = UserState::new(Uuid::new_v4());
        let now = Utc::now();
        state.record_trained(MuscleGroup::Chest, now - Duration::hours(30), Duration::days(7));
        state.record_trained(MuscleGroup::Legs, now - Duration::hours(2), Duration::days(7));

        assert!(state.trained_within(MuscleGroup::Legs, now, Duration::hours(24)));
        assert!(!state.trained_within(MuscleGroup::Chest, now, Duration::hours(24)));
    }
}
